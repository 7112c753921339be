//! Generation lifecycle operations.
//!
//! Generations are coarse units: created whole on install, superseded when
//! the configured cache name changes, and deleted whole by activation or
//! the quota guard. There is no per-entry eviction.

use super::connection::GenerationStore;
use crate::Error;
use tokio_rusqlite::params;

impl GenerationStore {
    /// Create a generation row if it doesn't exist.
    pub async fn ensure_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All generation names, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY created_at, name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every generation except `keep`, entries included.
    ///
    /// Returns the number of generations deleted.
    pub async fn delete_generations_except(&self, keep: &str) -> Result<u64, Error> {
        let keep = keep.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE name != ?1", params![keep])?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Aggregate body bytes held across all generations.
    ///
    /// This is the usage half of the quota estimate; the quota half is
    /// configuration.
    pub async fn usage_bytes(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let usage: i64 =
                    conn.query_row("SELECT COALESCE(SUM(LENGTH(body)), 0) FROM entries", [], |row| row.get(0))?;
                Ok(usage as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::entries::StoredResponse;
    use crate::store::key::entry_key;

    fn make_entry(url: &str) -> StoredResponse {
        StoredResponse {
            key: entry_key("GET", url),
            method: "GET".to_string(),
            url: url.to_string(),
            status: 200,
            headers: Vec::new(),
            body: vec![0u8; 64],
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        store.ensure_generation("gen-v1").await.unwrap();
        store.ensure_generation("gen-v1").await.unwrap();

        assert_eq!(store.list_generations().await.unwrap(), vec!["gen-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_except_keeps_exactly_one() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        store.put_entry("gen-v1", &make_entry("https://shop.example/old")).await.unwrap();
        store.put_entry("gen-v2", &make_entry("https://shop.example/older")).await.unwrap();
        store.put_entry("gen-v3", &make_entry("https://shop.example/current")).await.unwrap();

        let deleted = store.delete_generations_except("gen-v3").await.unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(store.list_generations().await.unwrap(), vec!["gen-v3".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_entries() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let entry = make_entry("https://shop.example/old");
        store.put_entry("gen-v1", &entry).await.unwrap();
        store.ensure_generation("gen-v2").await.unwrap();

        store.delete_generations_except("gen-v2").await.unwrap();

        assert!(store.get_entry("gen-v1", &entry.key).await.unwrap().is_none());
        assert_eq!(store.usage_bytes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_usage_sums_bodies() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        store.put_entry("gen-v1", &make_entry("https://shop.example/a")).await.unwrap();
        store.put_entry("gen-v1", &make_entry("https://shop.example/b")).await.unwrap();

        assert_eq!(store.usage_bytes().await.unwrap(), 128);
    }
}
