//! Cache entry CRUD operations.
//!
//! An entry is an immutable response snapshot captured at write time and
//! keyed by its request descriptor. Entries are replaced whole on re-fetch,
//! never patched in place.

use super::connection::GenerationStore;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// An immutable snapshot of one response, as held by a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    /// Descriptor key (see [`super::key::entry_key`]).
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// RFC 3339 capture timestamp.
    pub fetched_at: String,
}

impl GenerationStore {
    /// Insert or replace one entry in a generation.
    ///
    /// Creates the generation row if it doesn't exist yet; the entry upsert
    /// itself is a single statement, so readers never observe a partial
    /// write.
    pub async fn put_entry(&self, generation: &str, entry: &StoredResponse) -> Result<(), Error> {
        let generation = generation.to_string();
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, chrono::Utc::now().to_rfc3339()],
                )?;

                let headers_json = serde_json::to_string(&entry.headers).unwrap_or_default();
                conn.execute(
                    "INSERT INTO entries (generation, key, method, url, status, headers_json, body, fetched_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(generation, key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        fetched_at = excluded.fetched_at",
                    params![
                        generation,
                        entry.key,
                        entry.method,
                        entry.url,
                        entry.status as i64,
                        headers_json,
                        entry.body,
                        entry.fetched_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Write a batch of entries to a generation in one transaction.
    ///
    /// Either every entry lands or none do; install uses this for its
    /// all-essential-assets-or-none contract.
    pub async fn put_entries_atomic(&self, generation: &str, entries: &[StoredResponse]) -> Result<(), Error> {
        let generation = generation.to_string();
        let entries = entries.to_vec();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;

                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, chrono::Utc::now().to_rfc3339()],
                )?;

                for entry in &entries {
                    let headers_json = serde_json::to_string(&entry.headers).unwrap_or_default();
                    tx.execute(
                        "INSERT INTO entries (generation, key, method, url, status, headers_json, body, fetched_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                         ON CONFLICT(generation, key) DO UPDATE SET
                            method = excluded.method,
                            url = excluded.url,
                            status = excluded.status,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            fetched_at = excluded.fetched_at",
                        params![
                            generation,
                            entry.key,
                            entry.method,
                            entry.url,
                            entry.status as i64,
                            headers_json,
                            entry.body,
                            entry.fetched_at,
                        ],
                    )?;
                }

                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by generation and descriptor key.
    ///
    /// Returns None if the generation holds no entry for the key.
    pub async fn get_entry(&self, generation: &str, key: &str) -> Result<Option<StoredResponse>, Error> {
        let generation = generation.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, method, url, status, headers_json, body, fetched_at
                     FROM entries WHERE generation = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![generation, key], |row| {
                    let headers_json: String = row.get(4)?;
                    Ok(StoredResponse {
                        key: row.get(0)?,
                        method: row.get(1)?,
                        url: row.get(2)?,
                        status: row.get::<_, i64>(3)? as u16,
                        headers: serde_json::from_str(&headers_json).unwrap_or_default(),
                        body: row.get(5)?,
                        fetched_at: row.get(6)?,
                    })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries held by a generation.
    pub async fn entry_count(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::key::entry_key;

    fn make_entry(url: &str, status: u16) -> StoredResponse {
        StoredResponse {
            key: entry_key("GET", url),
            method: "GET".to_string(),
            url: url.to_string(),
            status,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: b"<html>ok</html>".to_vec(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let entry = make_entry("https://shop.example/", 200);

        store.put_entry("gen-v1", &entry).await.unwrap();

        let got = store.get_entry("gen-v1", &entry.key).await.unwrap().unwrap();
        assert_eq!(got, entry);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let result = store.get_entry("gen-v1", "nonexistent").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_in_place() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let first = make_entry("https://shop.example/app.js", 200);
        let mut second = first.clone();
        second.body = b"updated".to_vec();

        store.put_entry("gen-v1", &first).await.unwrap();
        store.put_entry("gen-v1", &second).await.unwrap();

        let got = store.get_entry("gen-v1", &first.key).await.unwrap().unwrap();
        assert_eq!(got.body, b"updated".to_vec());
        assert_eq!(store.entry_count("gen-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_generations_isolated() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let entry = make_entry("https://shop.example/", 200);

        store.put_entry("gen-v1", &entry).await.unwrap();

        assert!(store.get_entry("gen-v2", &entry.key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_atomic_batch() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let entries = vec![
            make_entry("https://shop.example/", 200),
            make_entry("https://shop.example/offline.html", 200),
        ];

        store.put_entries_atomic("gen-v1", &entries).await.unwrap();

        assert_eq!(store.entry_count("gen-v1").await.unwrap(), 2);
    }
}
