//! Stale-while-revalidate, the default strategy.
//!
//! The refresh starts before the cache lookup so a hit never waits on the
//! network. When an entry exists the caller gets it at once and the
//! refresh finishes in the background; when none exists the refresh result
//! is the answer. Background write failures are logged and swallowed —
//! the caller already has its response.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;

use outpost_client::Fetch;
use outpost_core::{Error, GenerationStore, Request, StoredResponse};

use crate::engine::EngineConfig;

/// Serve with the cached entry if present, refreshing the store either way.
pub async fn stale_while_revalidate(
    store: &GenerationStore,
    net: &Arc<dyn Fetch>,
    config: &Arc<EngineConfig>,
    revalidations: &Mutex<JoinSet<()>>,
    request: &Request,
) -> Result<StoredResponse, Error> {
    let refresh = {
        let store = store.clone();
        let net = Arc::clone(net);
        let config = Arc::clone(config);
        let request = request.clone();
        tokio::spawn(async move { refresh(&store, net.as_ref(), &config, &request).await })
    };

    if let Some(hit) = store.get_entry(&config.generation, &request.key()).await? {
        tracing::debug!(url = %request.url, "served stale entry; revalidating in background");

        // the event outlives the caller's response until the refresh settles
        revalidations.lock().await.spawn(async move {
            match refresh.await {
                Ok(Ok(_)) | Ok(Err(_)) => {}
                Err(err) => tracing::debug!(error = %err, "revalidation task aborted"),
            }
        });

        return Ok(hit);
    }

    match refresh.await {
        Ok(Ok(snapshot)) => Ok(snapshot),
        Ok(Err(err)) if err.is_fetch_failure() => {
            match super::cached_document(store, &config.generation, &config.shell_url).await? {
                Some(shell) => {
                    tracing::debug!(url = %request.url, "offline miss; served shell root");
                    Ok(shell)
                }
                None => Err(err),
            }
        }
        Ok(Err(err)) => Err(err),
        // an aborted refresh looks like any other lost connection
        Err(err) => Err(Error::Network(format!("revalidation task failed: {err}"))),
    }
}

/// Fetch and, for a complete non-opaque 200, replace the stored entry.
async fn refresh(
    store: &GenerationStore,
    net: &dyn Fetch,
    config: &EngineConfig,
    request: &Request,
) -> Result<StoredResponse, Error> {
    match net.fetch(request).await {
        Ok(response) => {
            let snapshot = response.snapshot(request);
            if response.is_cacheable() {
                if let Err(err) = store.put_entry(&config.generation, &snapshot).await {
                    tracing::warn!(url = %request.url, error = %err, "revalidation cache write failed");
                }
            }
            Ok(snapshot)
        }
        Err(err) => {
            tracing::debug!(url = %request.url, error = %err, "revalidation fetch failed");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testnet::{StubNet, config};

    const DOC: &str = "https://shop.example/manifest.webmanifest";

    async fn drain(revalidations: &Mutex<JoinSet<()>>) {
        let mut set = revalidations.lock().await;
        while set.join_next().await.is_some() {}
    }

    async fn seed(store: &GenerationStore, url: &str, body: &[u8]) {
        let net = StubNet::new().ok(url, body);
        let request = Request::get(url);
        let response = net.fetch(&request).await.unwrap();
        store.put_entry("gen-v1", &response.snapshot(&request)).await.unwrap();
    }

    #[tokio::test]
    async fn test_hit_returns_stale_entry_then_updates_store() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        seed(&store, DOC, b"{\"v\":1}").await;
        // the refresh settles long after the lookup
        let net: Arc<dyn Fetch> = Arc::new(StubNet::new().slow(DOC, b"{\"v\":2}", 50));
        let config = Arc::new(config("gen-v1"));
        let revalidations = Mutex::new(JoinSet::new());
        let request = Request::get(DOC);

        let served = stale_while_revalidate(&store, &net, &config, &revalidations, &request).await.unwrap();

        // the caller got the stale entry without waiting for the refresh
        assert_eq!(served.body, b"{\"v\":1}".to_vec());

        drain(&revalidations).await;
        let updated = store.get_entry("gen-v1", &request.key()).await.unwrap().unwrap();
        assert_eq!(updated.body, b"{\"v\":2}".to_vec());
    }

    #[tokio::test]
    async fn test_hit_with_failed_refresh_keeps_entry() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        seed(&store, DOC, b"{\"v\":1}").await;
        let net: Arc<dyn Fetch> = Arc::new(StubNet::new().offline(DOC));
        let config = Arc::new(config("gen-v1"));
        let revalidations = Mutex::new(JoinSet::new());
        let request = Request::get(DOC);

        let served = stale_while_revalidate(&store, &net, &config, &revalidations, &request).await.unwrap();
        assert_eq!(served.body, b"{\"v\":1}".to_vec());

        drain(&revalidations).await;
        let kept = store.get_entry("gen-v1", &request.key()).await.unwrap().unwrap();
        assert_eq!(kept.body, b"{\"v\":1}".to_vec());
    }

    #[tokio::test]
    async fn test_hit_with_error_refresh_keeps_entry() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        seed(&store, DOC, b"{\"v\":1}").await;
        let net: Arc<dyn Fetch> = Arc::new(StubNet::new().status(DOC, 404, b"gone"));
        let config = Arc::new(config("gen-v1"));
        let revalidations = Mutex::new(JoinSet::new());
        let request = Request::get(DOC);

        stale_while_revalidate(&store, &net, &config, &revalidations, &request).await.unwrap();
        drain(&revalidations).await;

        let kept = store.get_entry("gen-v1", &request.key()).await.unwrap().unwrap();
        assert_eq!(kept.body, b"{\"v\":1}".to_vec());
    }

    #[tokio::test]
    async fn test_miss_returns_network_result_and_stores_it() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let net: Arc<dyn Fetch> = Arc::new(StubNet::new().ok(DOC, b"{\"v\":1}"));
        let config = Arc::new(config("gen-v1"));
        let revalidations = Mutex::new(JoinSet::new());
        let request = Request::get(DOC);

        let served = stale_while_revalidate(&store, &net, &config, &revalidations, &request).await.unwrap();

        assert_eq!(served.body, b"{\"v\":1}".to_vec());
        let stored = store.get_entry("gen-v1", &request.key()).await.unwrap().unwrap();
        assert_eq!(stored.body, b"{\"v\":1}".to_vec());
    }

    #[tokio::test]
    async fn test_miss_with_error_response_not_stored() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let net: Arc<dyn Fetch> = Arc::new(StubNet::new().status(DOC, 404, b"gone"));
        let config = Arc::new(config("gen-v1"));
        let revalidations = Mutex::new(JoinSet::new());
        let request = Request::get(DOC);

        let served = stale_while_revalidate(&store, &net, &config, &revalidations, &request).await.unwrap();

        assert_eq!(served.status, 404);
        assert_eq!(store.entry_count("gen-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_miss_offline_falls_back_to_shell() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        seed(&store, "https://shop.example/", b"<html>shell</html>").await;
        let net: Arc<dyn Fetch> = Arc::new(StubNet::new().offline(DOC));
        let config = Arc::new(config("gen-v1"));
        let revalidations = Mutex::new(JoinSet::new());

        let served =
            stale_while_revalidate(&store, &net, &config, &revalidations, &Request::get(DOC)).await.unwrap();

        assert_eq!(served.body, b"<html>shell</html>".to_vec());
    }

    #[tokio::test]
    async fn test_miss_offline_without_shell_propagates() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let net: Arc<dyn Fetch> = Arc::new(StubNet::new().offline(DOC));
        let config = Arc::new(config("gen-v1"));
        let revalidations = Mutex::new(JoinSet::new());

        let result = stale_while_revalidate(&store, &net, &config, &revalidations, &Request::get(DOC)).await;

        assert!(matches!(result, Err(Error::Network(_))));
    }
}
