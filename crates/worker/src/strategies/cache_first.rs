//! Cache-first strategy for static assets.
//!
//! Build assets are immutable by convention, so a cached entry wins
//! outright and the network is never consulted for it. Freshness is traded
//! for latency and offline availability; a changed asset ships under a new
//! URL and a new cache generation.

use outpost_client::Fetch;
use outpost_core::{Error, GenerationStore, Request, StoredResponse};

use crate::engine::EngineConfig;

/// Serve a static asset, cache wins.
///
/// On a miss the asset is fetched, written back if it is a complete
/// non-opaque 200, and the quota guard runs after the write. Network
/// failure on a miss falls back to the cached shell root.
pub async fn cache_first(
    store: &GenerationStore,
    net: &dyn Fetch,
    config: &EngineConfig,
    request: &Request,
) -> Result<StoredResponse, Error> {
    if let Some(hit) = store.get_entry(&config.generation, &request.key()).await? {
        tracing::debug!(url = %request.url, "asset served from cache");
        return Ok(hit);
    }

    match net.fetch(request).await {
        Ok(response) => {
            let snapshot = response.snapshot(request);
            if response.is_cacheable() {
                match store.put_entry(&config.generation, &snapshot).await {
                    Ok(()) => {
                        if let Err(err) = config.quota.enforce(store, &config.generation).await {
                            tracing::warn!(error = %err, "quota check failed after asset write");
                        }
                    }
                    // the in-flight response is unaffected by a failed write
                    Err(err) => tracing::warn!(url = %request.url, error = %err, "asset cache write failed"),
                }
            }
            Ok(snapshot)
        }
        Err(err) if err.is_fetch_failure() => {
            match super::cached_document(store, &config.generation, &config.shell_url).await? {
                Some(shell) => {
                    tracing::debug!(url = %request.url, "offline asset miss; served shell root");
                    Ok(shell)
                }
                None => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testnet::{StubNet, config};

    const ASSET: &str = "https://shop.example/static/app.js";

    #[tokio::test]
    async fn test_second_request_is_answered_without_network() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let net = StubNet::new().ok(ASSET, b"console.log(1)");
        let config = config("gen-v1");
        let request = Request::get(ASSET);

        let first = cache_first(&store, &net, &config, &request).await.unwrap();
        assert_eq!(net.calls(), 1);

        let second = cache_first(&store, &net, &config, &request).await.unwrap();
        assert_eq!(net.calls(), 1);
        assert_eq!(second.body, first.body);
    }

    #[tokio::test]
    async fn test_error_response_returned_but_not_stored() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let net = StubNet::new().status(ASSET, 404, b"not found");
        let config = config("gen-v1");
        let request = Request::get(ASSET);

        let served = cache_first(&store, &net, &config, &request).await.unwrap();
        assert_eq!(served.status, 404);
        assert_eq!(store.entry_count("gen-v1").await.unwrap(), 0);

        // next request goes to the network again
        cache_first(&store, &net, &config, &request).await.unwrap();
        assert_eq!(net.calls(), 2);
    }

    #[tokio::test]
    async fn test_opaque_response_not_stored() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let net = StubNet::new().opaque(ASSET, b"cross-origin");
        let config = config("gen-v1");

        let served = cache_first(&store, &net, &config, &Request::get(ASSET)).await.unwrap();
        assert_eq!(served.status, 200);
        assert_eq!(store.entry_count("gen-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_miss_falls_back_to_shell() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let config = config("gen-v1");

        // shell was cached by a previous install
        let seed = StubNet::new().ok("https://shop.example/", b"<html>shell</html>");
        let shell = seed.fetch(&Request::get("https://shop.example/")).await.unwrap();
        store.put_entry("gen-v1", &shell.snapshot(&Request::get("https://shop.example/"))).await.unwrap();

        let net = StubNet::new().offline(ASSET);
        let served = cache_first(&store, &net, &config, &Request::get(ASSET)).await.unwrap();
        assert_eq!(served.body, b"<html>shell</html>".to_vec());
    }

    #[tokio::test]
    async fn test_offline_miss_without_shell_propagates() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let net = StubNet::new().offline(ASSET);
        let config = config("gen-v1");

        let result = cache_first(&store, &net, &config, &Request::get(ASSET)).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_write_triggers_quota_eviction() {
        let store = GenerationStore::open_in_memory().await.unwrap();
        let mut config = config("gen-v2");
        config.quota = crate::quota::QuotaGuard::new(Some(64), 0.9);

        // a superseded generation still holding data
        let stale = StubNet::new().ok("https://shop.example/old.js", b"0123456789012345678901234567890123456789");
        let old_req = Request::get("https://shop.example/old.js");
        let old = stale.fetch(&old_req).await.unwrap();
        store.put_entry("gen-v1", &old.snapshot(&old_req)).await.unwrap();

        let net = StubNet::new().ok(ASSET, b"0123456789012345678901234567890123456789");
        cache_first(&store, &net, &config, &Request::get(ASSET)).await.unwrap();

        assert_eq!(store.list_generations().await.unwrap(), vec!["gen-v2".to_string()]);
    }
}
