//! Network-first strategy for API calls.
//!
//! Freshness is paramount: a successful fetch is always what the caller
//! receives, and reads never write the store. The only cache involvement
//! is the offline fallback to whatever an earlier pass left behind.

use outpost_client::Fetch;
use outpost_core::{Error, GenerationStore, Request, StoredResponse};

use crate::engine::EngineConfig;

/// Serve an API call, network wins.
pub async fn network_first(
    store: &GenerationStore,
    net: &dyn Fetch,
    config: &EngineConfig,
    request: &Request,
) -> Result<StoredResponse, Error> {
    match net.fetch(request).await {
        Ok(response) => Ok(response.snapshot(request)),
        Err(err) if err.is_fetch_failure() => {
            match store.get_entry(&config.generation, &request.key()).await? {
                Some(prior) => {
                    tracing::debug!(url = %request.url, "offline; served prior API response");
                    Ok(prior)
                }
                None => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}
