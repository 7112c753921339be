//! Navigation strategy.
//!
//! Full-document navigations always go to the network and are never
//! cached; what the cache provides is a place to land when the network is
//! gone: the offline document first, the shell root second.

use outpost_client::Fetch;
use outpost_core::{Error, GenerationStore, Request, StoredResponse};

use crate::engine::EngineConfig;

/// Serve a navigation request.
pub async fn navigation(
    store: &GenerationStore,
    net: &dyn Fetch,
    config: &EngineConfig,
    request: &Request,
) -> Result<StoredResponse, Error> {
    match net.fetch(request).await {
        Ok(response) => Ok(response.snapshot(request)),
        Err(err) if err.is_fetch_failure() => {
            if let Some(offline) = super::cached_document(store, &config.generation, &config.offline_url).await? {
                tracing::debug!(url = %request.url, "offline navigation; served offline document");
                return Ok(offline);
            }
            if let Some(shell) = super::cached_document(store, &config.generation, &config.shell_url).await? {
                tracing::debug!(url = %request.url, "offline navigation; served shell root");
                return Ok(shell);
            }
            Err(err)
        }
        Err(err) => Err(err),
    }
}
