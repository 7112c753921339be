//! Caching strategies.
//!
//! Each strategy is one async transformation from request to response,
//! given the generation store and the network seam. The dispatcher runs
//! exactly one strategy per intercepted request; whatever fallback
//! behavior exists lives inside the strategy itself.

pub mod cache_first;
pub mod navigation;
pub mod network_first;
pub mod stale_while_revalidate;

use outpost_core::{Error, GenerationStore, Request, StoredResponse};

/// Look up a cached document by absolute URL.
///
/// Fallback documents go through the same descriptor keys as regular
/// entries, so a fallback is only available once install (or a later
/// write) actually cached it.
pub(crate) async fn cached_document(
    store: &GenerationStore,
    generation: &str,
    url: &str,
) -> Result<Option<StoredResponse>, Error> {
    store.get_entry(generation, &Request::get(url).key()).await
}
