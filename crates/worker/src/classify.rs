//! Request classification.
//!
//! A pure, total function from an intercepted request to the strategy that
//! answers it. Checks run in a fixed order; the first match wins.

use outpost_client::is_fetchable;
use outpost_core::{Destination, Request};

/// The strategy class an intercepted request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Full-document navigation: network with offline fallback.
    Navigation,
    /// Build asset: cache-first.
    StaticAsset,
    /// Reserved API path: network-first.
    Api,
    /// Everything else intercepted: stale-while-revalidate.
    Other,
    /// Not intercepted at all; the host applies default handling.
    Bypass,
}

/// Classify one request.
///
/// Non-GET methods and non-http(s) schemes are bypassed before any other
/// rule so the engine never intercepts what it could not safely answer
/// from the store.
pub fn classify(request: &Request, api_prefix: &str) -> RequestClass {
    if request.is_navigation() {
        return RequestClass::Navigation;
    }

    if !request.is_get() || !is_fetchable(&request.url) {
        return RequestClass::Bypass;
    }

    if matches!(request.destination, Destination::Image | Destination::Style | Destination::Script) {
        return RequestClass::StaticAsset;
    }

    if request.path().starts_with(api_prefix) {
        return RequestClass::Api;
    }

    RequestClass::Other
}
