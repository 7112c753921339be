//! Intercepted request descriptors.
//!
//! A [`Request`] is the engine's view of one intercepted fetch: method,
//! absolute URL, and the two host-supplied hints that drive classification
//! (navigation mode and resource destination). Descriptors are transient;
//! only their derived key ever reaches the store.

use serde::{Deserialize, Serialize};

use crate::store::key::entry_key;

/// How the host issued the request.
///
/// Only `Navigate` is significant to the engine; the remaining variants are
/// carried through so host events round-trip losslessly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Full-document navigation.
    Navigate,
    SameOrigin,
    Cors,
    #[default]
    NoCors,
}

/// The kind of resource the host expects this request to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    Document,
    Image,
    Style,
    Script,
    Font,
    #[default]
    #[serde(other)]
    Other,
}

/// One intercepted request as delivered by a host fetch event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// HTTP method, uppercase.
    pub method: String,

    /// Absolute URL.
    pub url: String,

    /// Navigation mode hint.
    #[serde(default)]
    pub mode: RequestMode,

    /// Resource destination hint.
    #[serde(default)]
    pub destination: Destination,
}

impl Request {
    /// Build a plain GET descriptor, the only shape the engine ever stores.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            mode: RequestMode::default(),
            destination: Destination::default(),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Store key for this descriptor.
    pub fn key(&self) -> String {
        entry_key(&self.method, &self.url)
    }

    /// Path component of the URL, used for API-prefix matching.
    ///
    /// Falls back to the raw string for URLs that do not parse; those are
    /// bypassed before any prefix check happens.
    pub fn path(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => self.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_wire_casing() {
        let req: Request =
            serde_json::from_str(r#"{"method":"GET","url":"https://shop.example/","mode":"navigate"}"#).unwrap();
        assert!(req.is_navigation());
        assert_eq!(req.destination, Destination::Other);
    }

    #[test]
    fn test_unknown_destination_is_other() {
        let req: Request = serde_json::from_str(
            r#"{"method":"GET","url":"https://shop.example/f.woff2","destination":"worker"}"#,
        )
        .unwrap();
        assert_eq!(req.destination, Destination::Other);
    }

    #[test]
    fn test_key_depends_on_method_and_url() {
        let get = Request::get("https://shop.example/app.js");
        let mut head = get.clone();
        head.method = "HEAD".to_string();
        assert_ne!(get.key(), head.key());
        assert_eq!(get.key(), Request::get("https://shop.example/app.js").key());
    }

    #[test]
    fn test_path_extraction() {
        let req = Request::get("https://shop.example/api/wishlist/42?full=1");
        assert_eq!(req.path(), "/api/wishlist/42");
    }
}
