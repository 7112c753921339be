//! Network side of the engine.
//!
//! ### Single-consumption discipline
//! A network response body can be read once. [`NetClient::fetch`] is the
//! only place a body is consumed: it materializes the bytes into an
//! immutable [`Bytes`] buffer, and every later duplication
//! ([`NetResponse::snapshot`]) works off that buffer. Strategies that both
//! return a response and write it to the store snapshot first and hand the
//! copies to each path.
//!
//! ### Settled vs. failed
//! Any HTTP status is a settled response — a 404 is returned to the
//! caller, not raised. Only transport failures, timeouts, and over-size
//! bodies surface as errors; those are what strategies recover from.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, Method, StatusCode, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, canonicalize, is_fetchable};

use outpost_core::{Error, Request, StoredResponse};

/// Configuration for the network client.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// User agent string (default: "outpost/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            user_agent: "outpost/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// A settled network response with its body already materialized.
#[derive(Debug, Clone)]
pub struct NetResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Response body bytes, read exactly once
    pub bytes: Bytes,
    /// Redirects crossed an origin boundary; status and body must be
    /// treated as unverifiable and never cached
    pub opaque: bool,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl NetResponse {
    /// Whether this response may be written to the generation store:
    /// a complete, non-opaque HTTP 200.
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK && !self.opaque
    }

    /// Duplicate into an immutable store snapshot for the given descriptor.
    ///
    /// The snapshot owns its bytes; handing it to the store leaves this
    /// response untouched for the caller.
    pub fn snapshot(&self, request: &Request) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        StoredResponse {
            key: request.key(),
            method: request.method.to_ascii_uppercase(),
            url: request.url.clone(),
            status: self.status.as_u16(),
            headers,
            body: self.bytes.to_vec(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// The network seam strategies fetch through.
///
/// Production uses [`NetClient`]; tests substitute a scripted stub.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<NetResponse, Error>;
}

/// HTTP client for upstream fetches.
pub struct NetClient {
    http: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client with the given configuration.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &NetConfig {
        &self.config
    }
}

#[async_trait]
impl Fetch for NetClient {
    /// Fetch a request, returning raw bytes and metadata.
    ///
    /// Respects redirect and byte limits; the body is read exactly once.
    async fn fetch(&self, request: &Request) -> Result<NetResponse, Error> {
        let start = Instant::now();
        let url = canonicalize(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let method =
            Method::from_bytes(request.method.as_bytes()).map_err(|_| Error::InvalidRequest(request.method.clone()))?;

        let response = self
            .http
            .request(method, url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::FetchTimeout(format!("{}: {}", url, e))
                } else {
                    Error::Network(format!("{}: {}", url, e))
                }
            })?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response body: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let opaque = !same_origin(&url, &final_url);
        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} status {} in {}ms ({} bytes)",
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(NetResponse { url, final_url, status, headers, bytes, opaque, fetch_ms })
    }
}

/// Scheme, host, and port all match.
fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme() && a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}
