//! Unified error types for the outpost engine.
//!
//! Display messages carry a stable SCREAMING prefix so host-side log
//! scraping can key on the failure class without parsing Rust types.

use tokio_rusqlite::rusqlite;

/// Unified error types for the outpost engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or unsupported request descriptor.
    #[error("INVALID_REQUEST: {0}")]
    InvalidRequest(String),

    /// URL could not be canonicalized into a fetchable form.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Generation store operation failed.
    #[error("STORE_ERROR: {0}")]
    Store(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Transport-level network failure (offline, DNS, reset, aborted).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Network fetch exceeded the configured timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Response body exceeded the configured byte ceiling.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A manifest asset could not be resolved during install.
    #[error("INSTALL_FAILED: {url}: {reason}")]
    InstallFailed { url: String, reason: String },
}

impl Error {
    /// Whether this error came out of a network fetch rather than the store.
    ///
    /// Strategies recover from fetch failures by falling back to cached
    /// documents; store failures always propagate.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Store(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Store(tokio_rusqlite::Error::Close(c)),
            _ => Error::Store(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Store(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(tokio_rusqlite::Error::Error(err))
    }
}
