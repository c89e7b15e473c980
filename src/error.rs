//! Error types shared by the store fetcher, the key-value store and the engine.
//!
//! A regex that finds nothing in a store page is not an error: extraction
//! misses surface as `None` fields on [`StoreMetadata`](crate::store::StoreMetadata).

use thiserror::Error;

use crate::version::MalformedVersionError;

/// Library result alias
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("store page {url} returned HTTP {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("fetching {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
    #[error("no store link configured for {0}")]
    MissingLink(&'static str),
    #[error(transparent)]
    MalformedVersion(#[from] MalformedVersionError),
    #[error("key-value store error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("key-value store unavailable: {0}")]
    StorageUnavailable(String),
    #[error("failed to open {url}: {source}")]
    OpenLink {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Network-class failures: degrade to "no decision this cycle"
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Error::Network { .. } | Error::HttpStatus { .. } | Error::Timeout { .. }
        )
    }

    /// Storage-class failures: logged and swallowed by the engine
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::StorageUnavailable(_))
    }
}
