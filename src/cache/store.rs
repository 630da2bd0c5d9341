//! Storage seams for cached payloads and their fetch timestamps
//!
//! Content and metadata live in two separate key spaces. Both are keyed by the
//! resource identifier itself, so a metadata key can never collide with a
//! content key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing storage failed
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be encoded
    #[error("Failed to serialize store record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A response body together with the status and headers it arrived with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// HTTP status code reported by the origin
    pub status: u16,
    /// Response headers in the order the origin sent them
    pub headers: Vec<(String, String)>,
    /// Raw response body
    pub body: Vec<u8>,
}

impl Payload {
    /// Creates a `200 OK` payload with no headers
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Returns the first header value matching `name`, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the status code is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// When a resource was last fetched from origin
///
/// Serializes as `{"cachedAt": <milliseconds since epoch>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub cached_at: DateTime<Utc>,
}

impl MetadataRecord {
    pub fn new(cached_at: DateTime<Utc>) -> Self {
        Self { cached_at }
    }
}

/// Key-value storage for cached payloads
///
/// Implementations must be atomic per key. A read that cannot produce a
/// complete payload reports `Ok(None)`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get(&self, identifier: &str) -> Result<Option<Payload>, StoreError>;
    async fn put(&self, identifier: &str, payload: Payload) -> Result<(), StoreError>;
    /// Removes an entry. Returns whether one was present.
    async fn delete(&self, identifier: &str) -> Result<bool, StoreError>;
    /// Snapshot of every identifier currently stored
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Removes data left behind by writes that never completed, which
    /// `keys` cannot report. Returns how many leftovers were removed.
    async fn purge_incomplete(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}

/// Key-value storage for fetch timestamps
///
/// A record that is present but unparsable reports `Ok(None)`.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, identifier: &str) -> Result<Option<MetadataRecord>, StoreError>;
    async fn put(&self, identifier: &str, record: MetadataRecord) -> Result<(), StoreError>;
    async fn delete(&self, identifier: &str) -> Result<bool, StoreError>;
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}
