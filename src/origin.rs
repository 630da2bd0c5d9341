//! Origin fetching for cached assets
//!
//! The [`Origin`] trait is the only way the cache talks to the network, so
//! tests and embedders can substitute their own transport.

use crate::cache::Payload;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default time allowed for a single origin fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that can occur when fetching from origin
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The origin did not answer in time
    #[error("Origin fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The origin could not be reached
    #[error("Origin unavailable: {0}")]
    Unavailable(String),
}

/// Source of fresh payloads
#[async_trait]
pub trait Origin: Send + Sync {
    /// Fetches the resource named by `identifier`.
    ///
    /// Any response that arrives is returned as `Ok`, whatever its status;
    /// only transport-level failures are errors.
    async fn fetch(&self, identifier: &str) -> Result<Payload, FetchError>;
}

/// Fetches payloads over HTTP(S), treating the identifier as the URL
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    /// HTTP client for making requests
    http_client: Client,
    timeout: Duration,
}

impl HttpOrigin {
    /// Creates an origin whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("assetcache/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http_client,
            timeout,
        })
    }
}

#[async_trait]
impl Origin for HttpOrigin {
    async fn fetch(&self, identifier: &str) -> Result<Payload, FetchError> {
        debug!(url = %identifier, "Fetching from origin");

        let response = self.http_client.get(identifier).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Http(e)
            }
        })?;

        debug!(url = %identifier, status, size = body.len(), "Fetched from origin");

        Ok(Payload {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
