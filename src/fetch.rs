//! External fetch: download third-party images for rehosting.
//!
//! [`AssetFetcher`] is the port; [`HttpFetcher`] is the reqwest-backed
//! default. The per-request timeout lives here, in the adapter; the pipeline
//! itself imposes none.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;

/// Bytes downloaded from an external URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    /// Raw `Content-Type` header, if the server sent one.
    pub content_type: Option<String>,
}

/// Downloads the bytes behind an absolute URL.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedAsset, FetchError>;
}

/// Plain HTTP(S) GET via reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                reason: format!("HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    fn network_error(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchedAsset, FetchError> {
        debug!("Downloading external asset: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.network_error(url, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.network_error(url, e))?;

        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(FetchedAsset {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
