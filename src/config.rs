//! Configuration types for document publishing.
//!
//! All pipeline behaviour is controlled through [`PublishConfig`], built via
//! its [`PublishConfigBuilder`]. Collaborators (the durable store, the
//! external fetcher, a progress callback) are explicit handles on the config
//! rather than process-wide clients, so a test can hand in in-memory fakes.

use std::fmt;
use std::sync::Arc;

use crate::error::PublishError;
use crate::fetch::AssetFetcher;
use crate::progress::ProgressCallback;
use crate::store::AssetStore;

/// Configuration for a publish run.
///
/// Built via [`PublishConfig::builder()`] or using
/// [`PublishConfig::default()`].
///
/// # Example
/// ```rust
/// use docpress::{MemoryStore, PublishConfig};
/// use std::sync::Arc;
///
/// let config = PublishConfig::builder()
///     .store(Arc::new(MemoryStore::new("https://cdn.example.com/assets")))
///     .concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PublishConfig {
    /// Maximum number of asset resolutions in flight at once. Default: 8.
    ///
    /// Every distinct reference is still dispatched and joined before the
    /// tree is rewritten; this only bounds how many run simultaneously.
    pub concurrency: usize,

    /// Timeout for each external download, in seconds. Default: 30.
    ///
    /// Applies to the default [`crate::fetch::HttpFetcher`] only. A custom
    /// fetcher owns its own timeout policy.
    pub fetch_timeout_secs: u64,

    /// Content type assumed for a download whose type can be neither read
    /// from the response nor sniffed from its bytes. Default: `image/jpeg`.
    pub fallback_content_type: String,

    /// Rehost external `http(s)` images. Default: true.
    ///
    /// When false, external references are left in place untouched.
    pub rehost_external: bool,

    /// Durable store. When `None`, built from the environment (see
    /// [`crate::publish::resolve_store`]).
    pub store: Option<Arc<dyn AssetStore>>,

    /// External fetcher. When `None`, an [`crate::fetch::HttpFetcher`] is
    /// built from `fetch_timeout_secs`.
    pub fetcher: Option<Arc<dyn AssetFetcher>>,

    /// Per-asset progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            fetch_timeout_secs: 30,
            fallback_content_type: "image/jpeg".to_string(),
            rehost_external: true,
            store: None,
            fetcher: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("concurrency", &self.concurrency)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fallback_content_type", &self.fallback_content_type)
            .field("rehost_external", &self.rehost_external)
            .field("store", &self.store.as_ref().map(|s| s.public_base().to_string()))
            .field("fetcher", &self.fetcher.as_ref().map(|_| "<dyn AssetFetcher>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AssetProgressCallback>"),
            )
            .finish()
    }
}

impl PublishConfig {
    /// Create a new builder for `PublishConfig`.
    pub fn builder() -> PublishConfigBuilder {
        PublishConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PublishConfig`].
#[derive(Debug)]
pub struct PublishConfigBuilder {
    config: PublishConfig,
}

impl PublishConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn fallback_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.fallback_content_type = content_type.into();
        self
    }

    pub fn rehost_external(mut self, v: bool) -> Self {
        self.config.rehost_external = v;
        self
    }

    pub fn store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.config.store = Some(store);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.config.fetcher = Some(fetcher);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PublishConfig, PublishError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(PublishError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.fetch_timeout_secs == 0 {
            return Err(PublishError::InvalidConfig(
                "Fetch timeout must be ≥ 1 second".into(),
            ));
        }
        match c.fallback_content_type.split_once('/') {
            Some((t, s)) if !t.is_empty() && !s.is_empty() => {}
            _ => {
                return Err(PublishError::InvalidConfig(format!(
                    "Fallback content type must look like 'type/subtype', got '{}'",
                    c.fallback_content_type
                )))
            }
        }
        Ok(self.config)
    }
}
