//! Progress-callback trait for per-asset pipeline events.
//!
//! Inject an [`Arc<dyn AssetProgressCallback>`] via
//! [`crate::config::PublishConfigBuilder::progress_callback`] to receive
//! events as the pipeline resolves each distinct asset reference.
//!
//! # Example
//!
//! ```rust
//! use docpress::{AssetProgressCallback, PublishConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     uploaded: Arc<AtomicUsize>,
//! }
//!
//! impl AssetProgressCallback for CountingCallback {
//!     fn on_asset_complete(&self, index: usize, total: usize, url: &str) {
//!         self.uploaded.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("asset {}/{} → {}", index, total, url);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     uploaded: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = PublishConfig::builder()
//!     .progress_callback(counter as Arc<dyn AssetProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it resolves asset references.
///
/// Implementations must be `Send + Sync`: `on_asset_start`,
/// `on_asset_complete` and `on_asset_error` may fire concurrently and out of
/// order. All methods default to no-ops.
pub trait AssetProgressCallback: Send + Sync {
    /// Called once, before any upload is dispatched.
    ///
    /// # Arguments
    /// * `total` — distinct references that will be resolved (canonical ones excluded)
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before a reference is resolved.
    ///
    /// # Arguments
    /// * `index`     — 1-indexed position in first-occurrence order
    /// * `total`     — distinct references being resolved
    /// * `reference` — log-safe preview of the reference
    fn on_asset_start(&self, index: usize, total: usize, reference: &str) {
        let _ = (index, total, reference);
    }

    /// Called when a reference has been made durable.
    fn on_asset_complete(&self, index: usize, total: usize, url: &str) {
        let _ = (index, total, url);
    }

    /// Called when a reference could not be resolved.
    fn on_asset_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every dispatched upload has settled.
    ///
    /// # Arguments
    /// * `total`    — distinct references that were resolved
    /// * `resolved` — how many succeeded
    fn on_batch_complete(&self, total: usize, resolved: usize) {
        let _ = (total, resolved);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AssetProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PublishConfig`].
pub type ProgressCallback = Arc<dyn AssetProgressCallback>;
