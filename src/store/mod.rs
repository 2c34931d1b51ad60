//! Durable, content-hosting storage for rehosted assets.
//!
//! [`AssetStore`] is the port the uploader writes through. The pipeline never
//! reaches for a global client: a store handle travels in
//! [`crate::config::PublishConfig`], so tests swap in [`MemoryStore`] and
//! deployments pick [`FsStore`] or [`HttpStore`].
//!
//! Every object is written under a fresh unique name chosen by the caller,
//! so concurrent `put`s never contend and no locking is needed across
//! resolutions.

mod fs;
mod http;

pub use fs::FsStore;
pub use http::HttpStore;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::pipeline::reference::is_under_base;

/// Storage backend for rehosted assets.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Public base URL; stored objects are served at `<base>/<name>`.
    fn public_base(&self) -> &str;

    /// Write `bytes` under `name` and return its permanent public URL.
    ///
    /// Must not overwrite an existing object.
    async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, StoreError>;

    /// Remove the object behind a URL previously returned by [`put`](Self::put).
    ///
    /// Deleting an object that is already gone is not an error.
    async fn delete(&self, url: &str) -> Result<(), StoreError>;

    /// `true` if `url` points into this store.
    fn owns(&self, url: &str) -> bool {
        is_under_base(url, self.public_base())
    }

    /// The object name behind one of this store's URLs.
    fn object_name(&self, url: &str) -> Result<String, StoreError> {
        let base = self.public_base().trim_end_matches('/');
        url.strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| StoreError::ForeignUrl(url.to_string()))
    }
}

/// Join a base URL and an object name with exactly one slash.
pub(crate) fn public_url(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

/// Object names are single path segments.
pub(crate) fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
        return Err(StoreError::Rejected {
            name: name.to_string(),
            detail: "object names must be a single non-hidden path segment".to_string(),
        });
    }
    Ok(())
}

// ── In-memory store ──────────────────────────────────────────────────────────

/// One object held by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Process-local store: for tests and `--dry-run`.
///
/// Counts every `put` (successful or not) so callers can assert how many
/// uploads a pipeline run performed.
#[derive(Debug)]
pub struct MemoryStore {
    base: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(BTreeMap::new()),
            puts: AtomicUsize::new(0),
        }
    }

    /// Number of `put` calls received so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up an object by name.
    pub fn get(&self, name: &str) -> Option<StoredObject> {
        self.lock().get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    fn public_base(&self) -> &str {
        &self.base
    }

    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        validate_name(name)?;

        let mut objects = self.lock();
        if objects.contains_key(name) {
            return Err(StoreError::Rejected {
                name: name.to_string(),
                detail: "object already exists".to_string(),
            });
        }
        objects.insert(
            name.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(public_url(&self.base, name))
    }

    async fn delete(&self, url: &str) -> Result<(), StoreError> {
        let name = self.object_name(url)?;
        self.lock().remove(&name);
        Ok(())
    }
}
