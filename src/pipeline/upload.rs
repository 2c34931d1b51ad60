//! Asset upload: make one reference durable and return its canonical URL.
//!
//! | Kind | Behaviour |
//! |------|-----------|
//! | canonical | returned unchanged, no I/O |
//! | inline-embedded | base64-decode, name by MIME type, `put` |
//! | external | `get`, infer MIME from the response, `put` |
//!
//! Each successful upload lands under a fresh `<uuid-v7>.<ext>` name, so
//! concurrent resolutions never write the same object. Deduplication of
//! identical references is the orchestrator's job: [`AssetUploader::resolve`]
//! uploads every time it is called.

use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::AssetError;
use crate::fetch::AssetFetcher;
use crate::pipeline::reference::{
    classify, decode_data_uri, extension_for, infer_content_type, preview, AssetKind,
};
use crate::store::AssetStore;

/// Resolves asset references against a store and a fetcher.
#[derive(Clone)]
pub struct AssetUploader {
    store: Arc<dyn AssetStore>,
    fetcher: Arc<dyn AssetFetcher>,
    fallback_content_type: String,
}

impl AssetUploader {
    pub fn new(
        store: Arc<dyn AssetStore>,
        fetcher: Arc<dyn AssetFetcher>,
        fallback_content_type: impl Into<String>,
    ) -> Self {
        Self {
            store,
            fetcher,
            fallback_content_type: fallback_content_type.into(),
        }
    }

    /// Classify `reference` against this uploader's store.
    pub fn classify(&self, reference: &str) -> AssetKind {
        classify(reference, self.store.public_base())
    }

    /// Make `reference` durable and return its canonical URL.
    pub async fn resolve(&self, reference: &str) -> Result<String, AssetError> {
        match self.classify(reference) {
            AssetKind::Canonical => Ok(reference.to_string()),
            AssetKind::InlineEmbedded => {
                let asset = decode_data_uri(reference)?;
                debug!(
                    "Decoded inline asset: {} bytes of {}",
                    asset.bytes.len(),
                    asset.mime_type
                );
                self.put(reference, asset.bytes, &asset.mime_type).await
            }
            AssetKind::External => {
                let fetched =
                    self.fetcher
                        .get(reference)
                        .await
                        .map_err(|e| AssetError::FetchFailed {
                            reference: preview(reference),
                            detail: e.to_string(),
                        })?;
                let content_type = infer_content_type(
                    fetched.content_type.as_deref(),
                    &fetched.bytes,
                    &self.fallback_content_type,
                );
                self.put(reference, fetched.bytes, &content_type).await
            }
        }
    }

    async fn put(
        &self,
        reference: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AssetError> {
        let name = object_name(content_type);
        self.store
            .put(&name, bytes, content_type)
            .await
            .map_err(|e| AssetError::UploadFailed {
                reference: preview(reference),
                detail: e.to_string(),
            })
    }
}

/// A fresh, time-ordered unique object name with an extension for `content_type`.
pub fn object_name(content_type: &str) -> String {
    format!("{}.{}", Uuid::now_v7(), extension_for(content_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, StoreError};
    use crate::fetch::FetchedAsset;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BASE: &str = "https://cdn.test/assets";

    /// Serves a fixed response and counts calls.
    struct StubFetcher {
        response: Result<FetchedAsset, u16>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AssetFetcher for StubFetcher {
        async fn get(&self, url: &str) -> Result<FetchedAsset, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone().map_err(|status| FetchError::Status {
                url: url.to_string(),
                status,
            })
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl AssetStore for BrokenStore {
        fn public_base(&self) -> &str {
            BASE
        }

        async fn put(&self, _: &str, _: Vec<u8>, _: &str) -> Result<String, StoreError> {
            Err(StoreError::Unreachable("connection refused".into()))
        }

        async fn delete(&self, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn uploader(
        store: Arc<dyn AssetStore>,
        response: Result<FetchedAsset, u16>,
    ) -> (AssetUploader, Arc<StubFetcher>) {
        let fetcher = Arc::new(StubFetcher {
            response,
            calls: AtomicUsize::new(0),
        });
        (
            AssetUploader::new(store, fetcher.clone(), "image/jpeg"),
            fetcher,
        )
    }

    #[tokio::test]
    async fn canonical_reference_short_circuits() {
        let store = Arc::new(MemoryStore::new(BASE));
        let (up, fetcher) = uploader(store.clone(), Err(500));
        let url = format!("{BASE}/already.png");
        assert_eq!(up.resolve(&url).await.unwrap(), url);
        assert_eq!(up.resolve("/relative.png").await.unwrap(), "/relative.png");
        assert_eq!(store.put_count(), 0);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn inline_asset_is_stored_under_mime_extension() {
        let store = Arc::new(MemoryStore::new(BASE));
        let (up, _) = uploader(store.clone(), Err(500));

        let url = up.resolve("data:image/png;base64,AAAA").await.unwrap();

        assert!(url.starts_with(&format!("{BASE}/")), "got: {url}");
        assert!(url.ends_with(".png"));
        let name = url.rsplit('/').next().unwrap();
        let object = store.get(name).unwrap();
        assert_eq!(object.bytes, vec![0, 0, 0]);
        assert_eq!(object.content_type, "image/png");
    }

    #[tokio::test]
    async fn malformed_inline_asset_never_reaches_the_store() {
        let store = Arc::new(MemoryStore::new(BASE));
        let (up, _) = uploader(store.clone(), Err(500));
        let err = up.resolve("data:image/png;base64,!!!").await.unwrap_err();
        assert!(matches!(err, AssetError::MalformedReference { .. }));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn external_asset_is_rehosted_with_sniffed_type() {
        let store = Arc::new(MemoryStore::new(BASE));
        let (up, fetcher) = uploader(
            store.clone(),
            Ok(FetchedAsset {
                bytes: b"GIF89a\x01\x00\x01\x00".to_vec(),
                content_type: None,
            }),
        );

        let url = up.resolve("https://elsewhere.test/anim").await.unwrap();
        assert!(url.ends_with(".gif"), "got: {url}");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_scoped_to_the_reference() {
        let store = Arc::new(MemoryStore::new(BASE));
        let (up, _) = uploader(store.clone(), Err(404));
        let err = up.resolve("https://elsewhere.test/x.png").await.unwrap_err();
        match err {
            AssetError::FetchFailed { reference, detail } => {
                assert_eq!(reference, "https://elsewhere.test/x.png");
                assert!(detail.contains("404"));
            }
            other => panic!("expected fetch failure, got {other:?}"),
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn store_failure_becomes_upload_error() {
        let (up, _) = uploader(Arc::new(BrokenStore), Err(500));
        let err = up.resolve("data:image/png;base64,AAAA").await.unwrap_err();
        assert!(matches!(err, AssetError::UploadFailed { .. }));
    }

    #[test]
    fn object_names_are_unique() {
        let a = object_name("image/png");
        let b = object_name("image/png");
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));
    }
}
