//! Publish entry points: document tree → canonical tree + markup.
//!
//! [`process`] runs the six pipeline steps in strict order:
//!
//! 1. extract image references (render order, duplicates kept)
//! 2. dedup them, first occurrence wins
//! 3. resolve each distinct non-canonical reference, concurrently, and join
//!    on all of them
//! 4. build the reference → canonical URL mapping from successes only
//! 5. rewrite the tree with that mapping
//! 6. render markup from the rewritten tree
//!
//! No single asset failure aborts the run: a failed reference stays as it
//! was in both the canonical tree and the markup, and its error is returned
//! in [`ProcessOutput::assets`].
//!
//! ## Cancellation
//!
//! Dropping the future returned by [`process`] after step 3 has started does
//! not roll back uploads that already reached the store. Those objects are
//! orphaned (nothing references them). The pipeline accepts this instead of
//! attempting cleanup; [`release_orphans`] or a periodic sweep can reclaim
//! them.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PublishConfig;
use crate::document::Document;
use crate::error::{AssetError, PublishError};
use crate::fetch::{AssetFetcher, HttpFetcher};
use crate::output::{AssetOutcome, CleanupReport, ProcessOutput, ProcessStats};
use crate::pipeline::cleanup::orphaned_assets;
use crate::pipeline::extract::{distinct, extract_references};
use crate::pipeline::reference::{preview, AssetKind};
use crate::pipeline::rewrite::{rewrite, ReferenceMap};
use crate::pipeline::upload::AssetUploader;
use crate::pipeline::html;
use crate::store::{AssetStore, FsStore, HttpStore};

/// Publish a document: rehost its assets, rewrite it, render it.
///
/// # Returns
/// `Ok(ProcessOutput)` even if some assets failed (check
/// `output.stats.failed_assets` or [`ProcessOutput::warnings`]).
///
/// # Errors
/// Returns `Err(PublishError)` only when the pipeline cannot start: no store
/// is configured, or the default fetcher cannot be built.
pub async fn process(
    document: &Document,
    config: &PublishConfig,
) -> Result<ProcessOutput, PublishError> {
    let total_start = Instant::now();
    let uploader = AssetUploader::new(
        resolve_store(config)?,
        resolve_fetcher(config)?,
        config.fallback_content_type.clone(),
    );

    // ── Step 1: Extract references ───────────────────────────────────────
    let references = extract_references(document);

    // ── Step 2: Distinct references, first occurrence first ──────────────
    let distinct_refs = distinct(&references);
    let mut occurrences: HashMap<&str, usize> = HashMap::with_capacity(distinct_refs.len());
    for r in &references {
        *occurrences.entry(r.as_str()).or_default() += 1;
    }
    info!(
        "Publishing document: {} image nodes, {} distinct references",
        references.len(),
        distinct_refs.len()
    );

    let mut assets: Vec<AssetOutcome> = distinct_refs
        .iter()
        .map(|reference| {
            let kind = uploader.classify(reference);
            AssetOutcome {
                reference: reference.clone(),
                kind,
                occurrences: occurrences.get(reference.as_str()).copied().unwrap_or(1),
                // Canonical and skipped references keep their value.
                result: Ok(reference.clone()),
            }
        })
        .collect();

    let pending: Vec<usize> = assets
        .iter()
        .enumerate()
        .filter(|(_, a)| match a.kind {
            AssetKind::Canonical => false,
            AssetKind::External => config.rehost_external,
            AssetKind::InlineEmbedded => true,
        })
        .map(|(slot, _)| slot)
        .collect();
    debug!(
        "{} references need resolving, {} left as-is",
        pending.len(),
        assets.len() - pending.len()
    );

    // ── Step 3: Resolve (fan-out, then join) ─────────────────────────────
    let resolve_start = Instant::now();
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(pending.len());
    }
    let settled = resolve_all(&uploader, &assets, &pending, config).await;
    let resolve_duration_ms = resolve_start.elapsed().as_millis() as u64;

    for (slot, result) in settled {
        assets[slot].result = result;
    }

    // ── Step 4: Mapping from successes only ──────────────────────────────
    let mapping: ReferenceMap = pending
        .iter()
        .filter_map(|&slot| {
            let asset = &assets[slot];
            asset
                .result
                .as_ref()
                .ok()
                .map(|url| (asset.reference.clone(), url.clone()))
        })
        .collect();

    // ── Step 5: Rewrite ──────────────────────────────────────────────────
    let canonical = rewrite(document, &mapping);

    // ── Step 6: Render ───────────────────────────────────────────────────
    let markup = html::render(&canonical);

    let failed = pending
        .iter()
        .filter(|&&slot| assets[slot].result.is_err())
        .count();
    let stats = ProcessStats {
        image_nodes: references.len(),
        distinct_references: distinct_refs.len(),
        canonical_assets: assets
            .iter()
            .filter(|a| a.kind == AssetKind::Canonical)
            .count(),
        skipped_assets: assets.iter().filter(|a| a.skipped()).count(),
        resolved_assets: mapping.len(),
        failed_assets: failed,
        resolve_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(pending.len(), stats.resolved_assets);
    }

    if failed > 0 {
        warn!(
            "Publish finished with {}/{} assets unresolved",
            failed,
            pending.len()
        );
    }
    info!(
        "Publish complete: {} resolved, {} failed, {} bytes of markup, {}ms total",
        stats.resolved_assets,
        stats.failed_assets,
        markup.len(),
        stats.total_duration_ms
    );

    Ok(ProcessOutput {
        document: canonical,
        markup,
        assets,
        stats,
    })
}

/// Parse a JSON document and publish it.
pub async fn process_json(
    json: &str,
    config: &PublishConfig,
) -> Result<ProcessOutput, PublishError> {
    let document = Document::from_json(json)?;
    process(&document, config).await
}

/// Read a JSON document from disk and publish it.
pub async fn process_file(
    path: impl AsRef<Path>,
    config: &PublishConfig,
) -> Result<ProcessOutput, PublishError> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PublishError::InputReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    process_json(&json, config).await
}

/// Publish a document and write the markup and the canonical JSON to disk.
///
/// Uses atomic writes (temp file + rename) to prevent partial files.
pub async fn process_to_files(
    document: &Document,
    markup_path: impl AsRef<Path>,
    document_path: impl AsRef<Path>,
    config: &PublishConfig,
) -> Result<ProcessOutput, PublishError> {
    let output = process(document, config).await?;
    write_atomic(markup_path.as_ref(), &output.markup).await?;
    write_atomic(document_path.as_ref(), &output.document.to_json_pretty()?).await?;
    Ok(output)
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    document: &Document,
    config: &PublishConfig,
) -> Result<ProcessOutput, PublishError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PublishError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process(document, config))
}

/// Make a single reference durable, e.g. a post's featured image.
///
/// Same rules as an inline image: canonical references come back unchanged,
/// data URIs are uploaded, external URLs are rehosted. A failure is returned
/// as the inner `Err` rather than aborting.
pub async fn resolve_featured_image(
    reference: &str,
    config: &PublishConfig,
) -> Result<Result<String, AssetError>, PublishError> {
    let uploader = AssetUploader::new(
        resolve_store(config)?,
        resolve_fetcher(config)?,
        config.fallback_content_type.clone(),
    );
    if uploader.classify(reference) == AssetKind::External && !config.rehost_external {
        return Ok(Ok(reference.to_string()));
    }
    let result = uploader.resolve(reference).await;
    if let Err(ref e) = result {
        warn!("Featured image unresolved: {}", e);
    }
    Ok(result)
}

/// Delete store objects that `previous` referenced and `current` no longer does.
///
/// Failures are collected per URL; one failed delete does not stop the rest.
pub async fn release_orphans(
    previous: &Document,
    current: &Document,
    config: &PublishConfig,
) -> Result<CleanupReport, PublishError> {
    let store = resolve_store(config)?;
    let orphans = orphaned_assets(previous, current, store.public_base());
    info!("Releasing {} orphaned assets", orphans.len());

    let results: Vec<(String, Result<(), String>)> = stream::iter(orphans.into_iter().map(|url| {
        let store = Arc::clone(&store);
        async move {
            let result = store.delete(&url).await.map_err(|e| e.to_string());
            (url, result)
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    let mut report = CleanupReport::default();
    for (url, result) in results {
        match result {
            Ok(()) => report.deleted.push(url),
            Err(reason) => {
                warn!("Failed to delete {}: {}", url, reason);
                report.failed.push((url, reason));
            }
        }
    }
    report.deleted.sort();
    report.failed.sort();
    Ok(report)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the durable store, from most-specific to least-specific.
///
/// 1. **Explicit handle**: `config.store`, used as-is.
/// 2. **HTTP object storage**: `DOCPRESS_STORE_URL`, `DOCPRESS_STORE_BUCKET`
///    and `DOCPRESS_STORE_KEY` all set and non-empty.
/// 3. **Local directory**: `DOCPRESS_STORE_DIR` plus `DOCPRESS_PUBLIC_URL`.
pub fn resolve_store(config: &PublishConfig) -> Result<Arc<dyn AssetStore>, PublishError> {
    if let Some(ref store) = config.store {
        return Ok(Arc::clone(store));
    }

    let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

    if let (Some(url), Some(bucket), Some(key)) = (
        env("DOCPRESS_STORE_URL"),
        env("DOCPRESS_STORE_BUCKET"),
        env("DOCPRESS_STORE_KEY"),
    ) {
        let store = HttpStore::new(url, bucket, key).map_err(|e| {
            PublishError::StoreNotConfigured {
                hint: format!("HTTP store could not be created: {e}"),
            }
        })?;
        return Ok(Arc::new(store));
    }

    if let (Some(dir), Some(public)) = (env("DOCPRESS_STORE_DIR"), env("DOCPRESS_PUBLIC_URL")) {
        return Ok(Arc::new(FsStore::new(dir, public)));
    }

    Err(PublishError::StoreNotConfigured {
        hint: "Pass a store in PublishConfig, or set DOCPRESS_STORE_URL, \
               DOCPRESS_STORE_BUCKET and DOCPRESS_STORE_KEY (object storage), \
               or DOCPRESS_STORE_DIR and DOCPRESS_PUBLIC_URL (local directory)."
            .to_string(),
    })
}

fn resolve_fetcher(config: &PublishConfig) -> Result<Arc<dyn AssetFetcher>, PublishError> {
    if let Some(ref fetcher) = config.fetcher {
        return Ok(Arc::clone(fetcher));
    }
    let fetcher = HttpFetcher::new(config.fetch_timeout_secs)
        .map_err(|e| PublishError::Internal(format!("Failed to build HTTP fetcher: {e}")))?;
    Ok(Arc::new(fetcher))
}

/// Resolve every pending slot concurrently; returns once all have settled.
async fn resolve_all(
    uploader: &AssetUploader,
    assets: &[AssetOutcome],
    pending: &[usize],
    config: &PublishConfig,
) -> Vec<(usize, Result<String, AssetError>)> {
    let total = pending.len();
    stream::iter(pending.iter().enumerate().map(move |(n, &slot)| {
        let reference = assets[slot].reference.as_str();
        let index = n + 1;
        async move {
            if let Some(ref cb) = config.progress_callback {
                cb.on_asset_start(index, total, &preview(reference));
            }
            let result = uploader.resolve(reference).await;
            match &result {
                Ok(url) => {
                    debug!("Asset {}/{} → {}", index, total, url);
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_asset_complete(index, total, url);
                    }
                }
                Err(e) => {
                    warn!("Asset {}/{} left unresolved: {}", index, total, e);
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_asset_error(index, total, &e.to_string());
                    }
                }
            }
            (slot, result)
        }
    }))
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await
}

async fn write_atomic(path: &Path, contents: &str) -> Result<(), PublishError> {
    let write_err = |e| PublishError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);
    let written = match tokio::fs::write(&tmp_path, contents).await {
        Ok(()) => tokio::fs::rename(&tmp_path, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Node;
    use crate::store::MemoryStore;

    const BASE: &str = "https://cdn.test/assets";

    fn config_with(store: Arc<MemoryStore>) -> PublishConfig {
        PublishConfig::builder().store(store).build().unwrap()
    }

    #[tokio::test]
    async fn document_without_images_is_rendered_unchanged() {
        let store = Arc::new(MemoryStore::new(BASE));
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("plain")])]);
        let out = process(&doc, &config_with(store.clone())).await.unwrap();
        assert_eq!(out.document, doc);
        assert_eq!(out.markup, "<p>plain</p>");
        assert!(out.assets.is_empty());
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn disabled_rehosting_leaves_external_images() {
        let store = Arc::new(MemoryStore::new(BASE));
        let config = PublishConfig::builder()
            .store(store.clone())
            .rehost_external(false)
            .build()
            .unwrap();
        let doc = Document::new(vec![Node::image("https://elsewhere.test/a.png", "")]);

        let out = process(&doc, &config).await.unwrap();
        assert_eq!(out.document, doc);
        assert_eq!(out.stats.skipped_assets, 1);
        assert_eq!(out.stats.failed_assets, 0);
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn featured_image_goes_through_the_uploader() {
        let store = Arc::new(MemoryStore::new(BASE));
        let url = resolve_featured_image("data:image/jpeg;base64,/9j/", &config_with(store.clone()))
            .await
            .unwrap()
            .unwrap();
        assert!(url.starts_with(BASE) && url.ends_with(".jpg"), "got: {url}");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn release_orphans_deletes_dropped_objects() {
        let store = Arc::new(MemoryStore::new(BASE));
        let config = config_with(store.clone());
        let kept = store.put("kept.png", vec![1], "image/png").await.unwrap();
        let dropped = store.put("dropped.png", vec![2], "image/png").await.unwrap();

        let previous = Document::new(vec![Node::image(&kept, ""), Node::image(&dropped, "")]);
        let current = Document::new(vec![Node::image(&kept, "")]);

        let report = release_orphans(&previous, &current, &config).await.unwrap();
        assert_eq!(report.deleted, vec![dropped]);
        assert!(report.failed.is_empty());
        assert!(store.get("kept.png").is_some());
        assert!(store.get("dropped.png").is_none());
    }

    #[tokio::test]
    async fn process_to_files_writes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new(BASE));
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("x")])]);
        let html_path = dir.path().join("out/post.html");
        let json_path = dir.path().join("out/post.json");

        process_to_files(&doc, &html_path, &json_path, &config_with(store))
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&html_path).unwrap(), "<p>x</p>");
        let json = std::fs::read_to_string(&json_path).unwrap();
        assert_eq!(Document::from_json(&json).unwrap(), doc);
        assert!(!dir.path().join("out/post.html.tmp").exists());
    }

    #[tokio::test]
    async fn failed_output_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new(BASE));
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("x")])]);
        // A non-empty directory where the markup file should go: the final
        // rename cannot replace it.
        let html_path = dir.path().join("post.html");
        std::fs::create_dir_all(html_path.join("occupied")).unwrap();

        let json_path = dir.path().join("post.json");

        let err = process_to_files(&doc, &html_path, &json_path, &config_with(store))
            .await
            .unwrap_err();

        assert!(
            matches!(err, PublishError::OutputWriteFailed { .. }),
            "got: {err:?}"
        );
        assert!(html_path.is_dir());
        assert!(!dir.path().join("post.html.tmp").exists());
    }

    #[tokio::test]
    async fn invalid_json_is_fatal() {
        let store = Arc::new(MemoryStore::new(BASE));
        let err = process_json("{\"root\": 3}", &config_with(store))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::InvalidDocument { .. }));
    }

    #[test]
    fn sync_wrapper_runs_pipeline() {
        let store = Arc::new(MemoryStore::new(BASE));
        let doc = Document::new(vec![Node::image("data:image/png;base64,AAAA", "")]);
        let out = process_sync(&doc, &config_with(store.clone())).unwrap();
        assert_eq!(out.stats.resolved_assets, 1);
        assert_eq!(store.put_count(), 1);
    }
}
