//! Results of a publish run.

use serde::Serialize;

use crate::document::Document;
use crate::error::{AssetError, PublishError};
use crate::pipeline::reference::AssetKind;

/// Everything a publish run produces.
///
/// Returned even when some assets failed; check [`ProcessOutput::warnings`]
/// or call [`ProcessOutput::into_result`] to treat any failure as fatal.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// The canonical tree: every resolvable image source rewritten.
    pub document: Document,
    /// Markup rendered from the canonical tree.
    pub markup: String,
    /// One entry per distinct reference, in first-occurrence order.
    pub assets: Vec<AssetOutcome>,
    pub stats: ProcessStats,
}

impl ProcessOutput {
    /// Errors of every asset that could not be made durable.
    pub fn warnings(&self) -> Vec<&AssetError> {
        self.assets
            .iter()
            .filter_map(|a| a.result.as_ref().err())
            .collect()
    }

    /// `true` when no dispatched asset failed.
    pub fn is_complete(&self) -> bool {
        self.stats.failed_assets == 0
    }

    /// Err with [`PublishError::PartialFailure`] if any asset failed.
    pub fn into_result(self) -> Result<Self, PublishError> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(PublishError::PartialFailure {
                resolved: self.stats.resolved_assets,
                failed: self.stats.failed_assets,
                total: self.stats.resolved_assets + self.stats.failed_assets,
            })
        }
    }
}

/// What happened to one distinct reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetOutcome {
    /// The raw reference as found in the document.
    #[serde(skip)]
    pub reference: String,
    pub kind: AssetKind,
    /// How many image nodes carried this reference.
    pub occurrences: usize,
    /// Canonical URL, or why the reference was left unchanged.
    pub result: Result<String, AssetError>,
}

impl AssetOutcome {
    /// `true` when the reference now points into the durable store
    /// (including references that already did).
    pub fn is_canonical(&self) -> bool {
        self.result.is_ok() && !self.skipped()
    }

    /// `true` for external references left alone because rehosting is off.
    pub fn skipped(&self) -> bool {
        self.kind == AssetKind::External && self.result.as_deref() == Ok(self.reference.as_str())
    }
}

/// Counters for one publish run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessStats {
    /// Image nodes carrying a non-empty source.
    pub image_nodes: usize,
    /// Distinct references among them.
    pub distinct_references: usize,
    /// References already canonical (or not the pipeline's to touch).
    pub canonical_assets: usize,
    /// External references left alone because rehosting is disabled.
    pub skipped_assets: usize,
    /// Uploads that succeeded.
    pub resolved_assets: usize,
    /// Uploads that failed and were left unchanged.
    pub failed_assets: usize,
    pub resolve_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of deleting orphaned store objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    /// `(url, reason)` for each object that could not be deleted.
    pub failed: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(kind: AssetKind, reference: &str, result: Result<&str, AssetError>) -> AssetOutcome {
        AssetOutcome {
            reference: reference.to_string(),
            kind,
            occurrences: 1,
            result: result.map(str::to_string),
        }
    }

    #[test]
    fn into_result_reports_partial_failure() {
        let output = ProcessOutput {
            document: Document::new(vec![]),
            markup: String::new(),
            assets: vec![
                outcome(AssetKind::InlineEmbedded, "data:a", Ok("https://cdn/1.png")),
                outcome(
                    AssetKind::External,
                    "https://x/2.png",
                    Err(AssetError::FetchFailed {
                        reference: "https://x/2.png".into(),
                        detail: "HTTP 500".into(),
                    }),
                ),
            ],
            stats: ProcessStats {
                resolved_assets: 1,
                failed_assets: 1,
                ..Default::default()
            },
        };
        assert_eq!(output.warnings().len(), 1);
        let err = output.into_result().unwrap_err();
        assert!(matches!(
            err,
            PublishError::PartialFailure {
                resolved: 1,
                failed: 1,
                total: 2
            }
        ));
    }

    #[test]
    fn skipped_external_is_not_canonical() {
        let o = outcome(AssetKind::External, "https://x/a.png", Ok("https://x/a.png"));
        assert!(o.skipped());
        assert!(!o.is_canonical());

        let o = outcome(AssetKind::External, "https://x/a.png", Ok("https://cdn/a.png"));
        assert!(!o.skipped());
        assert!(o.is_canonical());
    }
}
