//! Error types for the docpress library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PublishError`] — **Fatal**: the pipeline cannot run at all (the
//!   document JSON does not parse, no durable store is configured, the
//!   output file cannot be written). Returned as `Err(PublishError)` from the
//!   top-level `process*` functions.
//!
//! * [`AssetError`] — **Non-fatal**: a single asset reference could not be
//!   made durable (bad data URI, remote host returned 404, store rejected the
//!   write). Stored inside [`crate::output::AssetOutcome`]; the reference is
//!   left unchanged in the canonical document and the markup.
//!
//! The ports ([`crate::store::AssetStore`], [`crate::fetch::AssetFetcher`])
//! report their own [`StoreError`] / [`FetchError`], which the uploader folds
//! into an [`AssetError`] scoped to the reference being resolved.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docpress library.
///
/// Per-asset failures use [`AssetError`] and are stored in
/// [`crate::output::ProcessOutput`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PublishError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The document JSON does not match the node-kind wire shape.
    #[error("Invalid document: {detail}")]
    InvalidDocument { detail: String },

    /// Could not read the document file.
    #[error("Failed to read document '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Collaborator errors ───────────────────────────────────────────────
    /// No durable store was handed in and none could be built from the
    /// environment.
    #[error("No asset store is configured.\n{hint}")]
    StoreNotConfigured { hint: String },

    /// Some assets resolved but at least one failed.
    ///
    /// Returned by [`crate::output::ProcessOutput::into_result`] when the
    /// caller wants to treat any unresolved asset as an error.
    #[error("{failed}/{total} assets could not be made durable")]
    PartialFailure {
        resolved: usize,
        failed: usize,
        total: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single asset reference.
///
/// `reference` is a display preview (data URIs are truncated), not the full
/// raw string.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum AssetError {
    /// A `data:` reference that is not a base64 image payload.
    #[error("Malformed inline asset '{reference}': {detail}")]
    MalformedReference { reference: String, detail: String },

    /// The external image could not be downloaded.
    #[error("Failed to fetch '{reference}': {detail}")]
    FetchFailed { reference: String, detail: String },

    /// The durable store refused or failed the write.
    #[error("Failed to upload '{reference}': {detail}")]
    UploadFailed { reference: String, detail: String },
}

impl AssetError {
    /// The (preview of the) reference this error is scoped to.
    pub fn reference(&self) -> &str {
        match self {
            AssetError::MalformedReference { reference, .. }
            | AssetError::FetchFailed { reference, .. }
            | AssetError::UploadFailed { reference, .. } => reference,
        }
    }
}

/// Failure reported by an [`crate::store::AssetStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store answered but refused the operation.
    #[error("store rejected '{name}': {detail}")]
    Rejected { name: String, detail: String },

    /// The store could not be reached at all.
    #[error("store unreachable: {0}")]
    Unreachable(String),

    /// The URL does not belong to this store.
    #[error("'{0}' is not a URL served by this store")]
    ForeignUrl(String),

    /// Local filesystem failure (filesystem-backed stores).
    #[error("store I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure reported by an [`crate::fetch::AssetFetcher`] implementation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote host answered with a non-2xx status.
    #[error("HTTP {status} from '{url}'")]
    Status { url: String, status: u16 },

    /// Connection, TLS or body-read failure.
    #[error("request to '{url}' failed: {reason}")]
    Network { url: String, reason: String },

    /// The download exceeded the fetcher's timeout.
    #[error("download of '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = PublishError::PartialFailure {
            resolved: 3,
            failed: 1,
            total: 4,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/4"), "got: {msg}");
    }

    #[test]
    fn asset_error_exposes_reference() {
        let e = AssetError::FetchFailed {
            reference: "https://example.com/a.png".into(),
            detail: "HTTP 404".into(),
        };
        assert_eq!(e.reference(), "https://example.com/a.png");
        assert!(e.to_string().contains("HTTP 404"));
    }

    #[test]
    fn asset_error_serialises_for_reports() {
        let e = AssetError::MalformedReference {
            reference: "data:image/png;base64,@@".into(),
            detail: "invalid base64".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("MalformedReference"));
        let back: AssetError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn fetch_status_display() {
        let e = FetchError::Status {
            url: "https://example.com/x.jpg".into(),
            status: 503,
        };
        assert!(e.to_string().contains("503"));
    }
}
