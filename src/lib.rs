//! # docpress
//!
//! Publish rich-text documents: make every embedded image durable, rewrite
//! the document to point at the durable copies, and render it to markup.
//!
//! ## Why this crate?
//!
//! Editors hand over trees whose images are inline `data:` URIs or hotlinks
//! to third-party hosts. Storing those as-is bloats the document and leaves
//! it at the mercy of hosts you don't control. This crate uploads every
//! non-durable image once to a store you own, rewrites the tree so each image
//! source is a canonical store URL, and renders markup from the rewritten
//! tree, so the stored tree and the markup always agree.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Document (JSON tree)
//!  │
//!  ├─ 1. Extract  image.src references in render order
//!  ├─ 2. Dedup    one upload per distinct reference
//!  ├─ 3. Resolve  concurrent decode / fetch + store.put, joined
//!  ├─ 4. Map      reference → canonical URL (successes only)
//!  ├─ 5. Rewrite  new tree, failed references left unchanged
//!  └─ 6. Render   markup fragment + per-asset outcomes
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docpress::{process_json, FsStore, PublishConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FsStore::new("/srv/assets", "https://cdn.example.com/assets");
//!     let config = PublishConfig::builder().store(Arc::new(store)).build()?;
//!
//!     let json = std::fs::read_to_string("post.json")?;
//!     let output = process_json(&json, &config).await?;
//!     println!("{}", output.markup);
//!     for warning in output.warnings() {
//!         eprintln!("left unchanged: {warning}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docpress` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docpress = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Store
//!
//! | Store | Use for |
//! |-------|---------|
//! | [`HttpStore`]   | Bucket-style object storage over HTTP |
//! | [`FsStore`]     | A directory served by a static file server |
//! | [`MemoryStore`] | Tests and dry runs |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PublishConfig, PublishConfigBuilder};
pub use document::{Attributes, Document, ListType, Node, TextFormat};
pub use error::{AssetError, FetchError, PublishError, StoreError};
pub use fetch::{AssetFetcher, FetchedAsset, HttpFetcher};
pub use output::{AssetOutcome, CleanupReport, ProcessOutput, ProcessStats};
pub use pipeline::html::render;
pub use pipeline::reference::AssetKind;
pub use progress::{AssetProgressCallback, NoopProgressCallback, ProgressCallback};
pub use publish::{
    process, process_file, process_json, process_sync, process_to_files, release_orphans,
    resolve_featured_image, resolve_store,
};
pub use store::{AssetStore, FsStore, HttpStore, MemoryStore, StoredObject};
