//! Orphaned-asset detection for replace flows.
//!
//! When a document is saved over a previous revision, canonical objects the
//! old revision referenced but the new one no longer does can be deleted from
//! the store. Detection is pure; deletion lives in
//! [`crate::publish::release_orphans`].

use std::collections::HashSet;

use crate::document::Document;
use crate::pipeline::extract::{distinct, extract_references};
use crate::pipeline::reference::is_under_base;

/// Store URLs referenced by `previous` but not by `current`, in first-seen order.
///
/// Only references under `store_base` are considered; external or relative
/// sources are never the store's to delete.
pub fn orphaned_assets(previous: &Document, current: &Document, store_base: &str) -> Vec<String> {
    let still_used: HashSet<String> = extract_references(current).into_iter().collect();
    distinct(&extract_references(previous))
        .into_iter()
        .filter(|r| is_under_base(r, store_base) && !still_used.contains(r))
        .collect()
}
