//! Pipeline stages for document publishing.
//!
//! Each submodule implements exactly one step. Only [`upload`] performs I/O;
//! everything else is a pure function over borrowed trees, so the recursive
//! stages never suspend.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ upload (fan-out/join) ──▶ rewrite ──▶ html
//! (refs)      (store / fetch)          (new tree)   (markup)
//! ```
//!
//! 1. [`extract`]   — collect `image.src` references in render order
//! 2. [`reference`] — classify references; decode data URIs
//! 3. [`upload`]    — make one reference durable, return its canonical URL
//! 4. [`rewrite`]   — build the canonical tree from the resolved mapping
//! 5. [`html`]      — render the canonical tree to a markup fragment
//!
//! [`cleanup`] is not part of a publish run; it supports replace flows.

pub mod cleanup;
pub mod extract;
pub mod html;
pub mod reference;
pub mod rewrite;
pub mod upload;
