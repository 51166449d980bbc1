//! postindex-text
//!
//! tantivy-backed search engine for the sync orchestrator. See `index` for the
//! engine and its on-disk generations, `tantivy_utils` for schema translation.
pub mod tantivy_utils;
pub mod index;

pub use index::TantivyEngine;
