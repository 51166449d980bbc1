use postindex_core::error::Error;
use postindex_core::types::DocKey;

/// A unit of a bulk operation that was not applied (or applied with issues).
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFailure {
    /// `None` when the store failed before the record could be identified.
    pub key: Option<DocKey>,
    pub reason: String,
}

impl UnitFailure {
    pub fn new(key: Option<DocKey>, reason: impl Into<String>) -> Self {
        Self { key, reason: reason.into() }
    }
}

/// Outcome of `reindex` and `update_by_query`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkSummary {
    pub attempted: usize,
    pub succeeded: Vec<DocKey>,
    pub failed: Vec<UnitFailure>,
}

impl BulkSummary {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Keys of failed units that could be identified.
    pub fn failed_keys(&self) -> Vec<DocKey> {
        self.failed.iter().filter_map(|f| f.key.clone()).collect()
    }

    pub(crate) fn record_success(&mut self, key: DocKey) {
        self.attempted += 1;
        self.succeeded.push(key);
    }

    pub(crate) fn record_failure(&mut self, key: Option<DocKey>, reason: impl Into<String>) {
        self.attempted += 1;
        self.failed.push(UnitFailure::new(key, reason));
    }
}

/// Outcome of a remap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemapSummary {
    /// Mapped fields, companion fields included.
    pub fields: usize,
    /// False when the catalog was empty and the existing mapping was kept.
    pub applied: bool,
    /// Configuration errors; each affected field fell back to `text`.
    pub issues: Vec<Error>,
}

/// Reported after every flushed reindex batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ReindexProgress {
    pub content_type: String,
    pub processed: usize,
    pub failed: usize,
}
