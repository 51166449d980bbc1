use crate::error::Result;
use crate::types::{
    BulkItem, BulkOp, ContentRecord, DocKey, FieldMatch, IndexDocument, InferredSchema, RecordId,
    SortOrder,
};

/// Lazily produced records of one content type.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<ContentRecord>> + 'a>;

/// The source of truth the index is synchronized from.
pub trait ContentStore: Send + Sync {
    /// Types that are not search-excluded and not the attachment type.
    fn indexable_types(&self) -> Result<Vec<String>>;
    /// Taxonomies registered for any of `types`, without duplicates.
    fn taxonomies(&self, types: &[String]) -> Result<Vec<String>>;
    fn records(&self, content_type: &str) -> Result<RecordIter<'_>>;
    fn record(&self, content_type: &str, id: RecordId) -> Result<Option<ContentRecord>>;
    /// Every metadata key observed on any record. Expensive; callers cache it.
    fn distinct_meta_keys(&self) -> Result<Vec<String>>;
}

/// The search engine client surface the indexer drives.
pub trait SearchEngine: Send + Sync {
    /// Replaces the index mapping as a whole, or leaves the old one in place.
    fn put_mapping(&self, schema: &InferredSchema) -> Result<()>;
    fn mapping(&self) -> Result<Option<InferredSchema>>;
    /// Index-or-replace a single document.
    fn index_document(&self, doc: &IndexDocument) -> Result<()>;
    /// Deleting a missing document succeeds.
    fn delete(&self, key: &DocKey) -> Result<()>;
    fn delete_all(&self) -> Result<()>;
    /// Applies every op independently; one item per op, in order.
    fn bulk(&self, ops: Vec<BulkOp>) -> Result<Vec<BulkItem>>;
    /// Keys of documents matching every predicate.
    fn search(&self, criteria: &[FieldMatch]) -> Result<Vec<DocKey>>;
    fn get(&self, key: &DocKey) -> Result<Option<IndexDocument>>;
    fn count(&self) -> Result<u64>;
    /// All document keys ordered by the first value of `field`; missing last.
    fn sorted_keys(&self, field: &str, order: SortOrder) -> Result<Vec<DocKey>>;
}
