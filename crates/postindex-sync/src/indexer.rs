//! The sync orchestrator: keeps a search engine consistent with a content store.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::{debug, info, warn};

use postindex_core::config::{FieldSettings, IndexSettings, Settings};
use postindex_core::error::{Error, Result};
use postindex_core::traits::{ContentStore, SearchEngine};
use postindex_core::types::{
    BulkItem, BulkOp, ContentRecord, DocKey, FieldMatch, FieldSource, FieldValue, IndexValue,
    InferredSchema, RecordId,
};

use crate::catalog::{active_types, FieldCatalog};
use crate::infer::{collect_samples, TypeInferencer};
use crate::mapping::MappingBuilder;
use crate::summary::{BulkSummary, ReindexProgress, RemapSummary};
use crate::transform::{coerce, DocumentTransformer};

/// Drives a [`SearchEngine`] from a [`ContentStore`].
///
/// Single-document operations propagate engine errors. `reindex` and
/// `update_by_query` isolate failures per document and report them in a
/// [`BulkSummary`]. A remap waits for in-flight bulk writers and blocks new
/// ones until the new mapping is in place.
pub struct Indexer<S, E>
where
    S: ContentStore,
    E: SearchEngine,
{
    store: S,
    engine: E,
    index: IndexSettings,
    options: RwLock<Arc<FieldSettings>>,
    catalog: FieldCatalog,
    schema: RwLock<Option<Arc<InferredSchema>>>,
    schema_gate: RwLock<()>,
}

impl<S, E> Indexer<S, E>
where
    S: ContentStore,
    E: SearchEngine,
{
    pub fn new(store: S, engine: E, settings: &Settings) -> Self {
        Self {
            store,
            engine,
            index: settings.index.clone(),
            options: RwLock::new(Arc::new(settings.fields.clone())),
            catalog: FieldCatalog::new(settings.index.meta_cache_ttl()),
            schema: RwLock::new(None),
            schema_gate: RwLock::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Snapshot of the operator's field configuration.
    pub fn options(&self) -> Arc<FieldSettings> {
        Arc::clone(&self.options.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the field configuration. Takes effect at the next remap.
    pub fn set_options(&self, options: FieldSettings) -> Result<()> {
        Settings { fields: options.clone(), index: self.index.clone(), ..Settings::default() }.validate()?;
        *self.options.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(options);
        Ok(())
    }

    /// The mapping documents are currently written against, if known.
    pub fn schema(&self) -> Option<Arc<InferredSchema>> {
        self.schema.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn cache_schema(&self, schema: InferredSchema) {
        *self.schema.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(schema));
    }

    /// Returns the cached mapping, else the engine's, else remaps.
    ///
    /// Concurrent first writers race for the write gate; only the winner maps.
    fn ensure_schema(&self) -> Result<()> {
        if self.schema().is_some() {
            return Ok(());
        }
        let _gate = self.schema_gate.write().unwrap_or_else(PoisonError::into_inner);
        if self.schema().is_some() {
            return Ok(());
        }
        if let Some(existing) = self.engine.mapping()? {
            debug!(fields = existing.len(), "adopted mapping from engine");
            self.cache_schema(existing);
            return Ok(());
        }
        let summary = self.remap_locked()?;
        if !summary.applied {
            return Err(Error::Operation("no fields to index; mapping was not created".into()));
        }
        Ok(())
    }

    /// Holds off remaps for as long as the guard lives.
    fn write_session(&self) -> Result<(RwLockReadGuard<'_, ()>, Arc<InferredSchema>)> {
        self.ensure_schema()?;
        let gate = self.schema_gate.read().unwrap_or_else(PoisonError::into_inner);
        let schema = self
            .schema()
            .ok_or_else(|| Error::Operation("index has no mapping".into()))?;
        Ok((gate, schema))
    }

    /// Rebuilds the mapping from the current configuration and store data.
    ///
    /// Indexed documents stay searchable under the new mapping. On failure
    /// the previous mapping stays in effect. An empty catalog keeps the
    /// existing mapping and reports `applied: false`.
    pub fn remap(&self) -> Result<RemapSummary> {
        let _gate = self.schema_gate.write().unwrap_or_else(PoisonError::into_inner);
        self.remap_locked()
    }

    /// Callers hold the schema gate for writing.
    fn remap_locked(&self) -> Result<RemapSummary> {
        let options = self.options();

        let fields = self.catalog.active_fields(&self.store, &options);
        if fields.is_empty() {
            warn!("field catalog is empty; keeping the current mapping");
            return Ok(RemapSummary { fields: 0, applied: false, issues: Vec::new() });
        }
        let types = active_types(&self.store, &options)?;
        let samples = collect_samples(&self.store, &fields, &types, self.index.sample_limit)?;

        let mut issues = Vec::new();
        let mut classified = Vec::with_capacity(fields.len());
        for field in fields {
            let field_samples = samples.get(&field.name).map(Vec::as_slice).unwrap_or_default();
            let classification = TypeInferencer::classify(&field, field_samples);
            debug!(field = %field.name, field_type = classification.field_type.es_type(), samples = field_samples.len(), "classified");
            issues.extend(classification.issue);
            classified.push((field, classification.field_type));
        }

        let schema = MappingBuilder::build_schema(&classified);
        MappingBuilder::apply(&self.engine, &schema)?;
        let fields = schema.len();
        self.cache_schema(schema);
        info!(fields, issues = issues.len(), "remap complete");
        Ok(RemapSummary { fields, applied: true, issues })
    }

    /// Indexes or fully replaces the document for `record`.
    ///
    /// Fields that cannot be coerced are left out and logged.
    pub fn add_or_update(&self, record: &ContentRecord) -> Result<()> {
        let (_gate, schema) = self.write_session()?;
        let transformed = DocumentTransformer::to_document(record, &schema);
        for issue in &transformed.issues {
            warn!(key = %record.key(), error = %issue, "field left out of document");
        }
        self.engine.index_document(&transformed.document)
    }

    /// Removes the document for `key`. Missing documents are not an error.
    pub fn delete(&self, key: &DocKey) -> Result<()> {
        let _gate = self.schema_gate.read().unwrap_or_else(PoisonError::into_inner);
        self.engine.delete(key)
    }

    /// Removes every document and keeps the mapping.
    pub fn clear(&self) -> Result<()> {
        let _gate = self.schema_gate.read().unwrap_or_else(PoisonError::into_inner);
        self.engine.delete_all()?;
        info!("index cleared");
        Ok(())
    }

    pub fn reindex(&self) -> Result<BulkSummary> {
        self.reindex_with(|_| {})
    }

    /// Writes every record of every active content type in bulk batches.
    ///
    /// Records whose fields could not all be coerced are still written
    /// without those fields, and are reported as failed units.
    pub fn reindex_with<F>(&self, mut progress: F) -> Result<BulkSummary>
    where
        F: FnMut(&ReindexProgress),
    {
        let (_gate, schema) = self.write_session()?;
        let options = self.options();
        let types = active_types(&self.store, &options)?;
        let batch_size = self.index.bulk_size.max(1);
        let mut summary = BulkSummary::default();

        for content_type in &types {
            let mut batch: Vec<BulkOp> = Vec::with_capacity(batch_size);
            let mut issues: BTreeMap<DocKey, String> = BTreeMap::new();
            let mut processed = 0;
            for record in self.store.records(content_type)? {
                let record = match record {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(content_type = %content_type, error = %e, "skipping unreadable record");
                        summary.record_failure(None, e.to_string());
                        continue;
                    }
                };
                let transformed = DocumentTransformer::to_document(&record, &schema);
                if !transformed.is_clean() {
                    let reason = join_errors(&transformed.issues);
                    warn!(key = %record.key(), %reason, "record indexed with fields left out");
                    issues.insert(record.key(), reason);
                }
                batch.push(BulkOp::Index(transformed.document));
                if batch.len() >= batch_size {
                    processed += batch.len();
                    self.flush(std::mem::take(&mut batch), &mut issues, &mut summary);
                    progress(&ReindexProgress {
                        content_type: content_type.clone(),
                        processed,
                        failed: summary.failed_count(),
                    });
                }
            }
            if !batch.is_empty() {
                processed += batch.len();
                self.flush(batch, &mut issues, &mut summary);
                progress(&ReindexProgress {
                    content_type: content_type.clone(),
                    processed,
                    failed: summary.failed_count(),
                });
            }
        }
        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded_count(),
            failed = summary.failed_count(),
            "reindex complete"
        );
        Ok(summary)
    }

    fn flush(&self, ops: Vec<BulkOp>, issues: &mut BTreeMap<DocKey, String>, summary: &mut BulkSummary) {
        debug!(size = ops.len(), "flushing bulk batch");
        for item in self.send_bulk(ops) {
            let issue = issues.remove(&item.key);
            match (item.result, issue) {
                (Ok(()), None) => summary.record_success(item.key),
                (Ok(()), Some(reason)) => summary.record_failure(Some(item.key), reason),
                (Err(e), _) => {
                    warn!(key = %item.key, error = %e, "bulk item failed");
                    summary.record_failure(Some(item.key), e.to_string());
                }
            }
        }
    }

    /// A failed request fails every unit in it.
    fn send_bulk(&self, ops: Vec<BulkOp>) -> Vec<BulkItem> {
        let keys: Vec<DocKey> = ops.iter().map(|op| op.key().clone()).collect();
        match self.engine.bulk(ops) {
            Ok(items) => items,
            Err(e) => {
                warn!(size = keys.len(), error = %e, "bulk request failed");
                keys.into_iter().map(|key| BulkItem { key, result: Err(e.clone()) }).collect()
            }
        }
    }

    /// Rewrites `new_values` on every document matching all of `criteria`,
    /// leaving their other fields untouched.
    ///
    /// At least one criterion is required. Unknown fields, taxonomy fields and
    /// values that do not fit the mapping are rejected before anything is
    /// written. Documents that start matching after the
    /// search may be missed.
    pub fn update_by_query(
        &self,
        criteria: &BTreeMap<String, FieldValue>,
        new_values: &BTreeMap<String, FieldValue>,
    ) -> Result<BulkSummary> {
        let (_gate, schema) = self.write_session()?;

        if criteria.is_empty() {
            return Err(Error::Configuration {
                field: String::new(),
                reason: "at least one match criterion is required".into(),
            });
        }
        let mut predicates = Vec::with_capacity(criteria.len());
        for (field, value) in criteria {
            let mut values = coerce_for(&schema, field, value)?;
            if values.len() != 1 {
                return Err(Error::Configuration {
                    field: field.clone(),
                    reason: "match criteria need exactly one value".into(),
                });
            }
            predicates.push(FieldMatch { field: field.clone(), value: values.remove(0) });
        }
        let mut updates: BTreeMap<String, Vec<IndexValue>> = BTreeMap::new();
        for (field, value) in new_values {
            if schema.get(field).is_some_and(|f| f.source == FieldSource::Taxonomy) {
                return Err(Error::Configuration {
                    field: field.clone(),
                    reason: "taxonomy fields follow the record's terms; save the record instead".into(),
                });
            }
            let values = coerce_for(&schema, field, value)?;
            if values.is_empty() {
                return Err(Error::Configuration { field: field.clone(), reason: "new value is empty".into() });
            }
            updates.insert(field.clone(), values);
        }

        let matched = self.engine.search(&predicates)?;
        debug!(matched = matched.len(), "update by query matched");
        let mut summary = BulkSummary::default();
        for chunk in matched.chunks(self.index.bulk_size.max(1)) {
            let ops = chunk
                .iter()
                .map(|key| BulkOp::Update { key: key.clone(), fields: updates.clone() })
                .collect();
            self.flush(ops, &mut BTreeMap::new(), &mut summary);
        }
        info!(
            matched = matched.len(),
            updated = summary.succeeded_count(),
            failed = summary.failed_count(),
            "update by query complete"
        );
        Ok(summary)
    }

    /// Store notification: a record was created or changed.
    ///
    /// Records that are gone or whose type is not indexed are removed instead.
    pub fn on_record_saved(&self, content_type: &str, id: RecordId) -> Result<()> {
        let key = DocKey::new(content_type, id);
        let indexed = active_types(&self.store, &self.options())?.iter().any(|t| t == content_type);
        match self.store.record(content_type, id)? {
            Some(record) if indexed => self.add_or_update(&record),
            _ => self.delete(&key),
        }
    }

    /// Store notification: a record was deleted.
    pub fn on_record_deleted(&self, key: &DocKey) -> Result<()> {
        self.delete(key)
    }
}

fn coerce_for(schema: &InferredSchema, field: &str, value: &FieldValue) -> Result<Vec<IndexValue>> {
    let field_type = schema.field_type(field).ok_or_else(|| Error::Configuration {
        field: field.to_string(),
        reason: "field is not in the current mapping".into(),
    })?;
    coerce(field_type, value).map_err(|reason| Error::Configuration { field: field.to_string(), reason })
}

fn join_errors(errors: &[Error]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
