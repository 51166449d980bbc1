use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{TimeZone, Utc};
use tantivy::collector::DocSetCollector;
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::tokenizer::TokenStream;
use tantivy::{DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};
use tracing::{debug, info, warn};

use postindex_core::error::{Error, Result};
use postindex_core::traits::SearchEngine;
use postindex_core::types::{
	BulkItem, BulkOp, DocKey, FieldMatch, FieldType, IndexDocument, IndexValue, InferredSchema,
	SortOrder,
};

use crate::tantivy_utils::{build_schema, register_tokenizer, resolve_fields, SchemaFields};

/// Pointer file naming the active generation directory.
pub const ACTIVE_FILE: &str = "ACTIVE";
/// Mapping persisted inside each generation directory.
pub const MAPPING_FILE: &str = "mapping.json";
const GENERATION_PREFIX: &str = "gen-";

/// One index built for one mapping. A changed mapping gets a new generation.
struct Generation {
	name: Option<String>,
	index: Index,
	reader: IndexReader,
	writer: Mutex<IndexWriter>,
	fields: SchemaFields,
	mapping: InferredSchema,
}

impl Generation {
	fn create(mapping: &InferredSchema, dir: Option<(&Path, String)>, heap: usize) -> Result<Self> {
		let schema = build_schema(mapping)?;
		let (index, name) = match dir {
			Some((path, name)) => {
				fs::create_dir_all(path).map_err(Error::transport)?;
				let index = Index::create_in_dir(path, schema.clone()).map_err(Error::transport)?;
				let json = serde_json::to_string_pretty(mapping).map_err(Error::transport)?;
				fs::write(path.join(MAPPING_FILE), json).map_err(Error::transport)?;
				(index, Some(name))
			}
			None => (Index::create_in_ram(schema.clone()), None),
		};
		Self::from_index(index, name, mapping.clone(), heap)
	}

	fn open(root: &Path, name: &str, heap: usize) -> Result<Self> {
		let path = root.join(name);
		let raw = fs::read_to_string(path.join(MAPPING_FILE)).map_err(Error::transport)?;
		let mapping: InferredSchema = serde_json::from_str(&raw).map_err(Error::transport)?;
		let index = Index::open_in_dir(&path).map_err(Error::transport)?;
		Self::from_index(index, Some(name.to_string()), mapping, heap)
	}

	fn from_index(index: Index, name: Option<String>, mapping: InferredSchema, heap: usize) -> Result<Self> {
		register_tokenizer(&index);
		let fields = resolve_fields(&index.schema(), &mapping)?;
		let writer: IndexWriter = index.writer_with_num_threads(1, heap).map_err(Error::transport)?;
		let reader: IndexReader = index
			.reader_builder()
			.reload_policy(ReloadPolicy::Manual)
			.try_into()
			.map_err(Error::transport)?;
		Ok(Self { name, index, reader, writer: Mutex::new(writer), fields, mapping })
	}

	fn writer(&self) -> MutexGuard<'_, IndexWriter> {
		self.writer.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn key_term(&self, key: &DocKey) -> Term {
		Term::from_field_text(self.fields.key, &key.to_string())
	}

	/// Commits pending operations and makes them visible to searchers.
	fn commit(&self, writer: &mut IndexWriter) -> Result<()> {
		writer.commit().map_err(Error::transport)?;
		self.reader.reload().map_err(Error::transport)
	}

	fn to_tantivy(&self, doc: &IndexDocument) -> Result<TantivyDocument> {
		let mut out = TantivyDocument::default();
		out.add_text(self.fields.key, doc.key.to_string());
		out.add_text(self.fields.content_type, &doc.key.content_type);
		out.add_text(self.fields.id, doc.key.id.to_string());
		for (name, values) in &doc.fields {
			let (field, field_type) = self.fields.mapped(name)?;
			for value in values {
				match (field_type, value) {
					(FieldType::Long, IndexValue::Long(v)) => out.add_i64(field, *v),
					(FieldType::Double, IndexValue::Double(v)) => out.add_f64(field, *v),
					#[allow(clippy::cast_precision_loss)]
					(FieldType::Double, IndexValue::Long(v)) => out.add_f64(field, *v as f64),
					(FieldType::Date { .. }, IndexValue::Date(d)) => {
						out.add_date(field, tantivy::DateTime::from_timestamp_secs(d.timestamp()));
					}
					(FieldType::Keyword | FieldType::Text, IndexValue::Keyword(s) | IndexValue::Text(s)) => {
						out.add_text(field, s);
					}
					(expected, got) => {
						return Err(Error::Transport(format!(
							"field '{name}' is mapped as {} but got '{got}'",
							expected.es_type()
						)));
					}
				}
			}
		}
		Ok(out)
	}

	fn from_tantivy(&self, doc: &TantivyDocument) -> Result<IndexDocument> {
		let key = doc
			.get_first(self.fields.key)
			.and_then(|v| v.as_str())
			.ok_or_else(|| Error::Transport("stored document has no key".into()))?;
		let mut out = IndexDocument::new(DocKey::parse(key)?);
		for (name, (field, field_type)) in &self.fields.mapped {
			let values: Vec<IndexValue> = doc
				.get_all(*field)
				.filter_map(|v| stored_value(*field_type, v))
				.collect();
			if !values.is_empty() {
				out.fields.insert(name.clone(), values);
			}
		}
		Ok(out)
	}

	fn searcher(&self) -> Searcher {
		self.reader.searcher()
	}

	fn matching(searcher: &Searcher, query: &dyn Query) -> Result<Vec<DocAddress>> {
		let hits = searcher.search(query, &DocSetCollector).map_err(Error::transport)?;
		let mut addresses: Vec<DocAddress> = hits.into_iter().collect();
		addresses.sort();
		Ok(addresses)
	}

	fn load(&self, searcher: &Searcher, address: DocAddress) -> Result<IndexDocument> {
		let doc: TantivyDocument = searcher.doc(address).map_err(Error::transport)?;
		self.from_tantivy(&doc)
	}

	fn get(&self, key: &DocKey) -> Result<Option<IndexDocument>> {
		let query = TermQuery::new(self.key_term(key), IndexRecordOption::Basic);
		let searcher = self.searcher();
		match Self::matching(&searcher, &query)?.first() {
			Some(address) => self.load(&searcher, *address).map(Some),
			None => Ok(None),
		}
	}

	fn term_clauses(&self, criterion: &FieldMatch) -> Result<Vec<(Occur, Box<dyn Query>)>> {
		let (field, field_type) = self.fields.mapped(&criterion.field)?;
		let terms = match (field_type, &criterion.value) {
			(FieldType::Long, IndexValue::Long(v)) => vec![Term::from_field_i64(field, *v)],
			(FieldType::Double, IndexValue::Double(v)) => vec![Term::from_field_f64(field, *v)],
			(FieldType::Date { .. }, IndexValue::Date(d)) => {
				vec![Term::from_field_date(field, tantivy::DateTime::from_timestamp_secs(d.timestamp()))]
			}
			(FieldType::Keyword, IndexValue::Keyword(s) | IndexValue::Text(s)) => {
				vec![Term::from_field_text(field, s)]
			}
			(FieldType::Text, IndexValue::Keyword(s) | IndexValue::Text(s)) => self.analyzed_terms(field, s)?,
			(expected, got) => {
				return Err(Error::Transport(format!(
					"criterion on '{}' expects {} but got '{got}'",
					criterion.field,
					expected.es_type()
				)));
			}
		};
		Ok(terms
			.into_iter()
			.map(|term| {
				let query: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::Basic));
				(Occur::Must, query)
			})
			.collect())
	}

	fn analyzed_terms(&self, field: Field, text: &str) -> Result<Vec<Term>> {
		let mut analyzer = self.index.tokenizer_for_field(field).map_err(Error::transport)?;
		let mut stream = analyzer.token_stream(text);
		let mut terms = Vec::new();
		while stream.advance() {
			terms.push(Term::from_field_text(field, &stream.token().text));
		}
		Ok(terms)
	}

	/// Documents matching every criterion. Text criteria are narrowed by
	/// their analyzed terms, then compared exactly against stored values.
	fn search(&self, criteria: &[FieldMatch]) -> Result<Vec<DocKey>> {
		let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, Box::new(AllQuery))];
		for criterion in criteria {
			clauses.extend(self.term_clauses(criterion)?);
		}
		let query = BooleanQuery::new(clauses);
		let searcher = self.searcher();
		let mut keys = Vec::new();
		for address in Self::matching(&searcher, &query)? {
			let doc = self.load(&searcher, address)?;
			let exact = criteria.iter().all(|c| {
				doc.fields.get(&c.field).is_some_and(|values| values.iter().any(|v| same_value(v, &c.value)))
			});
			if exact {
				keys.push(doc.key);
			}
		}
		keys.sort();
		Ok(keys)
	}

	fn sorted_keys(&self, field: &str, order: SortOrder) -> Result<Vec<DocKey>> {
		self.fields.mapped(field)?;
		let searcher = self.searcher();
		let mut present = Vec::new();
		let mut missing = Vec::new();
		for address in Self::matching(&searcher, &AllQuery)? {
			let doc = self.load(&searcher, address)?;
			match doc.first(field).cloned() {
				Some(value) => present.push((value, doc.key)),
				None => missing.push(doc.key),
			}
		}
		present.sort_by(|(a, ka), (b, kb)| {
			let by_value = compare_values(a, b);
			let by_value = if order == SortOrder::Desc { by_value.reverse() } else { by_value };
			by_value.then_with(|| ka.cmp(kb))
		});
		missing.sort();
		Ok(present.into_iter().map(|(_, key)| key).chain(missing).collect())
	}

	/// Applies `ops` in one writer session. Items that cannot be converted
	/// fail on their own; a writer failure or failed commit rolls the whole
	/// session back and fails every item.
	fn bulk(&self, ops: Vec<BulkOp>) -> Result<Vec<BulkItem>> {
		let keys: Vec<DocKey> = ops.iter().map(|op| op.key().clone()).collect();
		let searcher = self.searcher();
		let mut writer = self.writer();
		let mut pending: HashMap<DocKey, Option<IndexDocument>> = HashMap::new();
		let mut results = Vec::with_capacity(ops.len());
		let mut broken = None;
		for op in ops {
			match self.apply_op(&mut writer, &searcher, &mut pending, op) {
				Ok(result) => results.push(result),
				Err(e) => {
					broken = Some(e);
					break;
				}
			}
		}
		let outcome = match broken {
			Some(e) => Err(e),
			None => self.commit(&mut writer),
		};
		if let Err(e) = outcome {
			warn!(error = %e, "bulk session failed; rolling back");
			if let Err(rollback) = writer.rollback() {
				warn!(error = %rollback, "rollback after failed bulk session failed");
			}
			return Ok(keys.into_iter().map(|key| BulkItem { key, result: Err(e.clone()) }).collect());
		}
		Ok(keys
			.into_iter()
			.zip(results)
			.map(|(key, result)| {
				if let Err(e) = &result {
					debug!(key = %key, error = %e, "bulk item failed");
				}
				BulkItem { key, result }
			})
			.collect())
	}

	/// Stages one op. The outer error means the writer itself failed; the
	/// inner one is the item's own result, reported before anything is staged.
	fn apply_op(
		&self,
		writer: &mut IndexWriter,
		searcher: &Searcher,
		pending: &mut HashMap<DocKey, Option<IndexDocument>>,
		op: BulkOp,
	) -> Result<Result<()>> {
		let doc = match op {
			BulkOp::Delete(key) => {
				writer.delete_term(self.key_term(&key));
				pending.insert(key, None);
				return Ok(Ok(()));
			}
			BulkOp::Index(doc) => doc,
			BulkOp::Update { key, fields } => match self.updated(searcher, pending, &key, fields) {
				Ok(doc) => doc,
				Err(e) => return Ok(Err(e)),
			},
		};
		let converted = match self.to_tantivy(&doc) {
			Ok(converted) => converted,
			Err(e) => return Ok(Err(e)),
		};
		self.stage(writer, &doc.key, converted)?;
		pending.insert(doc.key.clone(), Some(doc));
		Ok(Ok(()))
	}

	/// The current document for `key` with `fields` overwritten, seeing ops
	/// staged earlier in the same session.
	fn updated(
		&self,
		searcher: &Searcher,
		pending: &HashMap<DocKey, Option<IndexDocument>>,
		key: &DocKey,
		fields: BTreeMap<String, Vec<IndexValue>>,
	) -> Result<IndexDocument> {
		let current = match pending.get(key) {
			Some(doc) => doc.clone(),
			None => {
				let query = TermQuery::new(self.key_term(key), IndexRecordOption::Basic);
				match Self::matching(searcher, &query)?.first() {
					Some(address) => Some(self.load(searcher, *address)?),
					None => None,
				}
			}
		};
		let mut doc = current.ok_or_else(|| Error::NotFound(key.to_string()))?;
		doc.fields.extend(fields);
		Ok(doc)
	}

	/// Replaces whatever is stored under `key` with an already converted document.
	fn stage(&self, writer: &mut IndexWriter, key: &DocKey, converted: TantivyDocument) -> Result<()> {
		writer.delete_term(self.key_term(key));
		writer.add_document(converted).map_err(Error::transport)?;
		Ok(())
	}

	/// Copies every stored document of `from` into this generation, retyping
	/// values to this mapping. Fields that are no longer mapped, or whose
	/// values no longer fit their type, are left out.
	fn carry_over(&self, from: &Generation) -> Result<usize> {
		let searcher = from.searcher();
		let mut writer = self.writer();
		let mut carried = 0;
		for address in Self::matching(&searcher, &AllQuery)? {
			let old = from.load(&searcher, address)?;
			let mut doc = IndexDocument::new(old.key);
			for (name, values) in old.fields {
				let Some(mapped) = self.mapping.get(&name) else {
					continue;
				};
				let fitted: Option<Vec<IndexValue>> =
					values.iter().map(|v| retyped(v, mapped.field_type)).collect();
				match fitted {
					Some(values) => {
						doc.fields.insert(name, values);
					}
					None => debug!(key = %doc.key, field = %name, "value no longer fits its mapping; dropped"),
				}
			}
			let converted = self.to_tantivy(&doc)?;
			writer.add_document(converted).map_err(Error::transport)?;
			carried += 1;
		}
		self.commit(&mut writer)?;
		Ok(carried)
	}
}

/// `value` as `field_type`, if it can be represented without loss.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn retyped(value: &IndexValue, field_type: FieldType) -> Option<IndexValue> {
	let whole = |v: f64| (v.is_finite() && v.fract() == 0.0).then_some(v as i64);
	match (field_type, value) {
		(FieldType::Long, IndexValue::Long(v)) => Some(IndexValue::Long(*v)),
		(FieldType::Long, IndexValue::Double(v)) => whole(*v).map(IndexValue::Long),
		(FieldType::Double, IndexValue::Double(v)) => Some(IndexValue::Double(*v)),
		(FieldType::Double, IndexValue::Long(v)) => Some(IndexValue::Double(*v as f64)),
		(FieldType::Date { .. }, IndexValue::Date(d)) => Some(IndexValue::Date(*d)),
		(FieldType::Keyword, v) => Some(IndexValue::Keyword(v.to_string())),
		(FieldType::Text, v) => Some(IndexValue::Text(v.to_string())),
		(field_type, IndexValue::Keyword(s) | IndexValue::Text(s)) => {
			let s = s.trim();
			match field_type {
				FieldType::Long => s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(whole)).map(IndexValue::Long),
				FieldType::Double => s.parse::<f64>().ok().filter(|v| v.is_finite()).map(IndexValue::Double),
				FieldType::Date { format } => format
					.parse(s)
					.and_then(|d| Utc.timestamp_opt(d.timestamp(), 0).single())
					.map(IndexValue::Date),
				FieldType::Keyword | FieldType::Text => None,
			}
		}
		_ => None,
	}
}

fn stored_value<'a>(field_type: FieldType, value: impl Value<'a>) -> Option<IndexValue> {
	match field_type {
		FieldType::Long => value.as_i64().map(IndexValue::Long),
		FieldType::Double => value.as_f64().map(IndexValue::Double),
		FieldType::Date { .. } => value
			.as_datetime()
			.and_then(|d| Utc.timestamp_opt(d.into_timestamp_secs(), 0).single())
			.map(IndexValue::Date),
		FieldType::Keyword => value.as_str().map(|s| IndexValue::Keyword(s.to_string())),
		FieldType::Text => value.as_str().map(|s| IndexValue::Text(s.to_string())),
	}
}

fn same_value(stored: &IndexValue, wanted: &IndexValue) -> bool {
	match (stored.as_str(), wanted.as_str()) {
		(Some(a), Some(b)) => a == b,
		_ => compare_values(stored, wanted) == Ordering::Equal,
	}
}

fn compare_values(a: &IndexValue, b: &IndexValue) -> Ordering {
	match (a, b) {
		(IndexValue::Long(x), IndexValue::Long(y)) => x.cmp(y),
		(IndexValue::Double(x), IndexValue::Double(y)) => x.total_cmp(y),
		(IndexValue::Date(x), IndexValue::Date(y)) => x.cmp(y),
		_ => a.to_string().cmp(&b.to_string()),
	}
}

/// tantivy-backed [`SearchEngine`].
///
/// Each applied mapping lives in its own generation. On disk, generations are
/// `gen-N` directories under the root and the `ACTIVE` file names the one in
/// use; the pointer only moves once the new generation is fully created.
pub struct TantivyEngine {
	root: Option<PathBuf>,
	writer_heap_bytes: usize,
	active: RwLock<Option<Arc<Generation>>>,
}

impl TantivyEngine {
	pub fn in_memory(writer_heap_bytes: usize) -> Self {
		Self { root: None, writer_heap_bytes, active: RwLock::new(None) }
	}

	/// Opens (or initializes) an on-disk engine rooted at `root`.
	pub fn open(root: &Path, writer_heap_bytes: usize) -> Result<Self> {
		fs::create_dir_all(root).map_err(Error::transport)?;
		let pointer = root.join(ACTIVE_FILE);
		let active = if pointer.is_file() {
			let name = fs::read_to_string(&pointer).map_err(Error::transport)?;
			let generation = Generation::open(root, name.trim(), writer_heap_bytes)?;
			info!(root = %root.display(), generation = name.trim(), "opened index");
			Some(Arc::new(generation))
		} else {
			None
		};
		Ok(Self { root: Some(root.to_path_buf()), writer_heap_bytes, active: RwLock::new(active) })
	}

	pub fn root(&self) -> Option<&Path> {
		self.root.as_deref()
	}

	/// Name of the active on-disk generation, if any.
	pub fn active_generation(&self) -> Option<String> {
		self.current().and_then(|g| g.name.clone())
	}

	fn current(&self) -> Option<Arc<Generation>> {
		self.active.read().unwrap_or_else(PoisonError::into_inner).clone()
	}

	fn require(&self) -> Result<Arc<Generation>> {
		self.current().ok_or_else(|| Error::Transport("index has no mapping".into()))
	}

	fn next_generation_name(root: &Path) -> Result<String> {
		let mut highest = 0u64;
		for entry in fs::read_dir(root).map_err(Error::transport)? {
			let entry = entry.map_err(Error::transport)?;
			let name = entry.file_name();
			let number = name
				.to_str()
				.and_then(|n| n.strip_prefix(GENERATION_PREFIX))
				.and_then(|n| n.parse::<u64>().ok());
			if let Some(number) = number {
				highest = highest.max(number);
			}
		}
		Ok(format!("{GENERATION_PREFIX}{}", highest + 1))
	}

	/// Creates the generation for `mapping`, fills it from `previous` and, on
	/// disk, moves the `ACTIVE` pointer to it. Partial work is removed on failure.
	fn build_generation(&self, mapping: &InferredSchema, previous: Option<&Generation>) -> Result<Generation> {
		let fill = |generation: Generation| -> Result<Generation> {
			if let Some(previous) = previous {
				let carried = generation.carry_over(previous)?;
				info!(documents = carried, "documents carried into new generation");
			}
			Ok(generation)
		};
		let Some(root) = &self.root else {
			return Generation::create(mapping, None, self.writer_heap_bytes).and_then(fill);
		};
		let name = Self::next_generation_name(root)?;
		let path = root.join(&name);
		let created = Generation::create(mapping, Some((path.as_path(), name.clone())), self.writer_heap_bytes)
			.and_then(fill)
			.and_then(|generation| flip_active(root, &name).map(|()| generation));
		if created.is_err() {
			if let Err(e) = fs::remove_dir_all(&path) {
				debug!(path = %path.display(), error = %e, "no partial generation to clean up");
			}
		}
		created
	}
}

/// Atomically points `ACTIVE` at `name`.
fn flip_active(root: &Path, name: &str) -> Result<()> {
	let tmp = root.join(format!("{ACTIVE_FILE}.tmp"));
	fs::write(&tmp, name).map_err(Error::transport)?;
	fs::rename(&tmp, root.join(ACTIVE_FILE)).map_err(Error::transport)
}

impl SearchEngine for TantivyEngine {
	/// Applying the active mapping again is a no-op. Writes made to the old
	/// generation while the new one is filled are not carried over.
	fn put_mapping(&self, schema: &InferredSchema) -> Result<()> {
		let current = self.current();
		if current.as_ref().is_some_and(|g| g.mapping == *schema) {
			debug!(fields = schema.len(), "mapping unchanged");
			return Ok(());
		}
		let generation = self.build_generation(schema, current.as_deref()).map_err(|e| match e {
			e @ Error::MappingApply(_) => e,
			other => Error::MappingApply(other.to_string()),
		})?;
		let generation = Arc::new(generation);
		let previous = self
			.active
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.replace(Arc::clone(&generation));
		info!(fields = schema.len(), generation = ?generation.name, "mapping applied");

		let retired = previous.and_then(|g| g.name.clone());
		if let (Some(root), Some(old)) = (&self.root, retired) {
			if let Err(e) = fs::remove_dir_all(root.join(&old)) {
				warn!(generation = %old, error = %e, "failed to remove retired generation");
			}
		}
		Ok(())
	}

	fn mapping(&self) -> Result<Option<InferredSchema>> {
		Ok(self.current().map(|g| g.mapping.clone()))
	}

	fn index_document(&self, doc: &IndexDocument) -> Result<()> {
		let generation = self.require()?;
		let converted = generation.to_tantivy(doc)?;
		let mut writer = generation.writer();
		if let Err(e) = generation.stage(&mut writer, &doc.key, converted) {
			if let Err(rollback) = writer.rollback() {
				warn!(error = %rollback, "rollback failed");
			}
			return Err(e);
		}
		generation.commit(&mut writer)
	}

	fn delete(&self, key: &DocKey) -> Result<()> {
		let Some(generation) = self.current() else {
			return Ok(());
		};
		let mut writer = generation.writer();
		writer.delete_term(generation.key_term(key));
		generation.commit(&mut writer)
	}

	fn delete_all(&self) -> Result<()> {
		let Some(generation) = self.current() else {
			return Ok(());
		};
		let mut writer = generation.writer();
		writer.delete_all_documents().map_err(Error::transport)?;
		generation.commit(&mut writer)
	}

	fn bulk(&self, ops: Vec<BulkOp>) -> Result<Vec<BulkItem>> {
		self.require()?.bulk(ops)
	}

	fn search(&self, criteria: &[FieldMatch]) -> Result<Vec<DocKey>> {
		match self.current() {
			Some(generation) => generation.search(criteria),
			None => Ok(Vec::new()),
		}
	}

	fn get(&self, key: &DocKey) -> Result<Option<IndexDocument>> {
		match self.current() {
			Some(generation) => generation.get(key),
			None => Ok(None),
		}
	}

	fn count(&self) -> Result<u64> {
		Ok(self.current().map_or(0, |g| g.searcher().num_docs()))
	}

	fn sorted_keys(&self, field: &str, order: SortOrder) -> Result<Vec<DocKey>> {
		match self.current() {
			Some(generation) => generation.sorted_keys(field, order),
			None => Ok(Vec::new()),
		}
	}
}

impl std::fmt::Debug for TantivyEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TantivyEngine")
			.field("root", &self.root)
			.field("generation", &self.active_generation())
			.finish_non_exhaustive()
	}
}
