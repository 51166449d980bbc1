//! Domain types shared by the store, the engine and the orchestrator.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::dates::DateFormat;
use crate::error::{Error, Result};

pub type RecordId = u64;

/// How the operator asked a field to be indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Default,
    Numeric,
    Date,
    NotAnalyzed,
}

/// Where a field's value lives on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Attribute,
    Meta,
    Taxonomy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    pub kind: FieldKind,
    pub source: FieldSource,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>, kind: FieldKind, source: FieldSource) -> Self {
        Self { name: name.into(), kind, source }
    }
}

/// A raw value as held by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<FieldValue>),
    Date(DateTime<Utc>),
}

impl FieldValue {
    /// Flattens the value into the string samples used for type inference.
    pub fn sample_strings(&self) -> Vec<String> {
        match self {
            Self::Int(v) => vec![v.to_string()],
            Self::Float(v) => vec![v.to_string()],
            Self::Str(s) => vec![s.clone()],
            Self::Date(d) => vec![d.to_rfc3339_opts(SecondsFormat::Secs, true)],
            Self::List(items) => items.iter().flat_map(Self::sample_strings).collect(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyTerm {
    pub slug: String,
    pub name: String,
}

impl TaxonomyTerm {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self { slug: slug.into(), name: name.into() }
    }
}

/// Read-only snapshot of a record owned by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: RecordId,
    pub content_type: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub meta: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub terms: BTreeMap<String, Vec<TaxonomyTerm>>,
}

impl ContentRecord {
    pub fn new(content_type: impl Into<String>, id: RecordId) -> Self {
        Self {
            id,
            content_type: content_type.into(),
            attributes: BTreeMap::new(),
            meta: BTreeMap::new(),
            terms: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_meta(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.meta.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_terms(mut self, taxonomy: impl Into<String>, terms: Vec<TaxonomyTerm>) -> Self {
        self.terms.insert(taxonomy.into(), terms);
        self
    }

    pub fn key(&self) -> DocKey {
        DocKey::new(self.content_type.clone(), self.id)
    }

    /// Attribute first, then metadata.
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.attributes.get(name).or_else(|| self.meta.get(name))
    }
}

/// Identity of a document in the index: `(content type, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocKey {
    pub content_type: String,
    pub id: RecordId,
}

impl DocKey {
    pub fn new(content_type: impl Into<String>, id: RecordId) -> Self {
        Self { content_type: content_type.into(), id }
    }

    /// Parses the `type:id` rendering produced by `Display`.
    pub fn parse(s: &str) -> Result<Self> {
        let (content_type, id) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::Operation(format!("malformed document key '{s}'")))?;
        let id = id
            .parse::<RecordId>()
            .map_err(|e| Error::Operation(format!("malformed document key '{s}': {e}")))?;
        Ok(Self::new(content_type, id))
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.content_type, self.id)
    }
}

/// Concrete search-engine type of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Long,
    Double,
    Date { format: DateFormat },
    Keyword,
    Text,
}

impl FieldType {
    /// Name of the type in an Elasticsearch-style mapping document.
    pub fn es_type(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Double => "double",
            Self::Date { .. } => "date",
            Self::Keyword => "keyword",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedField {
    pub name: String,
    pub source: FieldSource,
    pub field_type: FieldType,
}

/// The full set of mapped fields; pushed to the engine as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredSchema {
    fields: BTreeMap<String, MappedField>,
}

impl InferredSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, replacing any previous mapping with the same name.
    pub fn insert(&mut self, field: MappedField) {
        self.fields.insert(field.name.clone(), field);
    }

    pub fn get(&self, name: &str) -> Option<&MappedField> {
        self.fields.get(name)
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).map(|f| f.field_type)
    }

    pub fn fields(&self) -> impl Iterator<Item = &MappedField> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A typed value ready to be written to the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndexValue {
    Long(i64),
    Double(f64),
    Date(DateTime<Utc>),
    Keyword(String),
    Text(String),
}

impl IndexValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Keyword(s) | Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Date(d) => write!(f, "{}", d.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::Keyword(s) | Self::Text(s) => f.write_str(s),
        }
    }
}

/// A document as sent to the engine. Multi-valued fields keep their order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDocument {
    pub key: DocKey,
    pub fields: BTreeMap<String, Vec<IndexValue>>,
}

impl IndexDocument {
    pub fn new(key: DocKey) -> Self {
        Self { key, fields: BTreeMap::new() }
    }

    pub fn first(&self, field: &str) -> Option<&IndexValue> {
        self.fields.get(field).and_then(|values| values.first())
    }
}

/// Equality predicate on one field, already coerced to the mapped type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    pub field: String,
    pub value: IndexValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One unit of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOp {
    /// Index-or-replace the whole document.
    Index(IndexDocument),
    Delete(DocKey),
    /// Replace the listed fields of an existing document, keeping the others.
    Update { key: DocKey, fields: BTreeMap<String, Vec<IndexValue>> },
}

impl BulkOp {
    pub fn key(&self) -> &DocKey {
        match self {
            Self::Index(doc) => &doc.key,
            Self::Delete(key) | Self::Update { key, .. } => key,
        }
    }
}

/// Per-unit outcome of a bulk request, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItem {
    pub key: DocKey,
    pub result: Result<()>,
}
