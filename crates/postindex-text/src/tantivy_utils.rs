//! Schema translation and tokenizer registration shared by every index
//! generation.
use std::collections::BTreeMap;

use tantivy::schema::{
	DateOptions, Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED,
	STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

use postindex_core::error::{Error, Result};
use postindex_core::types::{FieldType, InferredSchema};

pub const TEXT_TOKENIZER: &str = "text_with_stopwords";

/// Reserved field holding the `type:id` document key.
pub const KEY_FIELD: &str = "_key";
pub const TYPE_FIELD: &str = "_type";
pub const ID_FIELD: &str = "_id";

pub const RESERVED_FIELDS: [&str; 3] = [KEY_FIELD, TYPE_FIELD, ID_FIELD];

/// English function words dropped from analyzed text, at index and query time.
const STOP_WORDS: &[&str] = &[
	"a", "an", "and", "are", "as", "at", "be", "but", "by", "can", "could", "did", "do", "does",
	"for", "from", "had", "has", "have", "having", "he", "how", "if", "in", "is", "it", "its",
	"may", "might", "must", "not", "of", "on", "or", "shall", "should", "so", "than", "that",
	"the", "their", "them", "then", "there", "these", "they", "this", "to", "was", "what", "when",
	"where", "which", "who", "whom", "whose", "why", "will", "with", "would",
];

/// Resolved handles of one generation's schema.
#[derive(Debug, Clone)]
pub struct SchemaFields {
	pub key: Field,
	pub content_type: Field,
	pub id: Field,
	pub mapped: BTreeMap<String, (Field, FieldType)>,
}

impl SchemaFields {
	pub fn mapped(&self, name: &str) -> Result<(Field, FieldType)> {
		self.mapped
			.get(name)
			.copied()
			.ok_or_else(|| Error::Transport(format!("field '{name}' is not mapped")))
	}
}

/// Builds the tantivy schema for `mapping`. Reserved names are rejected.
pub fn build_schema(mapping: &InferredSchema) -> Result<Schema> {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field(KEY_FIELD, STRING | STORED);
	schema_builder.add_text_field(TYPE_FIELD, STRING | STORED);
	schema_builder.add_text_field(ID_FIELD, STRING | STORED);

	let text_field_indexing = TextFieldIndexing::default()
		.set_tokenizer(TEXT_TOKENIZER)
		.set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();

	for field in mapping.fields() {
		if RESERVED_FIELDS.contains(&field.name.as_str()) {
			return Err(Error::MappingApply(format!("'{}' is a reserved field name", field.name)));
		}
		match field.field_type {
			FieldType::Long => {
				schema_builder.add_i64_field(&field.name, INDEXED | STORED | FAST);
			}
			FieldType::Double => {
				schema_builder.add_f64_field(&field.name, INDEXED | STORED | FAST);
			}
			FieldType::Date { .. } => {
				let options = DateOptions::default().set_indexed().set_stored().set_fast();
				schema_builder.add_date_field(&field.name, options);
			}
			FieldType::Keyword => {
				schema_builder.add_text_field(&field.name, STRING | STORED);
			}
			FieldType::Text => {
				schema_builder.add_text_field(&field.name, text_options.clone());
			}
		}
	}
	Ok(schema_builder.build())
}

pub fn resolve_fields(schema: &Schema, mapping: &InferredSchema) -> Result<SchemaFields> {
	let field = |name: &str| schema.get_field(name).map_err(Error::transport);
	let mut mapped = BTreeMap::new();
	for f in mapping.fields() {
		mapped.insert(f.name.clone(), (field(&f.name)?, f.field_type));
	}
	Ok(SchemaFields {
		key: field(KEY_FIELD)?,
		content_type: field(TYPE_FIELD)?,
		id: field(ID_FIELD)?,
		mapped,
	})
}

pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|w| (*w).to_string())))
		.build();
	index.tokenizers().register(TEXT_TOKENIZER, tokenizer);
}
