use serde_json::{json, Map, Value};
use tracing::{info, warn};

use postindex_core::error::{Error, Result};
use postindex_core::traits::SearchEngine;
use postindex_core::types::{FieldConfig, FieldSource, FieldType, InferredSchema, MappedField};

/// Suffix of the text field carrying a taxonomy's term names.
pub const TERM_NAME_SUFFIX: &str = "_name";

pub struct MappingBuilder;

impl MappingBuilder {
    /// Builds the schema for the classified fields. Every taxonomy field also
    /// gets a companion `<taxonomy>_name` text field for its term names.
    pub fn build_schema(fields: &[(FieldConfig, FieldType)]) -> InferredSchema {
        let mut schema = InferredSchema::new();
        for (config, field_type) in fields {
            schema.insert(MappedField {
                name: config.name.clone(),
                source: config.source,
                field_type: *field_type,
            });
        }
        for (config, _) in fields.iter().filter(|(c, _)| c.source == FieldSource::Taxonomy) {
            let companion = Self::term_name_field(&config.name);
            if schema.get(&companion).is_some() {
                warn!(field = %companion, "term name field shadows a configured field; keeping the configured one");
                continue;
            }
            schema.insert(MappedField {
                name: companion,
                source: FieldSource::Taxonomy,
                field_type: FieldType::Text,
            });
        }
        schema
    }

    pub fn term_name_field(taxonomy: &str) -> String {
        format!("{taxonomy}{TERM_NAME_SUFFIX}")
    }

    /// Taxonomy whose names `field` carries, if it is a companion field.
    pub fn taxonomy_of_name_field<'a>(schema: &InferredSchema, field: &'a str) -> Option<&'a str> {
        let base = field.strip_suffix(TERM_NAME_SUFFIX)?;
        let mapped = schema.get(base)?;
        (mapped.source == FieldSource::Taxonomy).then_some(base)
    }

    /// Pushes `schema` to the engine as one unit.
    pub fn apply(engine: &dyn SearchEngine, schema: &InferredSchema) -> Result<()> {
        engine.put_mapping(schema).map_err(|e| match e {
            e @ Error::MappingApply(_) => e,
            other => Error::MappingApply(other.to_string()),
        })?;
        info!(fields = schema.len(), "mapping applied");
        Ok(())
    }

    /// Renders `schema` as an Elasticsearch-style mapping document.
    pub fn to_mapping_json(schema: &InferredSchema) -> Value {
        let mut properties = Map::new();
        for field in schema.fields() {
            let mut property = json!({ "type": field.field_type.es_type() });
            if let FieldType::Date { format } = field.field_type {
                property["format"] = Value::from(format.pattern());
            }
            properties.insert(field.name.clone(), property);
        }
        json!({ "properties": properties })
    }
}
