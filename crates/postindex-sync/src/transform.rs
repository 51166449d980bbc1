//! Conversion of content records into index documents.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use postindex_core::error::Error;
use postindex_core::types::{
    ContentRecord, FieldSource, FieldType, FieldValue, IndexDocument, IndexValue, InferredSchema,
    MappedField,
};

use crate::mapping::MappingBuilder;

/// A document plus the fields that had to be left out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed {
    pub document: IndexDocument,
    /// One [`Error::Transform`] per omitted field.
    pub issues: Vec<Error>,
}

impl Transformed {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

pub struct DocumentTransformer;

impl DocumentTransformer {
    /// Builds the document for `record` under `schema`. Pure: no I/O.
    ///
    /// Missing and blank values are left out silently. Values that cannot be
    /// coerced leave their field out and are reported in `issues`.
    pub fn to_document(record: &ContentRecord, schema: &InferredSchema) -> Transformed {
        let mut document = IndexDocument::new(record.key());
        let mut issues = Vec::new();
        for field in schema.fields() {
            let Some(raw) = Self::raw_value(record, schema, field) else {
                continue;
            };
            match coerce(field.field_type, &raw) {
                Ok(values) if values.is_empty() => {}
                Ok(values) => {
                    document.fields.insert(field.name.clone(), values);
                }
                Err(reason) => issues.push(Error::Transform { field: field.name.clone(), reason }),
            }
        }
        Transformed { document, issues }
    }

    fn raw_value(record: &ContentRecord, schema: &InferredSchema, field: &MappedField) -> Option<FieldValue> {
        if field.source != FieldSource::Taxonomy {
            return record.value(&field.name).cloned();
        }
        if let Some(taxonomy) = MappingBuilder::taxonomy_of_name_field(schema, &field.name) {
            let terms = record.terms.get(taxonomy)?;
            return Some(FieldValue::List(terms.iter().map(|t| t.name.as_str().into()).collect()));
        }
        let terms = record.terms.get(&field.name)?;
        Some(FieldValue::List(terms.iter().map(|t| t.slug.as_str().into()).collect()))
    }
}

/// Coerces `value` to `field_type`, flattening lists in order.
///
/// Blank values coerce to nothing. Any element that cannot be coerced fails
/// the whole value.
pub fn coerce(field_type: FieldType, value: &FieldValue) -> Result<Vec<IndexValue>, String> {
    let mut out = Vec::new();
    coerce_into(field_type, value, &mut out)?;
    Ok(out)
}

fn coerce_into(field_type: FieldType, value: &FieldValue, out: &mut Vec<IndexValue>) -> Result<(), String> {
    if let FieldValue::List(items) = value {
        for item in items {
            coerce_into(field_type, item, out)?;
        }
        return Ok(());
    }
    if matches!(value, FieldValue::Str(s) if s.trim().is_empty()) {
        return Ok(());
    }
    out.push(coerce_scalar(field_type, value)?);
    Ok(())
}

fn coerce_scalar(field_type: FieldType, value: &FieldValue) -> Result<IndexValue, String> {
    match field_type {
        FieldType::Long => to_long(value).map(IndexValue::Long),
        FieldType::Double => to_double(value).map(IndexValue::Double),
        FieldType::Date { format } => {
            let parsed = match value {
                FieldValue::Date(d) => Some(*d),
                FieldValue::Str(s) => format.parse(s),
                _ => None,
            };
            parsed
                .and_then(whole_seconds)
                .map(IndexValue::Date)
                .ok_or_else(|| format!("'{}' is not a date in format {}", display(value), format.pattern()))
        }
        FieldType::Keyword => Ok(IndexValue::Keyword(display(value))),
        FieldType::Text => Ok(IndexValue::Text(display(value))),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn to_long(value: &FieldValue) -> Result<i64, String> {
    let whole = |v: f64| {
        (v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64)
            .then_some(v as i64)
    };
    let parsed = match value {
        FieldValue::Int(v) => Some(*v),
        FieldValue::Float(v) => whole(*v),
        FieldValue::Str(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(whole))
        }
        FieldValue::Date(_) | FieldValue::List(_) => None,
    };
    parsed.ok_or_else(|| format!("'{}' is not an integer", display(value)))
}

#[allow(clippy::cast_precision_loss)]
fn to_double(value: &FieldValue) -> Result<f64, String> {
    let parsed = match value {
        FieldValue::Int(v) => Some(*v as f64),
        FieldValue::Float(v) => Some(*v),
        FieldValue::Str(s) => s.trim().parse::<f64>().ok(),
        FieldValue::Date(_) | FieldValue::List(_) => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("'{}' is not a number", display(value)))
}

/// Index dates carry second precision.
fn whole_seconds(d: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(d.timestamp(), 0).single()
}

fn display(value: &FieldValue) -> String {
    match value {
        FieldValue::Int(v) => v.to_string(),
        FieldValue::Float(v) => v.to_string(),
        FieldValue::Str(s) => s.clone(),
        FieldValue::Date(d) => d.to_rfc3339_opts(SecondsFormat::Secs, true),
        FieldValue::List(items) => items.iter().map(display).collect::<Vec<_>>().join(", "),
    }
}
