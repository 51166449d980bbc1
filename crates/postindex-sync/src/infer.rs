//! Field type inference from sampled store values.

use std::collections::BTreeMap;

use tracing::warn;

use postindex_core::dates::DateFormat;
use postindex_core::error::{Error, Result};
use postindex_core::traits::ContentStore;
use postindex_core::types::{ContentRecord, FieldConfig, FieldKind, FieldSource, FieldType};

/// Result of classifying one field. `issue` is set when the operator's flag
/// contradicted the data and the field fell back to `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub field_type: FieldType,
    pub issue: Option<Error>,
}

impl Classification {
    fn ok(field_type: FieldType) -> Self {
        Self { field_type, issue: None }
    }

    fn fallback(field: &str, reason: String) -> Self {
        warn!(field, %reason, "configuration error; indexing as text");
        Self {
            field_type: FieldType::Text,
            issue: Some(Error::Configuration { field: field.to_string(), reason }),
        }
    }
}

enum Number {
    Int,
    Float,
}

fn parse_number(raw: &str) -> Option<Number> {
    let raw = raw.trim();
    if raw.parse::<i64>().is_ok() {
        return Some(Number::Int);
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|_| Number::Float)
}

pub struct TypeInferencer;

impl TypeInferencer {
    /// Classifies `field` from its samples.
    ///
    /// Precedence is numeric flag, then date, then not-analyzed flag, then
    /// text. Blank samples are ignored.
    pub fn classify<S: AsRef<str>>(field: &FieldConfig, samples: &[S]) -> Classification {
        let values: Vec<&str> = samples
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .collect();

        if field.kind == FieldKind::Numeric {
            return Self::numeric(&field.name, &values);
        }
        if let Some(format) = DateFormat::resolve(values.as_slice()) {
            return Classification::ok(FieldType::Date { format });
        }
        if field.kind == FieldKind::Date {
            if values.is_empty() {
                return Classification::ok(FieldType::Date { format: DateFormat::SqlDateTime });
            }
            return Classification::fallback(
                &field.name,
                "flagged as date but samples do not share a recognized date format".into(),
            );
        }
        if field.kind == FieldKind::NotAnalyzed {
            return Classification::ok(FieldType::Keyword);
        }
        Classification::ok(FieldType::Text)
    }

    fn numeric(name: &str, values: &[&str]) -> Classification {
        let mut all_int = !values.is_empty();
        for value in values {
            match parse_number(value) {
                Some(Number::Int) => {}
                Some(Number::Float) => all_int = false,
                None => {
                    return Classification::fallback(
                        name,
                        format!("flagged as numeric but sample '{value}' is not a number"),
                    );
                }
            }
        }
        Classification::ok(if all_int { FieldType::Long } else { FieldType::Double })
    }
}

/// Flattens the value(s) `field` has on `record` into sample strings.
pub fn record_samples(record: &ContentRecord, field: &FieldConfig) -> Vec<String> {
    if field.source == FieldSource::Taxonomy {
        return record
            .terms
            .get(&field.name)
            .map(|terms| terms.iter().map(|t| t.slug.clone()).collect())
            .unwrap_or_default();
    }
    record.value(&field.name).map(|v| v.sample_strings()).unwrap_or_default()
}

/// Collects up to `limit` samples per field from the records of `types`.
///
/// Records are read in store order, so the result is stable for a fixed
/// snapshot. Records the store fails to produce are skipped.
pub fn collect_samples(
    store: &dyn ContentStore,
    fields: &[FieldConfig],
    types: &[String],
    limit: usize,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut samples: BTreeMap<String, Vec<String>> =
        fields.iter().map(|f| (f.name.clone(), Vec::new())).collect();
    let full = |samples: &BTreeMap<String, Vec<String>>| samples.values().all(|s| s.len() >= limit);

    for content_type in types {
        if full(&samples) {
            break;
        }
        for record in store.records(content_type)? {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(content_type = %content_type, error = %e, "skipping unreadable record while sampling");
                    continue;
                }
            };
            for field in fields {
                let bucket = samples.entry(field.name.clone()).or_default();
                let room = limit.saturating_sub(bucket.len());
                bucket.extend(record_samples(&record, field).into_iter().take(room));
            }
            if full(&samples) {
                break;
            }
        }
    }
    Ok(samples)
}
