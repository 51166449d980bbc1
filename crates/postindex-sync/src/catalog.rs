//! Discovery of candidate fields and resolution of the operator's selection.
//!
//! Candidates come from three places: the built-in record attributes, the
//! distinct metadata keys seen on any record, and the taxonomies registered for
//! indexable content types. The metadata scan is expensive, so its result is
//! kept in a [`TtlCache`].

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, warn};

use postindex_core::cache::TtlCache;
use postindex_core::config::FieldSettings;
use postindex_core::error::Result;
use postindex_core::traits::ContentStore;
use postindex_core::types::{FieldConfig, FieldSource};

/// Record attributes every content type carries.
pub const BUILTIN_ATTRIBUTES: [&str; 17] = [
    "comment_count",
    "comment_status",
    "menu_order",
    "ping_status",
    "post_author",
    "post_content",
    "post_date",
    "post_date_gmt",
    "post_excerpt",
    "post_mime_type",
    "post_modified",
    "post_modified_gmt",
    "post_name",
    "post_parent",
    "post_status",
    "post_title",
    "post_type",
];

const META_KEYS: &str = "meta_keys";

/// Every candidate field, for listing to an operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableFields {
    pub attributes: Vec<String>,
    pub meta: Vec<String>,
    pub taxonomies: Vec<String>,
}

pub struct FieldCatalog {
    meta_cache: TtlCache<Vec<String>>,
}

impl FieldCatalog {
    pub fn new(meta_cache_ttl: Duration) -> Self {
        Self { meta_cache: TtlCache::new(meta_cache_ttl) }
    }

    /// Selected fields in configured order, each with its kind and source.
    ///
    /// Never fails: an unreachable store yields an empty set, which callers
    /// treat as nothing to index.
    pub fn active_fields(&self, store: &dyn ContentStore, options: &FieldSettings) -> Vec<FieldConfig> {
        let types = match active_types(store, options) {
            Ok(types) => types,
            Err(e) => {
                warn!(error = %e, "content store unreachable; no active fields");
                return Vec::new();
            }
        };
        let taxonomies = store.taxonomies(&types).unwrap_or_else(|e| {
            warn!(error = %e, "could not list taxonomies");
            Vec::new()
        });
        let meta = self.meta_keys(store).unwrap_or_else(|e| {
            warn!(error = %e, "could not list metadata keys");
            Vec::new()
        });

        let mut seen = BTreeSet::new();
        options
            .selected()
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .map(|name| {
                let source = source_of(&name, &taxonomies, &meta);
                let kind = options.kind_of(&name);
                FieldConfig::new(name, kind, source)
            })
            .collect()
    }

    /// Every candidate field the store currently offers.
    pub fn available(&self, store: &dyn ContentStore) -> AvailableFields {
        let types = store.indexable_types().unwrap_or_else(|e| {
            warn!(error = %e, "content store unreachable");
            Vec::new()
        });
        AvailableFields {
            attributes: BUILTIN_ATTRIBUTES.iter().map(ToString::to_string).collect(),
            meta: self.meta_keys(store).unwrap_or_default(),
            taxonomies: store.taxonomies(&types).unwrap_or_default(),
        }
    }

    /// Public metadata keys: deduplicated, naturally sorted ignoring case.
    pub fn meta_keys(&self, store: &dyn ContentStore) -> Result<Vec<String>> {
        if let Some(keys) = self.meta_cache.get(META_KEYS) {
            debug!(count = keys.len(), "metadata keys cache hit");
            return Ok(keys);
        }
        debug!("metadata keys cache miss; scanning store");
        self.meta_cache
            .get_or_try_insert_with(META_KEYS, || store.distinct_meta_keys().map(public_keys))
    }

    /// Drops the cached metadata scan.
    pub fn invalidate(&self) {
        self.meta_cache.invalidate(META_KEYS);
    }
}

/// Indexable content types, narrowed by the operator's allow-list.
pub fn active_types(store: &dyn ContentStore, options: &FieldSettings) -> Result<Vec<String>> {
    let types = store.indexable_types()?;
    Ok(match &options.types {
        Some(allowed) => types.into_iter().filter(|t| allowed.contains(t)).collect(),
        None => types,
    })
}

/// Taxonomy wins over attribute, attribute over metadata. Names the store
/// has not reported are assumed to be metadata.
fn source_of(name: &str, taxonomies: &[String], meta: &[String]) -> FieldSource {
    if taxonomies.iter().any(|t| t == name) {
        FieldSource::Taxonomy
    } else if BUILTIN_ATTRIBUTES.contains(&name) {
        FieldSource::Attribute
    } else {
        if !meta.iter().any(|m| m == name) {
            debug!(field = name, "configured field not found in store; assuming metadata");
        }
        FieldSource::Meta
    }
}

fn public_keys(keys: Vec<String>) -> Vec<String> {
    let mut keys: Vec<String> = keys
        .into_iter()
        .filter(|k| !k.is_empty() && !k.starts_with('_'))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    keys.sort_by(|a, b| natural_cmp(a, b));
    keys
}

/// Case-insensitive comparison where digit runs compare by numeric value.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left = take_digits(&mut a);
                let right = take_digits(&mut b);
                let left_trimmed = left.trim_start_matches('0');
                let right_trimmed = right.trim_start_matches('0');
                let ord = left_trimmed
                    .len()
                    .cmp(&right_trimmed.len())
                    .then_with(|| left_trimmed.cmp(right_trimmed));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}
