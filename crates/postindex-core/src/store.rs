//! Content stores: an in-memory store used by tests and embedding, and a
//! directory of JSON record files used by the CLI.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::traits::{ContentStore, RecordIter};
use crate::types::{ContentRecord, DocKey, RecordId};

/// Content type that is never indexed.
pub const ATTACHMENT_TYPE: &str = "attachment";

/// Optional file at the root of a JSON store declaring content types.
pub const TYPES_FILE: &str = "_types.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    #[serde(default)]
    pub exclude_from_search: bool,
    #[serde(default)]
    pub taxonomies: Vec<String>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), exclude_from_search: false, taxonomies: Vec::new() }
    }

    #[must_use]
    pub fn with_taxonomies<I, S>(mut self, taxonomies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.taxonomies = taxonomies.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn excluded(mut self) -> Self {
        self.exclude_from_search = true;
        self
    }

    fn indexable(&self) -> bool {
        !self.exclude_from_search && self.name != ATTACHMENT_TYPE
    }
}

#[derive(Default)]
pub struct MemoryStore {
    types: RwLock<BTreeMap<String, TypeDef>>,
    records: RwLock<BTreeMap<String, BTreeMap<RecordId, ContentRecord>>>,
    next_id: AtomicU64,
    unreachable: AtomicBool,
    meta_scans: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), ..Self::default() }
    }

    /// Registers or replaces a content type definition.
    pub fn register_type(&self, def: TypeDef) {
        write(&self.types).insert(def.name.clone(), def);
    }

    /// Stores `record` under its own id, replacing any previous version.
    /// Unknown content types are registered on the fly.
    pub fn insert(&self, record: ContentRecord) -> DocKey {
        let key = record.key();
        write(&self.types)
            .entry(record.content_type.clone())
            .or_insert_with(|| TypeDef::new(record.content_type.clone()));
        self.next_id.fetch_max(record.id.saturating_add(1), Ordering::SeqCst);
        write(&self.records)
            .entry(record.content_type.clone())
            .or_default()
            .insert(record.id, record);
        key
    }

    /// Stores `record` under a freshly allocated id.
    pub fn insert_new(&self, mut record: ContentRecord) -> DocKey {
        record.id = self.next_id.fetch_add(1, Ordering::SeqCst).max(1);
        self.insert(record)
    }

    pub fn remove(&self, key: &DocKey) -> Option<ContentRecord> {
        write(&self.records)
            .get_mut(&key.content_type)
            .and_then(|by_id| by_id.remove(&key.id))
    }

    pub fn len(&self) -> usize {
        read(&self.records).values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes every store call fail with [`Error::StoreUnavailable`].
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of metadata key scans served so far.
    pub fn meta_scan_count(&self) -> usize {
        self.meta_scans.load(Ordering::SeqCst)
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("memory store marked unreachable".into()));
        }
        Ok(())
    }
}

impl ContentStore for MemoryStore {
    fn indexable_types(&self) -> Result<Vec<String>> {
        self.ensure_reachable()?;
        Ok(read(&self.types)
            .values()
            .filter(|def| def.indexable())
            .map(|def| def.name.clone())
            .collect())
    }

    fn taxonomies(&self, types: &[String]) -> Result<Vec<String>> {
        self.ensure_reachable()?;
        let defs = read(&self.types);
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for def in types.iter().filter_map(|t| defs.get(t)) {
            for taxonomy in &def.taxonomies {
                if seen.insert(taxonomy.clone()) {
                    out.push(taxonomy.clone());
                }
            }
        }
        Ok(out)
    }

    fn records(&self, content_type: &str) -> Result<RecordIter<'_>> {
        self.ensure_reachable()?;
        let snapshot: Vec<ContentRecord> = read(&self.records)
            .get(content_type)
            .map(|by_id| by_id.values().cloned().collect())
            .unwrap_or_default();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    fn record(&self, content_type: &str, id: RecordId) -> Result<Option<ContentRecord>> {
        self.ensure_reachable()?;
        Ok(read(&self.records)
            .get(content_type)
            .and_then(|by_id| by_id.get(&id))
            .cloned())
    }

    fn distinct_meta_keys(&self) -> Result<Vec<String>> {
        self.ensure_reachable()?;
        self.meta_scans.fetch_add(1, Ordering::SeqCst);
        let keys: BTreeSet<String> = read(&self.records)
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(|record| record.meta.keys().cloned())
            .collect();
        Ok(keys.into_iter().collect())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordFile {
    Many(Vec<ContentRecord>),
    One(Box<ContentRecord>),
}

/// Records loaded from `*.json` files under a directory tree.
///
/// Each file holds one record or an array of records. Content types are
/// taken from `_types.json` at the root when present, otherwise derived from
/// the records with the taxonomies their terms name.
pub struct JsonDirStore {
    root: PathBuf,
    inner: MemoryStore,
}

impl JsonDirStore {
    pub fn open(root: &Path, excluded_types: &[String]) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::StoreUnavailable(format!("{} is not a directory", root.display())));
        }
        let inner = MemoryStore::new();
        let declared = root.join(TYPES_FILE);
        if declared.is_file() {
            let defs: Vec<TypeDef> = read_json(&declared)?;
            for def in defs {
                inner.register_type(def);
            }
        }

        let files = list_json_files(root);
        for path in &files {
            let records = match read_json::<RecordFile>(path)? {
                RecordFile::Many(records) => records,
                RecordFile::One(record) => vec![*record],
            };
            for record in records {
                derive_type(&inner, &record);
                inner.insert(record);
            }
        }

        for name in excluded_types {
            let def = read(&inner.types).get(name).cloned();
            inner.register_type(def.unwrap_or_else(|| TypeDef::new(name.clone())).excluded());
        }
        info!(root = %root.display(), files = files.len(), records = inner.len(), "loaded JSON store");
        Ok(Self { root: root.to_path_buf(), inner })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ContentStore for JsonDirStore {
    fn indexable_types(&self) -> Result<Vec<String>> {
        self.inner.indexable_types()
    }

    fn taxonomies(&self, types: &[String]) -> Result<Vec<String>> {
        self.inner.taxonomies(types)
    }

    fn records(&self, content_type: &str) -> Result<RecordIter<'_>> {
        self.inner.records(content_type)
    }

    fn record(&self, content_type: &str, id: RecordId) -> Result<Option<ContentRecord>> {
        self.inner.record(content_type, id)
    }

    fn distinct_meta_keys(&self) -> Result<Vec<String>> {
        self.inner.distinct_meta_keys()
    }
}

fn derive_type(store: &MemoryStore, record: &ContentRecord) {
    let mut types = write(&store.types);
    let def = types
        .entry(record.content_type.clone())
        .or_insert_with(|| TypeDef::new(record.content_type.clone()));
    for taxonomy in record.terms.keys() {
        if !def.taxonomies.contains(taxonomy) {
            def.taxonomies.push(taxonomy.clone());
        }
    }
}

fn list_json_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .filter(|p| p.file_name().and_then(|s| s.to_str()) != Some(TYPES_FILE))
        .collect();
    files.sort();
    debug!(count = files.len(), "listed record files");
    files
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::StoreUnavailable(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::StoreUnavailable(format!("{}: {e}", path.display())))
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
