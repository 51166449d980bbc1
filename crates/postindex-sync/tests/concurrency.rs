use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use postindex_core::config::{FieldSettings, IndexSettings, Settings};
use postindex_core::error::Result;
use postindex_core::store::MemoryStore;
use postindex_core::traits::RecordIter;
use postindex_core::types::{ContentRecord, DocKey, FieldType, RecordId};
use postindex_core::{ContentStore, SearchEngine};
use postindex_sync::Indexer;
use postindex_text::TantivyEngine;

const HEAP: usize = 15_000_000;

/// A store whose next `records` call, once armed, parks until released.
struct ParkingStore {
    inner: MemoryStore,
    armed: AtomicBool,
    parked: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl ContentStore for ParkingStore {
    fn indexable_types(&self) -> Result<Vec<String>> {
        self.inner.indexable_types()
    }

    fn taxonomies(&self, types: &[String]) -> Result<Vec<String>> {
        self.inner.taxonomies(types)
    }

    fn records(&self, content_type: &str) -> Result<RecordIter<'_>> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.parked.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
        self.inner.records(content_type)
    }

    fn record(&self, content_type: &str, id: RecordId) -> Result<Option<ContentRecord>> {
        self.inner.record(content_type, id)
    }

    fn distinct_meta_keys(&self) -> Result<Vec<String>> {
        self.inner.distinct_meta_keys()
    }
}

fn settings(fields: FieldSettings) -> Settings {
    Settings {
        index: IndexSettings { writer_heap_bytes: HEAP, ..IndexSettings::default() },
        fields,
        ..Settings::default()
    }
}

#[test]
fn remap_waits_for_an_in_flight_reindex() -> anyhow::Result<()> {
    let (parked_tx, parked_rx) = channel();
    let (release_tx, release_rx) = channel();
    let store = ParkingStore {
        inner: MemoryStore::new(),
        armed: AtomicBool::new(false),
        parked: Mutex::new(parked_tx),
        release: Mutex::new(release_rx),
    };
    for id in 1..=3 {
        store.inner.insert(ContentRecord::new("post", id).with_meta("field1", "v"));
    }
    let indexer = Indexer::new(store, TantivyEngine::in_memory(HEAP), &settings(FieldSettings::with_fields(["field1"])));
    indexer.remap()?;
    let before = indexer.schema().expect("schema");

    let events = Mutex::new(Vec::new());
    indexer.store().armed.store(true, Ordering::SeqCst);
    thread::scope(|s| -> anyhow::Result<()> {
        let reindex = s.spawn(|| {
            indexer.reindex_with(|_| {
                events.lock().unwrap().push(format!("batch written under {} fields", indexer.schema().map_or(0, |m| m.len())));
            })
        });
        parked_rx.recv()?;

        indexer.set_options(FieldSettings::with_fields(["field1", "field3"]).numeric(["field3"]))?;
        let remap = s.spawn(|| {
            let summary = indexer.remap();
            events.lock().unwrap().push("remap applied".to_string());
            summary
        });
        thread::sleep(Duration::from_millis(200));
        assert!(events.lock().unwrap().is_empty(), "remap must not run while reindex holds the gate");

        release_tx.send(())?;
        let summary = reindex.join().expect("reindex thread")?;
        assert_eq!(summary.succeeded_count(), 3);
        assert!(remap.join().expect("remap thread")?.applied);
        Ok(())
    })?;

    assert_eq!(
        *events.lock().unwrap(),
        vec![format!("batch written under {} fields", before.len()), "remap applied".to_string()]
    );
    assert_eq!(indexer.schema().and_then(|s| s.field_type("field3")), Some(FieldType::Double));
    assert_eq!(indexer.engine().count()?, 3);
    Ok(())
}

#[test]
fn concurrent_first_writers_keep_both_documents() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let first = store.insert(ContentRecord::new("post", 1).with_meta("field1", "a"));
    let second = store.insert(ContentRecord::new("post", 2).with_meta("field1", "b"));
    let indexer = Indexer::new(store, TantivyEngine::in_memory(HEAP), &settings(FieldSettings::with_fields(["field1"])));

    thread::scope(|s| {
        let writers: Vec<_> = [&first, &second]
            .into_iter()
            .map(|key| {
                let indexer = &indexer;
                s.spawn(move || {
                    let record = indexer.store().record(&key.content_type, key.id)?.expect("stored record");
                    indexer.add_or_update(&record)
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer thread").expect("add_or_update");
        }
    });

    assert_eq!(indexer.engine().count()?, 2);
    for key in [DocKey::new("post", 1), DocKey::new("post", 2)] {
        assert!(indexer.engine().get(&key)?.is_some(), "{key} was lost");
    }
    Ok(())
}
