use std::collections::BTreeMap;

use tempfile::TempDir;

use postindex_core::config::{FieldSettings, IndexSettings, Settings};
use postindex_core::dates::DateFormat;
use postindex_core::store::{MemoryStore, TypeDef};
use postindex_core::types::{
    ContentRecord, DocKey, FieldMatch, FieldType, FieldValue, IndexValue, SortOrder, TaxonomyTerm,
};
use postindex_core::{ContentStore, Error, SearchEngine};
use postindex_sync::{DocumentTransformer, Indexer};
use postindex_text::TantivyEngine;

const HEAP: usize = 15_000_000;

fn settings(fields: FieldSettings) -> Settings {
    Settings {
        index: IndexSettings { writer_heap_bytes: HEAP, ..IndexSettings::default() },
        fields,
        ..Settings::default()
    }
}

fn indexer(fields: FieldSettings) -> Indexer<MemoryStore, TantivyEngine> {
    let store = MemoryStore::new();
    store.register_type(TypeDef::new("post"));
    Indexer::new(store, TantivyEngine::in_memory(HEAP), &settings(fields))
}

fn post(id: u64) -> ContentRecord {
    ContentRecord::new("post", id)
}

fn text(field: &str, value: &str) -> FieldMatch {
    FieldMatch { field: field.into(), value: IndexValue::Text(value.into()) }
}

fn keyword(field: &str, value: &str) -> FieldMatch {
    FieldMatch { field: field.into(), value: IndexValue::Keyword(value.into()) }
}

fn ids(keys: Vec<DocKey>) -> Vec<u64> {
    keys.into_iter().map(|k| k.id).collect()
}

fn two_field_record(id: u64) -> ContentRecord {
    post(id).with_meta("field1", "value1").with_meta("field2", "value2")
}

fn matches_two_fields(indexer: &Indexer<MemoryStore, TantivyEngine>) -> Vec<DocKey> {
    indexer
        .engine()
        .search(&[text("field1", "value1"), text("field2", "value2")])
        .expect("search")
}

#[test]
fn add_or_update_indexes_record() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field1", "field2"]));
    let record = two_field_record(1);
    indexer.add_or_update(&record)?;

    assert_eq!(matches_two_fields(&indexer), vec![DocKey::new("post", 1)]);

    let schema = indexer.schema().expect("mapping created lazily");
    let expected = DocumentTransformer::to_document(&record, &schema).document;
    assert_eq!(indexer.engine().get(&record.key())?, Some(expected));
    Ok(())
}

#[test]
fn add_or_update_is_idempotent() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field1", "field2"]));
    let record = two_field_record(1);
    indexer.add_or_update(&record)?;
    let first = indexer.engine().get(&record.key())?;
    indexer.add_or_update(&record)?;
    assert_eq!(indexer.engine().count()?, 1);
    assert_eq!(indexer.engine().get(&record.key())?, first);
    Ok(())
}

#[test]
fn clear_empties_the_index() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field1", "field2"]));
    indexer.add_or_update(&two_field_record(1))?;
    assert_eq!(indexer.engine().count()?, 1);

    indexer.clear()?;
    assert_eq!(indexer.engine().count()?, 0);
    assert!(indexer.engine().mapping()?.is_some(), "mapping survives a clear");

    indexer.clear()?;
    assert_eq!(indexer.engine().count()?, 0);
    Ok(())
}

#[test]
fn deleting_unindexed_record_is_a_no_op() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field1", "field2"]));
    indexer.add_or_update(&two_field_record(1))?;
    indexer.delete(&DocKey::new("post", 2))?;
    assert_eq!(indexer.engine().count()?, 1);
    Ok(())
}

#[test]
fn delete_removes_document() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field1", "field2"]));
    let record = two_field_record(1);
    indexer.add_or_update(&record)?;
    assert_eq!(matches_two_fields(&indexer).len(), 1);

    indexer.delete(&record.key())?;
    assert_eq!(indexer.engine().count()?, 0);

    indexer.add_or_update(&record)?;
    indexer.delete(&record.key())?;
    assert_eq!(indexer.engine().get(&record.key())?, None);
    Ok(())
}

#[test]
fn reindex_indexes_stored_records() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field1", "field2"]));
    let key = indexer.store().insert_new(two_field_record(0));

    let summary = indexer.reindex()?;
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.succeeded, vec![key.clone()]);
    assert_eq!(matches_two_fields(&indexer), vec![key]);
    Ok(())
}

#[test]
fn numeric_fields_sort_numerically() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field3"]).numeric(["field3"]));
    indexer.store().insert(post(1).with_meta("field3", "7"));
    indexer.store().insert(post(2).with_meta("field3", "30"));

    indexer.remap()?;
    indexer.reindex()?;

    assert_eq!(indexer.schema().and_then(|s| s.field_type("field3")), Some(FieldType::Long));
    assert_eq!(ids(indexer.engine().sorted_keys("field3", SortOrder::Asc)?), vec![1, 2]);
    assert_eq!(ids(indexer.engine().sorted_keys("field3", SortOrder::Desc)?), vec![2, 1]);
    Ok(())
}

#[test]
fn unflagged_numbers_sort_as_strings() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field5"]));
    indexer.store().insert(post(1).with_meta("field5", "7"));
    indexer.store().insert(post(2).with_meta("field5", "30"));

    indexer.remap()?;
    indexer.reindex()?;

    assert_eq!(ids(indexer.engine().sorted_keys("field5", SortOrder::Asc)?), vec![2, 1]);
    assert_eq!(ids(indexer.engine().sorted_keys("field5", SortOrder::Desc)?), vec![1, 2]);
    Ok(())
}

#[test]
fn dates_sort_by_calendar() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["post_date"]));
    indexer.store().insert(post(1).with_attribute("post_date", "07/30/1989 00:00:00 CST"));
    indexer.store().insert(post(2).with_attribute("post_date", "10/30/1988 00:00:00 CST"));

    indexer.remap()?;
    indexer.reindex()?;

    assert_eq!(
        indexer.schema().and_then(|s| s.field_type("post_date")),
        Some(FieldType::Date { format: DateFormat::UsDateTime })
    );
    assert_eq!(ids(indexer.engine().sorted_keys("post_date", SortOrder::Asc)?), vec![2, 1]);
    assert_eq!(ids(indexer.engine().sorted_keys("post_date", SortOrder::Desc)?), vec![1, 2]);
    Ok(())
}

#[test]
fn update_by_query_rewrites_matching_documents() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["some_field"]).not_analyzed(["some_field"]));
    indexer.store().insert_new(post(0).with_meta("some_field", "Some Value"));
    indexer.store().insert_new(post(0).with_meta("some_field", "Some Value"));
    indexer.store().insert_new(ContentRecord::new("page", 0).with_meta("some_field", "Another Value"));

    indexer.remap()?;
    indexer.reindex()?;

    let engine = indexer.engine();
    assert_eq!(engine.search(&[keyword("some_field", "Some Value")])?.len(), 2);
    assert_eq!(engine.search(&[keyword("some_field", "Another Value")])?.len(), 1);

    let criteria = BTreeMap::from([("some_field".to_string(), FieldValue::from("Some Value"))]);
    let new_values = BTreeMap::from([("some_field".to_string(), FieldValue::from("Another Value"))]);
    let summary = indexer.update_by_query(&criteria, &new_values)?;
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded_count(), 2);
    assert!(summary.failed.is_empty());

    assert!(engine.search(&[keyword("some_field", "Some Value")])?.is_empty());
    let updated = engine.search(&[keyword("some_field", "Another Value")])?;
    assert_eq!(updated.len(), 3);
    for key in updated {
        let doc = engine.get(&key)?.expect("document");
        assert_eq!(doc.first("some_field"), Some(&IndexValue::Keyword("Another Value".into())));
    }
    Ok(())
}

#[test]
fn update_by_query_keeps_other_fields() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["some_field", "post_title"]).not_analyzed(["some_field"]));
    indexer.store().insert(post(1).with_meta("some_field", "a").with_attribute("post_title", "Title"));
    indexer.reindex()?;

    let criteria = BTreeMap::from([("some_field".to_string(), FieldValue::from("a"))]);
    let new_values = BTreeMap::from([("some_field".to_string(), FieldValue::from("b"))]);
    indexer.update_by_query(&criteria, &new_values)?;

    let doc = indexer.engine().get(&DocKey::new("post", 1))?.expect("document");
    assert_eq!(doc.first("some_field"), Some(&IndexValue::Keyword("b".into())));
    assert_eq!(doc.first("post_title"), Some(&IndexValue::Text("Title".into())));
    Ok(())
}

#[test]
fn update_by_query_rejects_bad_input_before_writing() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field3"]).numeric(["field3"]));
    indexer.store().insert(post(1).with_meta("field3", "7"));
    indexer.reindex()?;

    let criteria = BTreeMap::from([("field3".to_string(), FieldValue::from(7_i64))]);
    let unknown = BTreeMap::from([("nope".to_string(), FieldValue::from(1_i64))]);
    assert!(matches!(
        indexer.update_by_query(&criteria, &unknown),
        Err(Error::Configuration { field, .. }) if field == "nope"
    ));

    let not_a_number = BTreeMap::from([("field3".to_string(), FieldValue::from("eight"))]);
    assert!(matches!(
        indexer.update_by_query(&criteria, &not_a_number),
        Err(Error::Configuration { .. })
    ));

    let doc = indexer.engine().get(&DocKey::new("post", 1))?.expect("document");
    assert_eq!(doc.first("field3"), Some(&IndexValue::Long(7)));
    Ok(())
}

#[test]
fn update_by_query_requires_a_criterion() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["some_field"]).not_analyzed(["some_field"]));
    indexer.store().insert(post(1).with_meta("some_field", "a"));
    indexer.store().insert(post(2).with_meta("some_field", "b"));
    indexer.reindex()?;

    let new_values = BTreeMap::from([("some_field".to_string(), FieldValue::from("z"))]);
    assert!(matches!(
        indexer.update_by_query(&BTreeMap::new(), &new_values),
        Err(Error::Configuration { .. })
    ));
    assert!(indexer.engine().search(&[keyword("some_field", "z")])?.is_empty());
    assert_eq!(indexer.engine().search(&[keyword("some_field", "a")])?.len(), 1);
    Ok(())
}

#[test]
fn update_by_query_leaves_taxonomy_fields_to_the_store() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["category", "field1"]).not_analyzed(["category", "field1"]));
    indexer.store().register_type(TypeDef::new("post").with_taxonomies(["category"]));
    indexer.store().insert(
        post(1)
            .with_meta("field1", "v")
            .with_terms("category", vec![TaxonomyTerm::new("tech", "Tech")]),
    );
    indexer.reindex()?;

    let criteria = BTreeMap::from([("field1".to_string(), FieldValue::from("v"))]);
    for field in ["category", "category_name"] {
        let new_values = BTreeMap::from([(field.to_string(), FieldValue::from("news"))]);
        assert!(matches!(
            indexer.update_by_query(&criteria, &new_values),
            Err(Error::Configuration { field: rejected, .. }) if rejected == field
        ));
    }

    let doc = indexer.engine().get(&DocKey::new("post", 1))?.expect("document");
    assert_eq!(doc.first("category"), Some(&IndexValue::Keyword("tech".into())));
    assert_eq!(doc.first("category_name"), Some(&IndexValue::Text("Tech".into())));
    Ok(())
}

#[test]
fn remap_keeps_indexed_documents_searchable() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field1", "field2"]));
    for id in 1..=3 {
        indexer.store().insert(two_field_record(id));
    }
    indexer.reindex()?;

    let summary = indexer.remap()?;
    assert!(summary.applied);
    assert_eq!(indexer.engine().count()?, 3, "an unchanged mapping keeps every document");
    assert_eq!(ids(matches_two_fields(&indexer)), vec![1, 2, 3]);

    indexer.set_options(FieldSettings::with_fields(["field1", "field2", "field3"]).numeric(["field3"]))?;
    indexer.remap()?;
    assert_eq!(indexer.schema().and_then(|s| s.field_type("field3")), Some(FieldType::Double));
    assert_eq!(indexer.engine().count()?, 3, "a changed mapping carries documents over");
    assert_eq!(ids(matches_two_fields(&indexer)), vec![1, 2, 3]);
    Ok(())
}

#[test]
fn reindex_reports_exactly_the_bad_record() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field3", "post_title"]).numeric(["field3"]));
    for (id, value) in [(1, "7"), (2, "30"), (3, "12")] {
        indexer.store().insert(post(id).with_meta("field3", value).with_attribute("post_title", "t"));
    }
    indexer.remap()?;
    indexer.store().insert(post(4).with_meta("field3", "not a number").with_attribute("post_title", "t"));

    let summary = indexer.reindex()?;
    assert_eq!(summary.attempted, 4);
    assert_eq!(summary.succeeded_count(), 3);
    assert_eq!(summary.failed_keys(), vec![DocKey::new("post", 4)]);

    for id in 1..=3 {
        let doc = indexer.engine().get(&DocKey::new("post", id))?.expect("indexed");
        assert!(doc.first("field3").is_some());
    }
    let bad = indexer.engine().get(&DocKey::new("post", 4))?.expect("indexed without the bad field");
    assert_eq!(bad.first("field3"), None);
    assert_eq!(bad.first("post_title"), Some(&IndexValue::Text("t".into())));
    Ok(())
}

#[test]
fn clear_then_remap_and_reindex_restores_everything() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field1", "field2"]));
    for id in 1..=3 {
        indexer.store().insert(two_field_record(id));
    }
    indexer.reindex()?;
    indexer.clear()?;
    assert_eq!(indexer.engine().count()?, 0);

    indexer.remap()?;
    let summary = indexer.reindex()?;
    assert_eq!(summary.succeeded_count(), 3);
    assert_eq!(indexer.engine().count()?, 3);
    Ok(())
}

#[test]
fn reindex_reports_progress_per_batch() -> anyhow::Result<()> {
    let mut small_batches = settings(FieldSettings::with_fields(["field1"]));
    small_batches.index.bulk_size = 2;
    let store = MemoryStore::new();
    for id in 1..=5 {
        store.insert(post(id).with_meta("field1", "v"));
    }
    let indexer = Indexer::new(store, TantivyEngine::in_memory(HEAP), &small_batches);

    let mut seen = Vec::new();
    let summary = indexer.reindex_with(|p| seen.push(p.processed))?;
    assert_eq!(seen, vec![2, 4, 5]);
    assert_eq!(summary.succeeded_count(), 5);
    Ok(())
}

#[test]
fn excluded_and_disallowed_types_are_skipped() -> anyhow::Result<()> {
    let mut options = FieldSettings::with_fields(["field1"]);
    options.types = Some(vec!["post".to_string()]);
    let indexer = indexer(options);
    indexer.store().register_type(TypeDef::new("revision").excluded());
    indexer.store().insert(post(1).with_meta("field1", "v"));
    indexer.store().insert(ContentRecord::new("revision", 2).with_meta("field1", "v"));
    indexer.store().insert(ContentRecord::new("page", 3).with_meta("field1", "v"));

    let summary = indexer.reindex()?;
    assert_eq!(summary.succeeded, vec![DocKey::new("post", 1)]);
    Ok(())
}

#[test]
fn taxonomy_terms_index_slugs_and_names() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["category"]).not_analyzed(["category"]));
    indexer.store().register_type(TypeDef::new("post").with_taxonomies(["category"]));
    indexer.store().insert(
        post(1).with_terms("category", vec![TaxonomyTerm::new("tech", "Tech News")]),
    );
    indexer.remap()?;
    indexer.reindex()?;

    let engine = indexer.engine();
    assert_eq!(ids(engine.search(&[keyword("category", "tech")])?), vec![1]);
    assert_eq!(ids(engine.search(&[text("category_name", "Tech News")])?), vec![1]);
    Ok(())
}

#[test]
fn remap_reports_configuration_errors_without_aborting() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field3", "field4"]).numeric(["field3", "field4"]));
    indexer.store().insert(post(1).with_meta("field3", "seven").with_meta("field4", "4"));

    let summary = indexer.remap()?;
    assert!(summary.applied);
    assert_eq!(summary.issues.len(), 1);
    let schema = indexer.schema().expect("schema");
    assert_eq!(schema.field_type("field3"), Some(FieldType::Text));
    assert_eq!(schema.field_type("field4"), Some(FieldType::Long));
    Ok(())
}

#[test]
fn store_notifications_drive_upserts_and_deletes() -> anyhow::Result<()> {
    let indexer = indexer(FieldSettings::with_fields(["field1", "field2"]));
    let key = indexer.store().insert(two_field_record(1));

    indexer.on_record_saved("post", 1)?;
    assert!(indexer.engine().get(&key)?.is_some());

    indexer.store().remove(&key);
    indexer.on_record_saved("post", 1)?;
    assert!(indexer.engine().get(&key)?.is_none(), "a vanished record is removed");

    indexer.store().insert(two_field_record(1));
    indexer.on_record_saved("post", 1)?;
    indexer.on_record_deleted(&key)?;
    assert_eq!(indexer.engine().count()?, 0);
    Ok(())
}

#[test]
fn reopened_index_keeps_its_mapping() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let options = FieldSettings::with_fields(["field3"]).numeric(["field3"]);
    let store = || {
        let store = MemoryStore::new();
        store.insert(post(1).with_meta("field3", "7"));
        store
    };

    {
        let indexer = Indexer::new(store(), TantivyEngine::open(tmp.path(), HEAP)?, &settings(options.clone()));
        indexer.reindex()?;
    }

    let indexer = Indexer::new(store(), TantivyEngine::open(tmp.path(), HEAP)?, &settings(options));
    assert_eq!(indexer.engine().count()?, 1);
    indexer.add_or_update(&post(2).with_meta("field3", "9"))?;
    assert_eq!(indexer.schema().and_then(|s| s.field_type("field3")), Some(FieldType::Long));
    assert_eq!(ids(indexer.engine().sorted_keys("field3", SortOrder::Desc)?), vec![2, 1]);
    assert_eq!(indexer.store().indexable_types()?, vec!["post"]);
    Ok(())
}
