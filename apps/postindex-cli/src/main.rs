use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use postindex_core::config::{expand_path, Config, Settings};
use postindex_core::store::JsonDirStore;
use postindex_core::types::{DocKey, FieldValue, RecordId};
use postindex_core::SearchEngine;
use postindex_sync::{BulkSummary, Indexer, MappingBuilder};
use postindex_text::TantivyEngine;

type CliIndexer = Indexer<JsonDirStore, TantivyEngine>;

/// Keeps a search index in sync with a directory of JSON content records.
#[derive(Parser, Debug)]
#[command(name = "postindex", version, about, long_about = None)]
struct Args {
    /// Directory of JSON records (overrides store.data_dir)
    #[arg(long, env = "POSTINDEX_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Index directory (overrides index.dir); in-memory when neither is set
    #[arg(long, env = "POSTINDEX_INDEX_DIR")]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every field that can be selected for indexing
    Fields,
    /// Rebuild the mapping from the configured fields and the store's data
    Remap,
    /// Write every record of every indexed type
    Reindex,
    /// Remove all documents, keeping the mapping
    Clear,
    /// Print the current mapping
    Mapping,
    /// Number of indexed documents
    Count,
    /// Rewrite fields on every document matching all criteria
    UpdateByQuery {
        /// Criterion as field=value; repeatable
        #[arg(long = "match", value_name = "FIELD=VALUE", value_parser = parse_pair, required = true)]
        criteria: Vec<(String, String)>,
        /// New value as field=value; repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_pair, required = true)]
        values: Vec<(String, String)>,
    },
    /// Re-index one record as the store would after a save
    Upsert { content_type: String, id: RecordId },
    /// Remove one record's document
    Delete { content_type: String, id: RecordId },
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => Ok((field.trim().to_string(), value.to_string())),
        _ => Err(format!("expected FIELD=VALUE, got '{s}'")),
    }
}

fn to_values(pairs: Vec<(String, String)>) -> BTreeMap<String, FieldValue> {
    pairs.into_iter().map(|(field, value)| (field, FieldValue::from(value))).collect()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn build_indexer(args: &Args, settings: &Settings) -> anyhow::Result<CliIndexer> {
    let base = env::current_dir()?;
    let data_dir = match (&args.data_dir, &settings.store.data_dir) {
        (Some(dir), _) => dir.clone(),
        (None, Some(dir)) => expand_path(dir),
        (None, None) => bail!("no data directory: pass --data-dir or set store.data_dir"),
    };
    let store = JsonDirStore::open(&data_dir, &settings.store.excluded_types)
        .with_context(|| format!("opening store at {}", data_dir.display()))?;
    info!(records = store.len(), dir = %data_dir.display(), "store loaded");

    let heap = settings.index.writer_heap_bytes;
    let engine = match args.index_dir.clone().or_else(|| settings.index.resolved_dir(&base)) {
        Some(dir) => TantivyEngine::open(&dir, heap).with_context(|| format!("opening index at {}", dir.display()))?,
        None => {
            info!("no index directory configured; using an in-memory index");
            TantivyEngine::in_memory(heap)
        }
    };
    Ok(Indexer::new(store, engine, settings))
}

fn print_summary(action: &str, summary: &BulkSummary) {
    println!(
        "✅ {action}: {} attempted, {} succeeded, {} failed",
        summary.attempted,
        summary.succeeded_count(),
        summary.failed_count()
    );
    for failure in &summary.failed {
        match &failure.key {
            Some(key) => println!("  ❌ {key}: {}", failure.reason),
            None => println!("  ❌ (unreadable record): {}", failure.reason),
        }
    }
}

fn reindex(indexer: &CliIndexer) -> anyhow::Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    let summary = indexer.reindex_with(|progress| {
        pb.set_message(format!(
            "{}: {} records ({} failed)",
            progress.content_type, progress.processed, progress.failed
        ));
        pb.tick();
    })?;
    pb.finish_and_clear();
    print_summary("Reindex", &summary);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;
    let indexer = build_indexer(&args, &settings)?;

    match args.command {
        Command::Fields => {
            let available = indexer.catalog().available(indexer.store());
            println!("Attributes: {}", available.attributes.join(", "));
            println!("Metadata:   {}", available.meta.join(", "));
            println!("Taxonomies: {}", available.taxonomies.join(", "));
            let selected = indexer.options().selected();
            println!("Selected:   {}", selected.join(", "));
        }
        Command::Remap => {
            let summary = indexer.remap()?;
            if summary.applied {
                println!("✅ Mapping applied ({} fields)", summary.fields);
            } else {
                println!("⚠️  Nothing to map; the current mapping was kept");
            }
            for issue in &summary.issues {
                println!("  ⚠️  {issue}");
            }
        }
        Command::Reindex => reindex(&indexer)?,
        Command::Clear => {
            indexer.clear()?;
            println!("✅ Index cleared");
        }
        Command::Mapping => match indexer.engine().mapping()? {
            Some(schema) => println!("{}", serde_json::to_string_pretty(&MappingBuilder::to_mapping_json(&schema))?),
            None => println!("No mapping yet; run `postindex remap`"),
        },
        Command::Count => println!("{}", indexer.engine().count()?),
        Command::UpdateByQuery { criteria, values } => {
            let summary = indexer.update_by_query(&to_values(criteria), &to_values(values))?;
            print_summary("Update by query", &summary);
        }
        Command::Upsert { content_type, id } => {
            indexer.on_record_saved(&content_type, id)?;
            println!("✅ {}", DocKey::new(content_type, id));
        }
        Command::Delete { content_type, id } => {
            let key = DocKey::new(content_type, id);
            indexer.on_record_deleted(&key)?;
            println!("🗑️  {key}");
        }
    }
    Ok(())
}
