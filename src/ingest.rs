//! Loading raw tables, normalizing them and writing the result to the store.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{debug, info, warn};

use crate::{
    cli::NormalizeArgs,
    config::{self, SchemaConfig},
    country,
    io_utils,
    normalize::{self, ColumnLayout},
    record::{self, RawBatch},
    store::SqliteStore,
    upsert::{self, UpsertSummary},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub batches: usize,
    pub raw_records: usize,
    pub documents: usize,
    pub dropped: usize,
    pub upsert: UpsertSummary,
}

/// Loads every input as one batch, skipping inputs without records.
///
/// With `country_slug`, batches that carry no country column get one filled
/// with the slug's display name.
pub fn load_batches(
    inputs: &[PathBuf],
    delimiter: Option<u8>,
    encoding: &'static Encoding,
    country_slug: Option<&str>,
    config: &SchemaConfig,
) -> Result<Vec<RawBatch>> {
    let country_name = country_slug.map(|slug| {
        if !country::is_portal_country(slug) {
            warn!("'{slug}' is not a known portal country slug");
        }
        country::display_name(slug)
    });

    let mut batches = Vec::with_capacity(inputs.len());
    for input in inputs {
        let mut batch = record::load_batch(input, delimiter, encoding)
            .with_context(|| format!("Loading raw table {input:?}"))?;
        if batch.is_empty() {
            warn!("{input:?} contains no records; skipping");
            continue;
        }
        if let Some(name) = &country_name {
            if ColumnLayout::detect(&batch.columns(), config).country.is_none() {
                debug!("Filling country '{name}' into {input:?}");
                batch.fill_column("country", name);
            }
        }
        info!("Loaded {} raw record(s) from {input:?}", batch.len());
        batches.push(batch);
    }
    Ok(batches)
}

pub fn open_store(path: &Path) -> Result<SqliteStore> {
    io_utils::ensure_parent_dir(path)?;
    SqliteStore::open(path).with_context(|| format!("Opening store {path:?}"))
}

/// Normalizes `batches` and upserts the resulting documents into `store`.
pub fn ingest_batches(
    store: &mut SqliteStore,
    batches: &[RawBatch],
    config: &SchemaConfig,
) -> Result<IngestSummary> {
    let outcome = normalize::normalize_batches(batches, config);
    let documents = outcome.documents.len();
    info!(
        "Normalized {documents} document(s); dropped {} row(s) without a metric",
        outcome.dropped
    );
    let upsert = upsert::upsert_documents(store, outcome.documents, config)
        .context("Upserting normalized documents")?;
    Ok(IngestSummary {
        batches: batches.len(),
        raw_records: batches.iter().map(RawBatch::len).sum(),
        documents,
        dropped: outcome.dropped,
        upsert,
    })
}

pub fn execute(args: &NormalizeArgs) -> Result<()> {
    let config = SchemaConfig::load_or_default(args.config.as_deref())?;
    let db_path = if args.dry_run {
        None
    } else {
        Some(config::resolve_store_path(args.db.as_deref())?)
    };
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;

    let batches = load_batches(
        &args.inputs,
        args.delimiter,
        encoding,
        args.country.as_deref(),
        &config,
    )?;
    if batches.is_empty() {
        info!("No data to process");
        return Ok(());
    }

    let Some(db_path) = db_path else {
        let outcome = normalize::normalize_batches(&batches, &config);
        info!(
            "Dry run: {} document(s) from {} batch(es); {} row(s) dropped",
            outcome.documents.len(),
            batches.len(),
            outcome.dropped
        );
        return Ok(());
    };

    let mut store = open_store(&db_path)?;
    let summary = ingest_batches(&mut store, &batches, &config)?;
    info!(
        "Upserted into {db_path:?}: upserted={}, modified={}",
        summary.upsert.upserted, summary.upsert.modified
    );
    Ok(())
}
