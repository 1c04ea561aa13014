//! Backup export of the normalized store as a flat CSV table.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::ExportArgs,
    config::{self, SchemaConfig},
    document::NormalizedDocument,
    io_utils,
    store::{DocumentStore, SqliteStore},
};

/// One CSV row per document, columns in [`SchemaConfig::required_schema`]
/// order; nulls become empty cells.
pub fn document_row(doc: &NormalizedDocument, config: &SchemaConfig) -> Vec<String> {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let mut row = vec![
        text(&doc.country),
        doc.country_serial.map(|s| s.to_string()).unwrap_or_default(),
        doc.metric.clone(),
        text(&doc.unit),
        text(&doc.sector),
        text(&doc.sub_sector),
        text(&doc.sub_sub_sector),
        text(&doc.source_link),
        text(&doc.source),
    ];
    row.extend(
        config
            .years()
            .iter()
            .map(|year| doc.year(year).map(|v| v.to_string()).unwrap_or_default()),
    );
    row
}

pub fn write_documents<S: DocumentStore + ?Sized>(
    store: &S,
    config: &SchemaConfig,
    output: Option<&Path>,
    delimiter: u8,
) -> Result<usize> {
    let documents = store.find_all().context("Reading stored documents")?;
    let mut writer = io_utils::open_csv_writer(output, delimiter)?;
    writer
        .write_record(config.required_schema())
        .context("Writing CSV header")?;
    for doc in &documents {
        writer
            .write_record(document_row(doc, config))
            .with_context(|| format!("Writing row for '{}'", doc.metric))?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(documents.len())
}

pub fn execute(args: &ExportArgs) -> Result<()> {
    let config = SchemaConfig::load_or_default(args.config.as_deref())?;
    let db_path = config::resolve_store_path(args.db.as_deref())?;
    let store =
        SqliteStore::open(&db_path).with_context(|| format!("Opening store {db_path:?}"))?;
    let output = args.output.as_deref();
    let delimiter = match output {
        Some(path) => io_utils::resolve_delimiter(path, args.delimiter),
        None => args.delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER),
    };
    let written = write_documents(&store, &config, output, delimiter)?;
    info!(
        "Exported {written} document(s) to {}",
        output
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into())
    );
    Ok(())
}
