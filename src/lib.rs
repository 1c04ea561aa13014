pub mod cli;
pub mod coerce;
pub mod config;
pub mod country;
pub mod document;
pub mod export;
pub mod ingest;
pub mod io_utils;
pub mod normalize;
pub mod record;
pub mod store;
pub mod units;
pub mod upsert;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands, RunArgs},
    config::SchemaConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("aep_indicators", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Normalize(args) => ingest::execute(&args),
        Commands::Validate(args) => validate::execute(&args),
        Commands::Export(args) => export::execute(&args),
        Commands::Run(args) => handle_run(&args),
    }
}

fn handle_run(args: &RunArgs) -> Result<()> {
    let config = SchemaConfig::load_or_default(args.config.as_deref())?;
    let db_path = config::resolve_store_path(args.db.as_deref())?;
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Running pipeline over {} input(s) into {db_path:?} (years {}-{})",
        args.inputs.len(),
        config.first_year,
        config.last_year
    );

    let batches = ingest::load_batches(
        &args.inputs,
        args.delimiter,
        encoding,
        args.country.as_deref(),
        &config,
    )?;
    let mut store = ingest::open_store(&db_path)?;
    if batches.is_empty() {
        info!("No data to process");
    } else {
        let summary = ingest::ingest_batches(&mut store, &batches, &config)?;
        info!(
            "{} raw record(s) -> {} document(s): upserted={}, modified={}, failed={}",
            summary.raw_records,
            summary.documents,
            summary.upsert.upserted,
            summary.upsert.modified,
            summary.upsert.failures.len()
        );
    }

    if let Some(backup) = &args.backup {
        let delimiter = io_utils::resolve_delimiter(backup, None);
        let written = export::write_documents(&store, &config, Some(backup), delimiter)
            .with_context(|| format!("Writing backup to {backup:?}"))?;
        info!("Backed up {written} document(s) to {backup:?}");
    }

    let outcome = validate::build_report(&store, &config).context("Building validation report")?;
    validate::log_summary(&outcome);
    io_utils::write_structured(&args.report, &outcome)
        .with_context(|| format!("Writing validation report to {:?}", args.report))?;
    info!("Validation report written to {:?}", args.report);
    Ok(())
}
