//! Data-quality report over the normalized store: missing years per
//! document, metrics reported in more than one unit, country coverage and
//! per-year completeness.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    cli::ValidateArgs,
    config::{self, SchemaConfig},
    io_utils,
    store::{DocumentStore, SqliteStore, StoreError},
};

pub const EMPTY_STORE_MESSAGE: &str = "no documents found in final collection";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearCompleteness {
    pub non_null: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_documents: usize,
    /// `"<country>||<metric>"` → null years, for documents missing any.
    pub missing_years: BTreeMap<String, Vec<String>>,
    /// Metric → distinct units, for metrics seen with more than one unit.
    pub inconsistent_units: BTreeMap<String, Vec<String>>,
    pub countries_count: usize,
    pub countries: Vec<String>,
    pub completeness_by_year: BTreeMap<String, YearCompleteness>,
}

/// Either a report or the explicit marker for an empty store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationOutcome {
    Report(ValidationReport),
    Empty { error: String },
}

impl ValidationOutcome {
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            ValidationOutcome::Report(report) => Some(report),
            ValidationOutcome::Empty { .. } => None,
        }
    }
}

pub fn percent_of(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = part as f64 / total as f64 * 100.0;
    // Exact ties go to the even neighbour: 6.25 -> 6.2.
    (percent * 10.0).round_ties_even() / 10.0
}

pub fn missing_years_key(country: Option<&str>, metric: &str) -> String {
    format!("{}||{metric}", country.unwrap_or("None"))
}

pub fn build_report<S: DocumentStore + ?Sized>(
    store: &S,
    config: &SchemaConfig,
) -> Result<ValidationOutcome, StoreError> {
    let documents = store.find_all()?;
    if documents.is_empty() {
        return Ok(ValidationOutcome::Empty {
            error: EMPTY_STORE_MESSAGE.to_string(),
        });
    }
    let total_documents = documents.len();

    let mut missing_years = BTreeMap::new();
    let mut units_by_metric: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for doc in &documents {
        let missing = doc.missing_years(config);
        if !missing.is_empty() {
            missing_years.insert(missing_years_key(doc.country.as_deref(), &doc.metric), missing);
        }
        let units = units_by_metric.entry(doc.metric.as_str()).or_default();
        if let Some(unit) = doc.unit.as_deref().filter(|u| !u.is_empty()) {
            units.insert(unit);
        }
    }
    let inconsistent_units = units_by_metric
        .into_iter()
        .filter(|(_, units)| units.len() > 1)
        .map(|(metric, units)| {
            (
                metric.to_string(),
                units.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

    let countries = store.distinct_countries()?.into_iter().sorted().collect_vec();

    let mut completeness_by_year = BTreeMap::new();
    for year in config.years() {
        let non_null = store.count_non_null(&year)?;
        completeness_by_year.insert(
            year,
            YearCompleteness {
                non_null,
                percent: percent_of(non_null, total_documents),
            },
        );
    }

    Ok(ValidationOutcome::Report(ValidationReport {
        total_documents,
        missing_years,
        inconsistent_units,
        countries_count: countries.len(),
        countries,
        completeness_by_year,
    }))
}

pub fn log_summary(outcome: &ValidationOutcome) {
    let Some(report) = outcome.report() else {
        warn!("Validation skipped: {EMPTY_STORE_MESSAGE}");
        return;
    };
    info!(
        "{} document(s) across {} country(ies); {} with missing years",
        report.total_documents,
        report.countries_count,
        report.missing_years.len()
    );
    if !report.inconsistent_units.is_empty() {
        warn!(
            "Metrics with inconsistent units: {}",
            report.inconsistent_units.keys().join(", ")
        );
    }
    if let Some((year, least)) = report
        .completeness_by_year
        .iter()
        .min_by(|a, b| a.1.percent.total_cmp(&b.1.percent))
    {
        info!(
            "Least complete year: {year} ({}/{} = {}%)",
            least.non_null, report.total_documents, least.percent
        );
    }
}

pub fn execute(args: &ValidateArgs) -> Result<()> {
    let config = SchemaConfig::load_or_default(args.config.as_deref())?;
    let db_path = config::resolve_store_path(args.db.as_deref())?;
    let store =
        SqliteStore::open(&db_path).with_context(|| format!("Opening store {db_path:?}"))?;
    let outcome = build_report(&store, &config).context("Building validation report")?;
    log_summary(&outcome);
    io_utils::write_structured(&args.report, &outcome)
        .with_context(|| format!("Writing validation report to {:?}", args.report))?;
    info!("Validation report written to {:?}", args.report);
    Ok(())
}
