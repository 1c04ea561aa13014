//! Heuristic mapping of heterogeneous raw tables onto the fixed document
//! schema.
//!
//! Column roles are detected once per batch from the first record's header
//! shape, using an ordered list of [`ColumnRule`]s. Each record is then
//! projected onto a [`NormalizedDocument`]; records that yield no metric are
//! dropped. Long-form (year, value) tables are not pivoted: a batch without
//! exact year columns produces documents whose year values are all null.

use log::debug;

use crate::{
    coerce::coerce_cell,
    config::SchemaConfig,
    country::country_serial,
    document::NormalizedDocument,
    record::{Cell, RawBatch, RawRecord},
};

/// Column names never used as a fallback metric label.
const METADATA_COLUMNS: [&str; 5] = ["source", "source_link", "unit", "country", "country_serial"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Country,
    Metric,
    Unit,
}

/// How ties between several matching columns are broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// The first matching column in header order wins.
    ColumnOrder,
    /// Patterns are tried in listed order; within one pattern header order wins.
    PatternOrder,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnRule {
    pub role: Role,
    pub patterns: &'static [&'static str],
    pub precedence: Precedence,
}

impl ColumnRule {
    /// Picks the column this rule assigns to its role, if any.
    pub fn select<'a>(&self, columns: &'a [String]) -> Option<&'a str> {
        let lowered: Vec<String> = columns.iter().map(|c| c.to_lowercase()).collect();
        let position = match self.precedence {
            Precedence::ColumnOrder => lowered
                .iter()
                .position(|col| self.patterns.iter().any(|p| col.contains(p))),
            Precedence::PatternOrder => self
                .patterns
                .iter()
                .find_map(|p| lowered.iter().position(|col| col.contains(p))),
        };
        position.map(|idx| columns[idx].as_str())
    }
}

pub const COLUMN_RULES: [ColumnRule; 3] = [
    ColumnRule {
        role: Role::Country,
        patterns: &["country"],
        precedence: Precedence::ColumnOrder,
    },
    ColumnRule {
        role: Role::Metric,
        patterns: &["metric", "indicator", "series", "name", "variable"],
        precedence: Precedence::PatternOrder,
    },
    ColumnRule {
        role: Role::Unit,
        patterns: &["unit", "measure"],
        precedence: Precedence::ColumnOrder,
    },
];

/// Column roles detected for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    pub columns: Vec<String>,
    pub country: Option<String>,
    pub metric: Option<String>,
    pub unit: Option<String>,
    /// `(year, column)` for each configured year that has a source column.
    pub year_columns: Vec<(String, String)>,
    pub wide_form: bool,
}

impl ColumnLayout {
    pub fn detect(columns: &[String], config: &SchemaConfig) -> Self {
        Self::detect_with_rules(columns, config, &COLUMN_RULES)
    }

    pub fn detect_with_rules(
        columns: &[String],
        config: &SchemaConfig,
        rules: &[ColumnRule],
    ) -> Self {
        let mut layout = ColumnLayout {
            columns: columns.to_vec(),
            ..ColumnLayout::default()
        };
        for rule in rules {
            let slot = match rule.role {
                Role::Country => &mut layout.country,
                Role::Metric => &mut layout.metric,
                Role::Unit => &mut layout.unit,
            };
            if slot.is_none() {
                *slot = rule.select(columns).map(str::to_string);
            }
        }

        layout.wide_form = columns.iter().any(|c| config.is_year(c));
        if layout.wide_form {
            for year in config.years() {
                let source = columns
                    .iter()
                    .find(|c| **c == year)
                    .or_else(|| columns.iter().find(|c| c.contains(year.as_str())));
                if let Some(column) = source {
                    layout.year_columns.push((year, column.clone()));
                }
            }
        }
        layout
    }
}

/// Outcome of normalizing one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub documents: Vec<NormalizedDocument>,
    pub dropped: usize,
}

pub fn normalize_batch(batch: &RawBatch, config: &SchemaConfig) -> BatchOutcome {
    let columns = batch.columns();
    let layout = ColumnLayout::detect(&columns, config);
    debug!(
        "Layout for {}: country={:?} metric={:?} unit={:?} wide_form={} year_columns={}",
        batch.origin,
        layout.country,
        layout.metric,
        layout.unit,
        layout.wide_form,
        layout.year_columns.len()
    );

    let mut outcome = BatchOutcome::default();
    for (row_idx, record) in batch.records.iter().enumerate() {
        match normalize_record(record, &layout, config) {
            Some(doc) => outcome.documents.push(doc),
            None => {
                debug!("{}: dropping row {} without a metric", batch.origin, row_idx + 1);
                outcome.dropped += 1;
            }
        }
    }
    outcome
}

/// Normalizes every batch in order, concatenating their documents.
pub fn normalize_batches(batches: &[RawBatch], config: &SchemaConfig) -> BatchOutcome {
    let mut total = BatchOutcome::default();
    for batch in batches {
        let outcome = normalize_batch(batch, config);
        total.documents.extend(outcome.documents);
        total.dropped += outcome.dropped;
    }
    total
}

pub fn normalize_record(
    record: &RawRecord,
    layout: &ColumnLayout,
    config: &SchemaConfig,
) -> Option<NormalizedDocument> {
    let metric = extract_metric(record, layout, config)?;
    let mut doc = NormalizedDocument::new(metric, config);

    doc.country = layout
        .country
        .as_deref()
        .and_then(|col| label(record.get(col)));
    doc.country_serial = country_serial(doc.country.as_deref());

    let unit_raw = layout
        .unit
        .as_deref()
        .and_then(|col| record.get(col))
        .and_then(Cell::as_text);
    doc.unit = config.units.normalize(unit_raw.as_deref());

    let passthrough = |column: &str| record.get(column).and_then(Cell::as_text);
    doc.sector = passthrough("sector");
    doc.sub_sector = passthrough("sub_sector");
    doc.sub_sub_sector = passthrough("sub_sub_sector");
    doc.source_link = passthrough("source_link");
    doc.source = passthrough("source");
    if doc.source.as_deref().is_none_or(|s| s.trim().is_empty()) {
        doc.source = Some(config.source_name.clone());
    }

    for (year, column) in &layout.year_columns {
        doc.set_year(year, coerce_cell(record.get(column)));
    }
    Some(doc)
}

fn extract_metric(
    record: &RawRecord,
    layout: &ColumnLayout,
    config: &SchemaConfig,
) -> Option<String> {
    if let Some(metric) = layout
        .metric
        .as_deref()
        .and_then(|col| label(record.get(col)))
    {
        return Some(metric);
    }
    // Some tables put the indicator name in an unlabeled first column.
    layout
        .columns
        .iter()
        .filter(|col| !config.is_year(col))
        .filter(|col| {
            !METADATA_COLUMNS
                .iter()
                .any(|meta| col.eq_ignore_ascii_case(meta))
        })
        .find_map(|col| label(record.get(col)))
}

/// Trimmed, non-empty text of a label cell; the literal `"None"` counts as
/// absent.
fn label(cell: Option<&Cell>) -> Option<String> {
    let text = cell?.as_text()?;
    let trimmed = text.trim();
    (!trimmed.is_empty() && trimmed != "None").then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn metric_rule_prefers_pattern_priority_over_column_order() {
        let config = SchemaConfig::default();
        let layout = ColumnLayout::detect(
            &columns(&["Series Name", "Indicator", "Country"]),
            &config,
        );
        assert_eq!(layout.metric.as_deref(), Some("Indicator"));
        assert_eq!(layout.country.as_deref(), Some("Country"));
    }

    #[test]
    fn unit_rule_takes_first_matching_column() {
        let config = SchemaConfig::default();
        let layout = ColumnLayout::detect(&columns(&["Measure", "Unit", "Metric"]), &config);
        assert_eq!(layout.unit.as_deref(), Some("Measure"));
    }

    #[test]
    fn annotated_year_headers_are_used_in_wide_tables() {
        let config = SchemaConfig::with_years(2000, 2002).unwrap();
        let layout = ColumnLayout::detect(
            &columns(&["Indicator", "2000", "2001 (GWh)", "2001 est"]),
            &config,
        );
        assert!(layout.wide_form);
        assert_eq!(
            layout.year_columns,
            vec![
                ("2000".to_string(), "2000".to_string()),
                ("2001".to_string(), "2001 (GWh)".to_string()),
            ]
        );
    }

    #[test]
    fn annotated_headers_alone_do_not_make_a_wide_table() {
        let config = SchemaConfig::with_years(2000, 2001).unwrap();
        let layout = ColumnLayout::detect(&columns(&["Indicator", "2000 (GWh)"]), &config);
        assert!(!layout.wide_form);
        assert!(layout.year_columns.is_empty());
    }

    #[test]
    fn label_treats_literal_none_as_absent() {
        assert_eq!(label(Some(&Cell::from_text("None"))), None);
        assert_eq!(label(Some(&Cell::from_text("  "))), None);
        assert_eq!(
            label(Some(&Cell::from_text(" Kenya "))).as_deref(),
            Some("Kenya")
        );
    }
}
