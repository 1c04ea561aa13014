//! Raw tabular records as they come out of the scraper, and the loaders that
//! turn CSV / JSON files into batches.
//!
//! A batch is one source table: records share a header shape, and the first
//! record's columns stand in for the whole batch during column detection.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::Encoding;
use serde_json::{Map, Value as JsonValue};

use crate::io_utils;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn from_text(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }

    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Cell::Empty,
            JsonValue::String(s) => Cell::from_text(s),
            JsonValue::Number(n) => n.as_f64().map_or(Cell::Empty, Cell::Number),
            other => Cell::Text(other.to_string()),
        }
    }

    /// Textual view of the cell; `None` when empty.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(format_number(*n)),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

/// Ordered column name → cell mapping. Column names keep their source casing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: Vec<(String, Cell)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Cell)>,
        K: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Convenience constructor from parallel header / text slices.
    pub fn from_row(headers: &[String], values: &[String]) -> Self {
        Self::from_pairs(
            headers
                .iter()
                .zip(values.iter().map(String::as_str).chain(std::iter::repeat("")))
                .map(|(name, value)| (name.clone(), Cell::from_text(value))),
        )
    }

    pub fn push(&mut self, column: impl Into<String>, cell: Cell) {
        self.fields.push((column.into(), cell));
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBatch {
    pub origin: String,
    pub records: Vec<RawRecord>,
}

impl RawBatch {
    pub fn new(origin: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            origin: origin.into(),
            records,
        }
    }

    /// Header shape of the batch, taken from its first record.
    pub fn columns(&self) -> Vec<String> {
        self.records
            .first()
            .map(|record| record.columns().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Appends `column` to every record that lacks it.
    pub fn fill_column(&mut self, column: &str, value: &str) {
        for record in &mut self.records {
            if !record.contains(column) {
                record.push(column, Cell::from_text(value));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
    JsonLines,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => InputFormat::Json,
            Some(ext)
                if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") =>
            {
                InputFormat::JsonLines
            }
            _ => InputFormat::Csv,
        }
    }
}

pub fn load_batch(
    path: &Path,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<RawBatch> {
    match InputFormat::from_path(path) {
        InputFormat::Csv => {
            let delimiter = io_utils::resolve_delimiter(path, delimiter);
            read_csv_batch(path, delimiter, encoding)
        }
        InputFormat::Json => read_json_batch(path),
        InputFormat::JsonLines => read_json_lines_batch(path),
    }
}

pub fn read_csv_batch(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<RawBatch> {
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter, true)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)?;
    let mut records = Vec::new();
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record =
            record.with_context(|| format!("Reading row {} in {path:?}", row_idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {} in {path:?}", row_idx + 2))?;
        records.push(RawRecord::from_row(&headers, &decoded));
    }
    Ok(RawBatch::new(path.display().to_string(), records))
}

pub fn read_json_batch(path: &Path) -> Result<RawBatch> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let value: JsonValue = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing JSON from {path:?}"))?;
    let rows = match value {
        JsonValue::Array(rows) => rows,
        JsonValue::Object(_) => vec![value],
        _ => return Err(anyhow!("Expected an array of objects in {path:?}")),
    };
    let records = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            row.as_object()
                .map(record_from_object)
                .ok_or_else(|| anyhow!("Element {idx} in {path:?} is not an object"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(RawBatch::new(path.display().to_string(), records))
}

pub fn read_json_lines_batch(path: &Path) -> Result<RawBatch> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let mut records = Vec::new();
    for (line_idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Reading line {} in {path:?}", line_idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let value: JsonValue = serde_json::from_str(&line)
            .with_context(|| format!("Parsing line {} in {path:?}", line_idx + 1))?;
        let object = value
            .as_object()
            .ok_or_else(|| anyhow!("Line {} in {path:?} is not an object", line_idx + 1))?;
        records.push(record_from_object(object));
    }
    Ok(RawBatch::new(path.display().to_string(), records))
}

fn record_from_object(object: &Map<String, JsonValue>) -> RawRecord {
    RawRecord::from_pairs(
        object
            .iter()
            .map(|(key, value)| (key.clone(), Cell::from_json(value))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_row_pads_short_rows_with_empty_cells() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let record = RawRecord::from_row(&headers, &["1".to_string()]);
        assert_eq!(record.get("a"), Some(&Cell::Text("1".to_string())));
        assert_eq!(record.get("b"), Some(&Cell::Empty));
        assert_eq!(record.get("c"), None);
    }

    #[test]
    fn json_cells_keep_numbers() {
        assert_eq!(Cell::from_json(&serde_json::json!(3.5)), Cell::Number(3.5));
        assert_eq!(Cell::from_json(&serde_json::json!(null)), Cell::Empty);
        assert_eq!(
            Cell::from_json(&serde_json::json!(true)),
            Cell::Text("true".to_string())
        );
        assert_eq!(Cell::Number(12.0).as_text().as_deref(), Some("12"));
    }

    #[test]
    fn fill_column_only_touches_records_without_it() {
        let mut batch = RawBatch::new(
            "t",
            vec![
                RawRecord::from_pairs([("metric", Cell::from_text("x"))]),
                RawRecord::from_pairs([("country", Cell::from_text("Ghana"))]),
            ],
        );
        batch.fill_column("country", "Kenya");
        assert_eq!(
            batch.records[0].get("country"),
            Some(&Cell::Text("Kenya".to_string()))
        );
        assert_eq!(
            batch.records[1].get("country"),
            Some(&Cell::Text("Ghana".to_string()))
        );
    }

    #[test]
    fn input_format_follows_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a.JSON")), InputFormat::Json);
        assert_eq!(
            InputFormat::from_path(Path::new("a.ndjson")),
            InputFormat::JsonLines
        );
        assert_eq!(InputFormat::from_path(Path::new("a.tsv")), InputFormat::Csv);
    }
}
