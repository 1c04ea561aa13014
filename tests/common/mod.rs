#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use aep_indicators::{
    config::SchemaConfig,
    document::NormalizedDocument,
    record::{Cell, RawBatch, RawRecord},
};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("store").join("aep.sqlite")
    }
}

pub fn config(first_year: u16, last_year: u16) -> SchemaConfig {
    SchemaConfig::with_years(first_year, last_year).expect("valid year range")
}

/// Builds a batch whose records all share `headers`; cells are raw text.
pub fn text_batch(origin: &str, headers: &[&str], rows: &[&[&str]]) -> RawBatch {
    let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let records = rows
        .iter()
        .map(|row| {
            let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            RawRecord::from_row(&headers, &values)
        })
        .collect();
    RawBatch::new(origin, records)
}

pub fn raw_record(pairs: &[(&str, Cell)]) -> RawRecord {
    RawRecord::from_pairs(pairs.iter().cloned())
}

pub fn document(
    country: Option<&str>,
    metric: &str,
    unit: Option<&str>,
    values: &[(&str, f64)],
    config: &SchemaConfig,
) -> NormalizedDocument {
    let mut doc = NormalizedDocument::new(metric, config);
    doc.country = country.map(str::to_string);
    doc.unit = unit.map(str::to_string);
    for (year, value) in values {
        doc.set_year(year, Some(*value));
    }
    doc
}
