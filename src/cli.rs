use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_REPORT_PATH: &str = "aep_validation_report.json";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Normalize and validate Africa Energy Portal indicator tables",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Normalize raw indicator tables and upsert them into the store
    Normalize(NormalizeArgs),
    /// Write a data-quality report for the normalized store
    Validate(ValidateArgs),
    /// Export every stored document as a CSV backup
    Export(ExportArgs),
    /// Normalize, upsert, back up and validate in one pass
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Raw table files (.csv, .tsv, .json, .jsonl); each file is one batch
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// SQLite store path (falls back to AEP_DB_PATH)
    #[arg(long)]
    pub db: Option<PathBuf>,
    /// YAML file overriding the year range, source name or unit table
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Portal country slug for tables scraped without a country column
    #[arg(long)]
    pub country: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of CSV inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Normalize and report counts without touching the store
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// SQLite store path (falls back to AEP_DB_PATH)
    #[arg(long)]
    pub db: Option<PathBuf>,
    /// YAML file overriding the year range, source name or unit table
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Report destination (.json, or .yml/.yaml for YAML; '-' for stdout)
    #[arg(short = 'o', long = "report", default_value = DEFAULT_REPORT_PATH)]
    pub report: PathBuf,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// SQLite store path (falls back to AEP_DB_PATH)
    #[arg(long)]
    pub db: Option<PathBuf>,
    /// YAML file overriding the year range, source name or unit table
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Output delimiter (defaults by extension, ',' otherwise)
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Raw table files (.csv, .tsv, .json, .jsonl); each file is one batch
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// SQLite store path (falls back to AEP_DB_PATH)
    #[arg(long)]
    pub db: Option<PathBuf>,
    /// YAML file overriding the year range, source name or unit table
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Portal country slug for tables scraped without a country column
    #[arg(long)]
    pub country: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of CSV inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Report destination (.json, or .yml/.yaml for YAML)
    #[arg(short = 'o', long = "report", default_value = DEFAULT_REPORT_PATH)]
    pub report: PathBuf,
    /// Also write the normalized store to this CSV file
    #[arg(long)]
    pub backup: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
