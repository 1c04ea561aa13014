//! Run configuration shared by the normalizer, the upsert engine and the
//! validation reporter.
//!
//! The year range and the required field list are derived from a single
//! [`SchemaConfig`] value so that changing the range updates every consumer
//! at once. A config can be loaded from YAML; every field is optional.

use std::{
    env,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units::UnitTable;

pub const DEFAULT_FIRST_YEAR: u16 = 2000;
pub const DEFAULT_LAST_YEAR: u16 = 2024;
pub const DEFAULT_SOURCE_NAME: &str = "Africa Energy Portal";
pub const STORE_PATH_ENV: &str = "AEP_DB_PATH";
/// Year keys are four-digit strings so they sort in calendar order.
pub const YEAR_BOUNDS: std::ops::RangeInclusive<u16> = 1000..=9999;

/// Document fields that precede the year columns, in schema order.
pub const BASE_FIELDS: [&str; 9] = [
    "country",
    "country_serial",
    "metric",
    "unit",
    "sector",
    "sub_sector",
    "sub_sub_sector",
    "source_link",
    "source",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no store path given; pass --db or set {STORE_PATH_ENV}")]
    MissingStorePath,
    #[error("year range {first}..={last} is empty")]
    EmptyYearRange { first: u16, last: u16 },
    #[error("year range {first}..={last} must lie within 1000..=9999")]
    YearOutOfBounds { first: u16, last: u16 },
    #[error("unit table entry '{0}' has no variants")]
    EmptyUnitVariants(String),
    #[error("reading config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub first_year: u16,
    pub last_year: u16,
    pub source_name: String,
    pub units: UnitTable,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            first_year: DEFAULT_FIRST_YEAR,
            last_year: DEFAULT_LAST_YEAR,
            source_name: DEFAULT_SOURCE_NAME.to_string(),
            units: UnitTable::default(),
        }
    }
}

impl SchemaConfig {
    /// Builds a config over a custom year range, keeping the other defaults.
    pub fn with_years(first_year: u16, last_year: u16) -> Result<Self, ConfigError> {
        let config = Self {
            first_year,
            last_year,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SchemaConfig = serde_yaml::from_reader(BufReader::new(file)).map_err(
            |source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
        )?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.first_year > self.last_year {
            return Err(ConfigError::EmptyYearRange {
                first: self.first_year,
                last: self.last_year,
            });
        }
        if !YEAR_BOUNDS.contains(&self.first_year) || !YEAR_BOUNDS.contains(&self.last_year) {
            return Err(ConfigError::YearOutOfBounds {
                first: self.first_year,
                last: self.last_year,
            });
        }
        if let Some(entry) = self.units.entries().iter().find(|e| e.variants.is_empty()) {
            return Err(ConfigError::EmptyUnitVariants(entry.canonical.clone()));
        }
        Ok(())
    }

    /// Year keys in ascending order, as they appear in documents and headers.
    pub fn years(&self) -> Vec<String> {
        (self.first_year..=self.last_year)
            .map(|year| year.to_string())
            .collect()
    }

    pub fn is_year(&self, column: &str) -> bool {
        column
            .parse::<u16>()
            .is_ok_and(|year| (self.first_year..=self.last_year).contains(&year))
            && column.len() == 4
    }

    /// Every key a normalized document carries: base fields then years.
    pub fn required_schema(&self) -> Vec<String> {
        BASE_FIELDS
            .iter()
            .map(|field| field.to_string())
            .chain(self.years())
            .collect()
    }
}

/// Resolves the store location from the CLI value or the environment.
pub fn resolve_store_path(provided: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = provided {
        return Ok(path.to_path_buf());
    }
    match env::var_os(STORE_PATH_ENV) {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => Err(ConfigError::MissingStorePath),
    }
}
