//! Normalized indicator documents and their natural key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SchemaConfig;

/// One country × metric row with a value slot for every configured year.
///
/// Serializes to a flat object whose keys are exactly
/// [`SchemaConfig::required_schema`]; absent values are explicit `null`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub country: Option<String>,
    pub country_serial: Option<u32>,
    pub metric: String,
    pub unit: Option<String>,
    pub sector: Option<String>,
    pub sub_sector: Option<String>,
    pub sub_sub_sector: Option<String>,
    pub source_link: Option<String>,
    pub source: Option<String>,
    #[serde(flatten)]
    pub years: BTreeMap<String, Option<f64>>,
}

impl NormalizedDocument {
    /// Blank document for `metric` with every configured year set to null.
    pub fn new(metric: impl Into<String>, config: &SchemaConfig) -> Self {
        Self {
            country: None,
            country_serial: None,
            metric: metric.into(),
            unit: None,
            sector: None,
            sub_sector: None,
            sub_sub_sector: None,
            source_link: None,
            source: None,
            years: config.years().into_iter().map(|y| (y, None)).collect(),
        }
    }

    pub fn year(&self, year: &str) -> Option<f64> {
        self.years.get(year).copied().flatten()
    }

    pub fn set_year(&mut self, year: &str, value: Option<f64>) {
        self.years.insert(year.to_string(), value);
    }

    /// Brings the year slots in line with `config`: missing years become
    /// null and years outside the range are dropped.
    pub fn conform(&mut self, config: &SchemaConfig) {
        let years = config.years();
        self.years.retain(|year, _| years.contains(year));
        for year in years {
            self.years.entry(year).or_insert(None);
        }
    }

    /// Years in `config` order whose value is null.
    pub fn missing_years(&self, config: &SchemaConfig) -> Vec<String> {
        config
            .years()
            .into_iter()
            .filter(|year| self.year(year).is_none())
            .collect()
    }

    pub fn natural_key(&self) -> NaturalKey {
        match &self.country {
            Some(country) if !country.is_empty() => NaturalKey::CountryMetric {
                country: country.clone(),
                metric: self.metric.clone(),
            },
            _ => NaturalKey::MetricSource {
                metric: self.metric.clone(),
                source_link: self.source_link.clone(),
            },
        }
    }
}

/// Deduplication key: `(country, metric)` when a country is known, otherwise
/// `(metric, source_link)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NaturalKey {
    CountryMetric {
        country: String,
        metric: String,
    },
    MetricSource {
        metric: String,
        source_link: Option<String>,
    },
}

impl NaturalKey {
    /// Unambiguous string form used as the store's primary key.
    pub fn encode(&self) -> String {
        let value = match self {
            NaturalKey::CountryMetric { country, metric } => {
                serde_json::json!(["country", country, metric])
            }
            NaturalKey::MetricSource {
                metric,
                source_link,
            } => serde_json::json!(["source_link", metric, source_link]),
        };
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_document_has_exact_schema_keys_in_order() {
        let config = SchemaConfig::with_years(2000, 2002).unwrap();
        let mut doc = NormalizedDocument::new("Electricity Access", &config);
        doc.set_year("2001", Some(35.0));
        let value = serde_json::to_value(&doc).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, config.required_schema().iter().collect::<Vec<_>>());
        assert!(value["country"].is_null());
        assert!(value["2000"].is_null());
        assert_eq!(value["2001"], serde_json::json!(35.0));
    }

    #[test]
    fn documents_survive_a_json_round_trip() {
        let config = SchemaConfig::with_years(2000, 2001).unwrap();
        let mut doc = NormalizedDocument::new("GDP", &config);
        doc.country = Some("Kenya".to_string());
        doc.set_year("2000", Some(12.0));
        let raw = serde_json::to_string(&doc).unwrap();
        let parsed: NormalizedDocument = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn conform_fills_and_trims_years() {
        let config = SchemaConfig::with_years(2000, 2001).unwrap();
        let mut doc = NormalizedDocument::new("GDP", &config);
        doc.years.remove("2001");
        doc.set_year("1999", Some(1.0));
        doc.conform(&config);
        assert_eq!(
            doc.years.keys().cloned().collect::<Vec<_>>(),
            vec!["2000".to_string(), "2001".to_string()]
        );
        assert_eq!(doc.year("2001"), None);
    }

    #[test]
    fn natural_key_falls_back_to_source_link() {
        let config = SchemaConfig::with_years(2000, 2000).unwrap();
        let mut doc = NormalizedDocument::new("GDP", &config);
        doc.source_link = Some("https://example.org/t".to_string());
        assert_eq!(
            doc.natural_key(),
            NaturalKey::MetricSource {
                metric: "GDP".to_string(),
                source_link: Some("https://example.org/t".to_string()),
            }
        );
        doc.country = Some("Ghana".to_string());
        assert_eq!(
            doc.natural_key().encode(),
            r#"["country","Ghana","GDP"]"#
        );
    }
}
