//! Canonical unit vocabulary.
//!
//! Free-text unit labels are matched case-insensitively against an ordered
//! table of canonical units; each canonical lists the substrings that
//! identify it. Table order breaks ties. Unknown labels pass through trimmed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitEntry {
    pub canonical: String,
    pub variants: Vec<String>,
}

impl UnitEntry {
    pub fn new(canonical: &str, variants: &[&str]) -> Self {
        Self {
            canonical: canonical.to_string(),
            variants: variants.iter().map(|v| v.to_lowercase()).collect(),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.variants
            .iter()
            .any(|variant| lowered.contains(&variant.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitTable(Vec<UnitEntry>);

impl Default for UnitTable {
    fn default() -> Self {
        Self(vec![
            UnitEntry::new("%", &["%", "percent", "percentage"]),
            UnitEntry::new("GWh", &["gwh", "giga watt hour", "gwh "]),
            UnitEntry::new("MW", &["mw", "megawatt"]),
            UnitEntry::new(
                "kWh per capita",
                &["kwh per capita", "kwh/capita", "kwh per person"],
            ),
            UnitEntry::new("kt", &["kt", "kilotonnes", "kt "]),
        ])
    }
}

impl UnitTable {
    pub fn new(entries: Vec<UnitEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[UnitEntry] {
        &self.0
    }

    /// Maps a raw unit label to its canonical form.
    ///
    /// Returns `None` for absent or blank input. A label that matches no
    /// entry is returned trimmed rather than discarded.
    pub fn normalize(&self, raw: Option<&str>) -> Option<String> {
        let trimmed = raw?.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lowered = trimmed.to_lowercase();
        let canonical = self
            .0
            .iter()
            .find(|entry| entry.matches(&lowered))
            .map(|entry| entry.canonical.clone());
        Some(canonical.unwrap_or_else(|| trimmed.to_string()))
    }
}
