//! Lenient numeric coercion for scraped table cells.
//!
//! Cells arrive with thousands separators, footnote markers and trailing
//! annotations (`"12,345 (est)"`, `"35,0 (p)"`, `"<5%"`). Every failure
//! degrades to `None`; nothing here returns an error.

use std::sync::OnceLock;

use regex::Regex;

use crate::record::Cell;

const MISSING_MARKERS: [&str; 3] = ["nan", "n/a", "na"];

fn embedded_number() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[-+]?(?:\d+(?:\.\d+)?|\.\d+)").expect("embedded number pattern is valid")
    })
}

pub fn coerce_cell(cell: Option<&Cell>) -> Option<f64> {
    match cell? {
        Cell::Empty => None,
        Cell::Number(value) => coerce_float(*value),
        Cell::Text(text) => coerce_text(text),
    }
}

pub fn coerce_float(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

pub fn coerce_text(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || MISSING_MARKERS
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
    {
        return None;
    }

    let cleaned = strip_separators(trimmed);
    let token = cleaned.split_whitespace().next()?;
    if let Some(value) = token.parse::<f64>().ok().and_then(coerce_float) {
        return Some(value);
    }

    embedded_number()
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .and_then(coerce_float)
}

/// Removes thousands separators from the leading token.
///
/// A lone comma followed by a group that is not three digits long is a
/// decimal comma (`"35,0"`), not a separator.
fn strip_separators(text: &str) -> String {
    let (head, tail) = match text.find(char::is_whitespace) {
        Some(idx) => text.split_at(idx),
        None => (text, ""),
    };
    let head = if is_decimal_comma(head) {
        head.replacen(',', ".", 1)
    } else {
        head.replace(',', "")
    };
    format!("{head}{}", tail.replace(',', ""))
}

fn is_decimal_comma(token: &str) -> bool {
    if token.contains('.') || token.matches(',').count() != 1 {
        return false;
    }
    let Some((whole, fraction)) = token.split_once(',') else {
        return false;
    };
    let whole = whole.trim_start_matches(['-', '+']);
    let fraction_digits = fraction.chars().take_while(char::is_ascii_digit).count();
    !whole.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && fraction_digits > 0
        && fraction_digits != 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separators_and_annotations_are_dropped() {
        assert_eq!(coerce_text("12,345 (est)"), Some(12345.0));
        assert_eq!(coerce_text("1,234,567"), Some(1234567.0));
        assert_eq!(coerce_text(" 42.5 "), Some(42.5));
    }

    #[test]
    fn short_fraction_after_comma_is_decimal() {
        assert_eq!(coerce_text("35,0 (p)"), Some(35.0));
        assert_eq!(coerce_text("3,25"), Some(3.25));
    }

    #[test]
    fn missing_markers_are_absent() {
        for raw in ["", "  ", "N/A", "nan", "NA", "n/a"] {
            assert_eq!(coerce_text(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn falls_back_to_first_embedded_number() {
        assert_eq!(coerce_text("<5%"), Some(5.0));
        assert_eq!(coerce_text("approx. 45"), Some(45.0));
        assert_eq!(coerce_text("abc"), None);
        assert_eq!(coerce_text("-"), None);
    }

    #[test]
    fn non_finite_values_are_absent() {
        assert_eq!(coerce_float(f64::NAN), None);
        assert_eq!(coerce_float(f64::INFINITY), None);
        assert_eq!(coerce_text("inf"), None);
        assert_eq!(coerce_cell(Some(&Cell::Number(7.0))), Some(7.0));
        assert_eq!(coerce_cell(Some(&Cell::Empty)), None);
        assert_eq!(coerce_cell(None), None);
    }
}
