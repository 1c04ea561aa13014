use aep_indicators::{
    coerce::{coerce_cell, coerce_text},
    record::Cell,
    units::UnitTable,
};
use proptest::prelude::*;

fn with_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::new();
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[test]
fn annotated_values_keep_their_leading_number() {
    assert_eq!(coerce_text("<5%"), Some(5.0));
    assert_eq!(coerce_text("-0.75 (revised)"), Some(-0.75));
    assert_eq!(coerce_text("approx. 12"), Some(12.0));
    assert_eq!(coerce_text("not reported"), None);
}

#[test]
fn cells_of_every_kind_coerce() {
    assert_eq!(coerce_cell(None), None);
    assert_eq!(coerce_cell(Some(&Cell::Empty)), None);
    assert_eq!(coerce_cell(Some(&Cell::Number(3.5))), Some(3.5));
    assert_eq!(coerce_cell(Some(&Cell::Number(f64::INFINITY))), None);
    assert_eq!(
        coerce_cell(Some(&Cell::Text("2,500 (est)".to_string()))),
        Some(2500.0)
    );
}

#[test]
fn unit_labels_map_to_canonical_forms() {
    let units = UnitTable::default();
    assert_eq!(units.normalize(Some("Percentage")).as_deref(), Some("%"));
    assert_eq!(units.normalize(Some(" GWh ")).as_deref(), Some("GWh"));
    assert_eq!(units.normalize(Some("Megawatt")).as_deref(), Some("MW"));
    assert_eq!(
        units.normalize(Some("kWh/capita")).as_deref(),
        Some("kWh per capita")
    );
    assert_eq!(units.normalize(Some("Kilotonnes")).as_deref(), Some("kt"));
    assert_eq!(
        units.normalize(Some("  USD million ")).as_deref(),
        Some("USD million")
    );
    assert_eq!(units.normalize(Some("   ")), None);
    assert_eq!(units.normalize(None), None);
}

proptest! {
    #[test]
    fn thousands_formatted_integers_parse(
        value in 1_000u64..1_000_000_000,
        note in "(est|p|revised)",
    ) {
        let raw = format!("{} ({note})", with_thousands(value));
        prop_assert_eq!(coerce_text(&raw), Some(value as f64));
    }

    #[test]
    fn plain_decimals_round_trip(value in -1.0e6f64..1.0e6) {
        let raw = format!("{value}");
        prop_assert_eq!(coerce_text(&raw), Some(value));
    }

    #[test]
    fn arbitrary_text_never_yields_non_finite(raw in ".{0,24}") {
        if let Some(value) = coerce_text(&raw) {
            prop_assert!(value.is_finite());
        }
    }
}
