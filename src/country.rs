//! Country identifiers: the derived `country_serial` and the portal's
//! country page slugs.

use heck::ToTitleCase;
use sha2::{Digest, Sha256};

pub const SERIAL_MODULUS: u64 = 100_000;

/// Country page slugs published by the Africa Energy Portal.
pub const PORTAL_COUNTRY_SLUGS: [&str; 53] = [
    "algeria",
    "angola",
    "benin",
    "botswana",
    "burkina-faso",
    "burundi",
    "cameroon",
    "cape-verde",
    "central-african-republic",
    "chad",
    "comoros",
    "congo",
    "djibouti",
    "egypt",
    "equatorial-guinea",
    "eritrea",
    "eswatini",
    "ethiopia",
    "gabon",
    "gambia",
    "ghana",
    "guinea",
    "guinea-bissau",
    "ivory-coast",
    "kenya",
    "lesotho",
    "liberia",
    "libya",
    "madagascar",
    "malawi",
    "mali",
    "mauritania",
    "mauritius",
    "morocco",
    "mozambique",
    "namibia",
    "niger",
    "nigeria",
    "rwanda",
    "sao-tome-and-principe",
    "senegal",
    "seychelles",
    "sierra-leone",
    "somalia",
    "south-africa",
    "south-sudan",
    "sudan",
    "tanzania",
    "togo",
    "tunisia",
    "uganda",
    "zambia",
    "zimbabwe",
];

/// Stable numeric identifier for a country name.
///
/// SHA-256 over the exact UTF-8 bytes, first eight bytes big-endian, reduced
/// modulo [`SERIAL_MODULUS`]. Identical names always map to the same serial,
/// across runs and platforms.
pub fn country_serial(country: Option<&str>) -> Option<u32> {
    let name = country?;
    if name.is_empty() {
        return None;
    }
    let digest = Sha256::digest(name.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let serial = u64::from_be_bytes(prefix) % SERIAL_MODULUS;
    u32::try_from(serial).ok()
}

pub fn is_portal_country(slug: &str) -> bool {
    PORTAL_COUNTRY_SLUGS.contains(&slug.trim().to_ascii_lowercase().as_str())
}

/// Display name for a page slug: `"burkina-faso"` → `"Burkina Faso"`.
pub fn display_name(slug: &str) -> String {
    slug.trim().to_title_case()
}
