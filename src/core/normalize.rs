//! Text normalization for address matching and cell clean-up.

use rust_decimal::Decimal;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalize free text for matching: strip diacritics, lower-case,
/// collapse whitespace runs and trim.
///
/// ```
/// use nfse_lote::core::normalize_text;
///
/// assert_eq!(normalize_text("  São   Paulo "), "sao paulo");
/// assert_eq!(normalize_text(&normalize_text("Curitíba")), normalize_text("Curitíba"));
/// ```
pub fn normalize_text(text: &str) -> String {
    // Lower-casing can reintroduce a combining mark ('İ' → "i\u{307}"), so fold twice.
    fold(&fold(text))
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn fold(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Like [`normalize_text`], but a missing value stays missing.
pub fn normalize_opt(text: Option<&str>) -> Option<String> {
    text.map(normalize_text)
}

/// Normalize a spreadsheet header: keep the part before the first `_`,
/// lower-case and trim it (`"CNPJ_Tomador"` → `"cnpj"`).
pub fn normalize_column_name(name: &str) -> String {
    name.split('_')
        .next()
        .unwrap_or_default()
        .to_lowercase()
        .trim()
        .to_string()
}

/// Keep only ASCII digits (`"12.345.678/0001-95"` → `"12345678000195"`).
pub fn normalize_tax_id(id: &str) -> String {
    id.chars().filter(char::is_ascii_digit).collect()
}

/// Parse a monetary amount typed by a person.
///
/// Accepts `"1234.56"`, `"1234,56"`, `"1.234,56"` and surrounding spaces
/// or an `R$` prefix. Returns `None` for anything else.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let canonical = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };
    Decimal::from_str(&canonical).ok()
}
