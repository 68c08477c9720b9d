//! Fixed business-rule tables.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// IBGE state code → UF abbreviation. Closed table of the 27 federative units.
pub const UF_CODES: [(i64, &str); 27] = [
    (11, "RO"),
    (12, "AC"),
    (13, "AM"),
    (14, "RR"),
    (15, "PA"),
    (16, "AP"),
    (17, "TO"),
    (21, "MA"),
    (22, "PI"),
    (23, "CE"),
    (24, "RN"),
    (25, "PB"),
    (26, "PE"),
    (27, "AL"),
    (28, "SE"),
    (29, "BA"),
    (31, "MG"),
    (32, "ES"),
    (33, "RJ"),
    (35, "SP"),
    (41, "PR"),
    (42, "SC"),
    (43, "RS"),
    (50, "MS"),
    (51, "MT"),
    (52, "GO"),
    (53, "DF"),
];

/// Look up the UF abbreviation for an IBGE state code.
pub fn uf_for_code(code: i64) -> Option<&'static str> {
    UF_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, uf)| *uf)
}

/// Category name → ISS rate. Categories not listed use [`DEFAULT_ALIQUOTA`].
pub const ALIQUOTAS: [(&str, Decimal); 2] = [("simply", dec!(0.0253)), ("dm", dec!(0.0414))];

/// ISS rate for any category not in [`ALIQUOTAS`].
pub const DEFAULT_ALIQUOTA: Decimal = dec!(0.05);

/// ISS rate for a sheet/category name.
pub fn aliquota_for(category: &str) -> Decimal {
    ALIQUOTAS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, rate)| *rate)
        .unwrap_or(DEFAULT_ALIQUOTA)
}

/// The only category that carries a CNAE code.
pub const CNAE_CATEGORY: &str = "consultoria";
/// CNAE 8219-9/99 (office support services).
pub const CNAE_CONSULTORIA: &str = "8219999";

/// CNAE code for a category, `"0"` when none applies.
pub fn codigo_cnae_for(category: &str) -> &'static str {
    if category == CNAE_CATEGORY {
        CNAE_CONSULTORIA
    } else {
        "0"
    }
}

/// Column appended on export with the submission protocol.
pub const PROTOCOLO_COLUMN: &str = "Protocolo";
/// Column appended on export with the verification status.
pub const STATUS_COLUMN: &str = "Status Verificação";

/// Export column order. Missing columns are synthesized empty, others dropped.
pub const EXPORT_COLUMNS: [&str; 16] = [
    "vazio",
    "rps",
    "vazio.1",
    "cnpj",
    "razao",
    "logradouro",
    "numero",
    "cep",
    "bairro",
    "valor",
    "descricao",
    "obs",
    "uf",
    "municipio",
    PROTOCOLO_COLUMN,
    STATUS_COLUMN,
];
