use std::collections::HashMap;

use crate::core::{NfseError, normalize_text, tables};
use crate::workbook::{Cell, Sheet};

/// Reference column holding the IBGE state code.
pub const REF_UF_COLUMN: &str = "uf";
/// Reference column holding the city name.
pub const REF_CITY_COLUMN: &str = "cidade";
/// Reference column holding the municipality code.
pub const REF_CODE_COLUMN: &str = "codigo municipio";

/// Lookup key shared by reference rows and uploaded rows: `city/uf`, normalized.
pub fn municipality_key(city: &str, uf: &str) -> String {
    format!("{}/{}", normalize_text(city), normalize_text(uf))
}

/// Normalized `city/uf` key → IBGE municipality code.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    codes: HashMap<String, String>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entry from a numeric IBGE state code.
    pub fn insert(
        &mut self,
        city: &str,
        state_code: i64,
        municipio: impl Into<String>,
    ) -> Result<(), NfseError> {
        let uf = tables::uf_for_code(state_code).ok_or(NfseError::UnknownStateCode(state_code))?;
        self.codes
            .insert(municipality_key(city, uf), municipio.into());
        Ok(())
    }

    /// Build from the territorial report sheet.
    ///
    /// Headers are matched ignoring accents and case (`UF`, `Cidade`,
    /// `Código Município`). Rows without a city or a code are skipped.
    pub fn from_sheet(sheet: &Sheet) -> Result<Self, NfseError> {
        let find = |wanted: &str| -> Result<String, NfseError> {
            sheet
                .columns()
                .iter()
                .find(|c| normalize_text(c) == wanted)
                .cloned()
                .ok_or_else(|| {
                    NfseError::Reference(format!(
                        "column '{wanted}' not found in reference sheet '{}'",
                        sheet.name()
                    ))
                })
        };
        let uf_col = find(REF_UF_COLUMN)?;
        let city_col = find(REF_CITY_COLUMN)?;
        let code_col = find(REF_CODE_COLUMN)?;

        let mut table = Self::new();
        for row in 0..sheet.len() {
            let city = sheet.text(row, &city_col);
            let code = sheet.text(row, &code_col);
            if city.is_empty() || code.is_empty() {
                continue;
            }
            let state = sheet
                .get(row, &uf_col)
                .and_then(Cell::as_u64)
                .and_then(|c| i64::try_from(c).ok())
                .ok_or_else(|| {
                    NfseError::Reference(format!(
                        "row {} has a non-numeric state code {:?}",
                        row + 1,
                        sheet.text(row, &uf_col)
                    ))
                })?;
            table.insert(&city, state, code)?;
        }
        tracing::debug!(entries = table.len(), "reference table built");
        Ok(table)
    }

    /// Load the first sheet of a reference workbook.
    #[cfg(feature = "xlsx")]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, NfseError> {
        let path = path.as_ref();
        let workbook = crate::workbook::Workbook::open(path)?;
        let sheet = workbook.sheets().first().ok_or_else(|| {
            NfseError::Reference(format!("{} has no sheets", path.display()))
        })?;
        Self::from_sheet(sheet)
    }

    /// Municipality code for a normalized key.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.codes.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
