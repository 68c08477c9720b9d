use crate::core::{NfseError, UnresolvedRow};
use crate::workbook::{Cell, Sheet, Workbook};

use super::reference::{ReferenceTable, municipality_key};

/// Composite column every uploaded sheet must carry.
pub const CITY_UF_COLUMN: &str = "cidade/uf";
/// Column filled with the resolved IBGE code.
pub const MUNICIPIO_COLUMN: &str = "municipio";
/// Column filled with the upper-cased state.
pub const UF_COLUMN: &str = "uf";

/// Helper columns removed once resolution succeeds.
const HELPER_COLUMNS: [&str; 3] = [CITY_UF_COLUMN, "cidade", "chave"];

/// Attach a municipality code to every row of every sheet.
///
/// Headers are normalized first. Resolution is all-or-nothing: on any
/// error the workbook is left untouched.
///
/// # Errors
///
/// - [`NfseError::MissingColumn`] when a sheet has no `cidade/uf` column
/// - [`NfseError::MalformedValue`] when a value does not split into city and UF
/// - [`NfseError::UnresolvedRows`] listing every row without a reference match
pub fn resolve_workbook(
    workbook: &mut Workbook,
    reference: &ReferenceTable,
) -> Result<(), NfseError> {
    let mut resolved = workbook.clone();
    for sheet in resolved.sheets_mut() {
        resolve_sheet(sheet, reference)?;
    }
    *workbook = resolved;
    Ok(())
}

/// Resolve one sheet in place. On error the sheet may be partially updated.
pub fn resolve_sheet(sheet: &mut Sheet, reference: &ReferenceTable) -> Result<(), NfseError> {
    tracing::info!(sheet = sheet.name(), rows = sheet.len(), "resolving municipalities");
    sheet.normalize_columns();
    if !sheet.has_column(CITY_UF_COLUMN) {
        return Err(NfseError::MissingColumn {
            sheet: sheet.name().to_string(),
            column: CITY_UF_COLUMN.to_string(),
        });
    }

    let mut resolved: Vec<(String, String)> = Vec::with_capacity(sheet.len());
    let mut unresolved = Vec::new();
    for row in 0..sheet.len() {
        let value = sheet.text(row, CITY_UF_COLUMN);
        let parts: Vec<&str> = value.split('/').collect();
        let [city, uf] = parts.as_slice() else {
            return Err(NfseError::MalformedValue {
                sheet: sheet.name().to_string(),
                row: row + 1,
                value: value.clone(),
            });
        };
        let key = municipality_key(city, uf);
        match reference.lookup(&key) {
            Some(code) => resolved.push((uf.trim().to_uppercase(), code.to_string())),
            None => {
                tracing::debug!(sheet = sheet.name(), row = row + 1, %key, "no reference match");
                unresolved.push(UnresolvedRow {
                    row: row + 1,
                    value: value.clone(),
                    key,
                });
            }
        }
    }

    if !unresolved.is_empty() {
        return Err(NfseError::UnresolvedRows {
            sheet: sheet.name().to_string(),
            rows: unresolved,
        });
    }

    for (row, (uf, code)) in resolved.into_iter().enumerate() {
        sheet.set(row, UF_COLUMN, Cell::Text(uf));
        sheet.set(row, MUNICIPIO_COLUMN, Cell::Text(code));
    }
    sheet.drop_columns(&HELPER_COLUMNS);
    Ok(())
}

/// Resolve an uploaded file against a reference file and rewrite it in place.
#[cfg(feature = "xlsx")]
pub fn resolve_file(
    upload: impl AsRef<std::path::Path>,
    reference: impl AsRef<std::path::Path>,
) -> Result<Workbook, NfseError> {
    let upload = upload.as_ref();
    tracing::info!(upload = %upload.display(), reference = %reference.as_ref().display(), "filling municipality codes");
    let table = ReferenceTable::load(reference)?;
    let mut workbook = Workbook::open(upload)?;
    resolve_workbook(&mut workbook, &table)?;
    workbook.save(upload)?;
    tracing::info!(sheets = workbook.sheets().len(), "workbook updated with municipality codes");
    Ok(workbook)
}
