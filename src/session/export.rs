use std::path::Path;

use super::aggregator::index_by_row;
use crate::core::OutcomeRecord;
use crate::core::tables::{EXPORT_COLUMNS, PROTOCOLO_COLUMN, STATUS_COLUMN};
use crate::workbook::{Cell, Workbook};

/// Merge outcomes into the resolved workbook and lay out the export columns.
///
/// Outcomes are matched by sheet name and row index, so sheets that were
/// skipped keep empty `Protocolo` / `Status Verificação` cells instead of
/// shifting later results. Every sheet and every row is kept, in order.
pub fn export_workbook(workbook: &Workbook, outcomes: &[OutcomeRecord]) -> Workbook {
    let by_row = index_by_row(outcomes);
    let sheets = workbook
        .sheets()
        .iter()
        .map(|sheet| {
            let mut merged = sheet.clone();
            merged.ensure_column(PROTOCOLO_COLUMN);
            merged.ensure_column(STATUS_COLUMN);
            for row in 0..merged.len() {
                if let Some(outcome) = by_row.get(&(sheet.name(), row)) {
                    merged.set(row, PROTOCOLO_COLUMN, Cell::text(outcome.protocolo.as_str()));
                    merged.set(
                        row,
                        STATUS_COLUMN,
                        Cell::text(outcome.status_verificacao.as_str()),
                    );
                }
            }
            merged.reindex(&EXPORT_COLUMNS)
        })
        .collect();
    Workbook::new(sheets)
}

/// `<stem>_processada.xlsx`.
pub fn export_file_name(upload_name: &str) -> String {
    let stem = Path::new(upload_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("planilha");
    format!("{stem}_processada.xlsx")
}

/// Regenerate the export of a session as `(file name, xlsx bytes)`.
#[cfg(feature = "xlsx")]
pub fn export_session(
    store: &super::SessionStore,
    id: super::SessionId,
) -> Result<(String, Vec<u8>), crate::core::NfseError> {
    let session = store.get(id)?;
    let workbook = Workbook::open(&session.upload_path)?;
    let exported = export_workbook(&workbook, session.results.records());
    tracing::info!(session = %id, sheets = exported.sheets().len(), "export generated");
    Ok((export_file_name(&session.file_name), exported.to_xlsx_bytes()?))
}
