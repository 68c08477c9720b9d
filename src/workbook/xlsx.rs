//! `.xlsx` / `.xls` reading (calamine) and `.xlsx` writing (rust_xlsxwriter).

use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::{Workbook as XlsxWorkbook, XlsxError};
use std::path::Path;

use super::{Cell, Sheet, Workbook};
use crate::core::NfseError;

fn read_err(path: &Path, e: impl std::fmt::Display) -> NfseError {
    NfseError::Workbook(format!("cannot read {}: {e}", path.display()))
}

fn write_err(e: XlsxError) -> NfseError {
    NfseError::Workbook(format!("xlsx write error: {e}"))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Error(e) => Cell::text(e.to_string()),
    }
}

impl Workbook {
    /// Read every sheet of an `.xlsx`/`.xls` file, in file order.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NfseError> {
        let path = path.as_ref();
        let mut source = open_workbook_auto(path).map_err(|e| read_err(path, e))?;
        let mut workbook = Workbook::default();
        for name in source.sheet_names() {
            let range = source
                .worksheet_range(&name)
                .map_err(|e| read_err(path, e))?;
            let grid = range
                .rows()
                .map(|row| row.iter().map(cell_from_data).collect())
                .collect();
            workbook.push(Sheet::from_grid(name, grid));
        }
        tracing::debug!(path = %path.display(), sheets = workbook.sheets().len(), "workbook loaded");
        Ok(workbook)
    }

    /// Write the workbook to an `.xlsx` file, replacing it if present.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), NfseError> {
        let mut book = self.to_xlsx()?;
        book.save(path.as_ref()).map_err(write_err)
    }

    /// Serialize the workbook as `.xlsx` bytes.
    pub fn to_xlsx_bytes(&self) -> Result<Vec<u8>, NfseError> {
        let mut book = self.to_xlsx()?;
        book.save_to_buffer().map_err(write_err)
    }

    fn to_xlsx(&self) -> Result<XlsxWorkbook, NfseError> {
        let mut book = XlsxWorkbook::new();
        for sheet in self.sheets() {
            let ws = book.add_worksheet();
            ws.set_name(sheet.name()).map_err(write_err)?;
            for (c, name) in sheet.columns().iter().enumerate() {
                ws.write_string(0, col_index(c)?, name).map_err(write_err)?;
            }
            for (r, row) in sheet.rows().iter().enumerate() {
                let r = row_index(r + 1)?;
                for (c, cell) in row.iter().enumerate() {
                    let c = col_index(c)?;
                    match cell {
                        Cell::Empty => {}
                        Cell::Text(s) => {
                            ws.write_string(r, c, s).map_err(write_err)?;
                        }
                        Cell::Number(n) => {
                            ws.write_number(r, c, *n).map_err(write_err)?;
                        }
                        Cell::Bool(b) => {
                            ws.write_boolean(r, c, *b).map_err(write_err)?;
                        }
                    }
                }
            }
        }
        Ok(book)
    }
}

fn row_index(r: usize) -> Result<u32, NfseError> {
    u32::try_from(r).map_err(|_| NfseError::Workbook(format!("row {r} out of range")))
}

fn col_index(c: usize) -> Result<u16, NfseError> {
    u16::try_from(c).map_err(|_| NfseError::Workbook(format!("column {c} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calamine_values_map_to_cells() {
        assert_eq!(cell_from_data(&Data::Empty), Cell::Empty);
        assert_eq!(cell_from_data(&Data::String(String::new())), Cell::Empty);
        assert_eq!(cell_from_data(&Data::Int(42)), Cell::Number(42.0));
        assert_eq!(
            cell_from_data(&Data::String("Curitiba/PR".into())),
            Cell::Text("Curitiba/PR".into())
        );
    }

    #[test]
    fn writes_a_non_empty_xlsx_buffer() {
        let mut sheet = Sheet::new("simply", vec!["rps".into(), "razao".into()]);
        sheet.push_row(vec![Cell::Number(1.0), Cell::from("ACME")]);
        let bytes = Workbook::new(vec![sheet]).to_xlsx_bytes().unwrap();
        // Zip container magic.
        assert_eq!(&bytes[..2], b"PK");
    }
}
