//! In-memory spreadsheet model.
//!
//! A [`Workbook`] is an ordered list of [`Sheet`]s; each sheet has a header
//! row and rectangular data rows. File I/O (`.xlsx` / `.xls`) lives behind the
//! `xlsx` feature.

#[cfg(feature = "xlsx")]
mod xlsx;

use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt;

use crate::core::{InputRow, normalize_column_name};

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() { Self::Empty } else { Self::Text(s) }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Cell rendered as text; `None` for empty cells.
    ///
    /// Integral numbers print without a fractional part, so a CNPJ stored as
    /// a number comes back as `"12345678000195"`.
    pub fn as_text(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }

    /// Cell as a non-negative integer (`12`, `12.0`, `"12"`).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64 => {
                Some(*n as u64)
            }
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Cell as a decimal amount.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            // Shortest round-trip rendering, so 1234.56 stays 1234.56.
            Self::Number(n) => n.to_string().parse::<Decimal>().ok(),
            Self::Text(s) => crate::core::parse_amount(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// A named sheet: header plus data rows, all rows as wide as the header.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns: dedup_columns(columns),
            rows: Vec::new(),
        }
    }

    /// Build a sheet from a raw grid whose first row is the header.
    ///
    /// Blank header cells become `Unnamed: <n>`, repeated names get `.1`,
    /// `.2`… suffixes, and fully blank data rows are skipped.
    pub fn from_grid(name: impl Into<String>, grid: Vec<Vec<Cell>>) -> Self {
        let mut rows = grid.into_iter();
        let header: Vec<String> = rows
            .next()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, c)| c.as_text().unwrap_or_else(|| format!("Unnamed: {i}")))
            .collect();
        let mut sheet = Self::new(name, header);
        for row in rows {
            if row.iter().all(Cell::is_empty) {
                continue;
            }
            sheet.push_row(row);
        }
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Cell at a data row / column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Text of a cell, empty string when absent.
    pub fn text(&self, row: usize, column: &str) -> String {
        self.get(row, column)
            .and_then(Cell::as_text)
            .unwrap_or_default()
    }

    /// Append a data row, padded or truncated to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    /// Index of `column`, appending it (filled empty) when absent.
    pub fn ensure_column(&mut self, column: &str) -> usize {
        if let Some(idx) = self.column_index(column) {
            return idx;
        }
        self.columns.push(column.to_string());
        for row in &mut self.rows {
            row.push(Cell::Empty);
        }
        self.columns.len() - 1
    }

    /// Set a cell, appending the column if needed. Out-of-range rows are ignored.
    pub fn set(&mut self, row: usize, column: &str, value: Cell) {
        let col = self.ensure_column(column);
        if let Some(r) = self.rows.get_mut(row) {
            r[col] = value;
        }
    }

    /// Remove the named columns; unknown names are ignored.
    pub fn drop_columns(&mut self, columns: &[&str]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !columns.contains(&c.as_str()))
            .collect();
        let filter = |cells: Vec<Cell>| -> Vec<Cell> {
            cells
                .into_iter()
                .zip(&keep)
                .filter_map(|(c, k)| k.then_some(c))
                .collect()
        };
        self.columns = self
            .columns
            .drain(..)
            .zip(&keep)
            .filter_map(|(c, k)| k.then_some(c))
            .collect();
        self.rows = self.rows.drain(..).map(filter).collect();
    }

    /// Apply [`normalize_column_name`] to every header, de-duplicating the result.
    pub fn normalize_columns(&mut self) {
        let normalized = self.columns.iter().map(|c| normalize_column_name(c)).collect();
        self.columns = dedup_columns(normalized);
    }

    /// New sheet with exactly `columns`, in order; absent ones are empty.
    pub fn reindex(&self, columns: &[&str]) -> Sheet {
        let indices: Vec<Option<usize>> = columns.iter().map(|c| self.column_index(c)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|idx| idx.map(|i| row[i].clone()).unwrap_or_default())
                    .collect()
            })
            .collect();
        Sheet {
            name: self.name.clone(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// Map every data row to an [`InputRow`] using the normalized column names.
    pub fn input_rows(&self) -> Vec<InputRow> {
        (0..self.len())
            .map(|i| InputRow {
                row_index: i,
                rps: self.get(i, "rps").and_then(Cell::as_u64),
                cnpj: self.text(i, "cnpj"),
                razao: self.text(i, "razao"),
                logradouro: self.text(i, "logradouro"),
                numero: self.text(i, "numero"),
                bairro: self.text(i, "bairro"),
                cep: self.text(i, "cep"),
                uf: self.text(i, "uf"),
                municipio: self.text(i, "municipio"),
                valor: self.get(i, "valor").and_then(Cell::as_decimal),
                descricao: self.text(i, "descricao"),
            })
            .collect()
    }
}

fn dedup_columns(columns: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    columns
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut n = 1;
            while seen.contains(&candidate) {
                candidate = format!("{name}.{n}");
                n += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

/// Ordered collection of sheets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheets_mut(&mut self) -> &mut [Sheet] {
        &mut self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn push(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    /// Total data rows across all sheets.
    pub fn row_count(&self) -> usize {
        self.sheets.iter().map(Sheet::len).sum()
    }
}
