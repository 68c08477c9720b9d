use thiserror::Error;

/// Errors that abort processing of an upload or a sheet.
///
/// Per-row remote failures are not errors: they are recorded as failed
/// [`OutcomeRecord`](crate::core::OutcomeRecord)s and processing continues.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NfseError {
    /// A required column is absent from a sheet.
    #[error("column '{column}' is missing from sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },

    /// A `cidade/uf` value did not split into exactly two parts.
    #[error("malformed 'cidade/uf' value {value:?} in sheet '{sheet}', row {row}")]
    MalformedValue {
        sheet: String,
        row: usize,
        value: String,
    },

    /// One or more rows had no matching municipality in the reference table.
    #[error("{} municipality code(s) not found in sheet '{sheet}': {}", .rows.len(), format_unresolved(.rows))]
    UnresolvedRows {
        sheet: String,
        rows: Vec<UnresolvedRow>,
    },

    /// A reference row carries a state code outside the IBGE table.
    #[error("unknown IBGE state code {0}")]
    UnknownStateCode(i64),

    /// A row cannot be turned into an RPS (e.g. no service amount).
    #[error("invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    /// The reference table is unreadable or lacks a required column.
    #[error("reference table error: {0}")]
    Reference(String),

    /// Spreadsheet read/write failure.
    #[error("workbook error: {0}")]
    Workbook(String),

    /// XML generation or parsing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// RPS / batch numbering error.
    #[error("numbering error: {0}")]
    Numbering(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Rejected upload (wrong extension, empty name, missing file part).
    #[error("upload rejected: {0}")]
    Upload(String),

    /// Export or status requested before a successful upload.
    #[error("no processed upload available for export")]
    NoUpload,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A row that could not be matched to a municipality code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRow {
    /// 1-based data row number (header excluded).
    pub row: usize,
    /// The raw `cidade/uf` cell.
    pub value: String,
    /// The normalized lookup key that missed.
    pub key: String,
}

impl std::fmt::Display for UnresolvedRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {} {:?} (key '{}')", self.row, self.value, self.key)
    }
}

fn format_unresolved(rows: &[UnresolvedRow]) -> String {
    rows.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
