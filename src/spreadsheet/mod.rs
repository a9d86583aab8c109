//! Reading and writing client spreadsheets.

use std::path::Path;

use thiserror::Error;

mod reader;
mod writer;

pub use reader::{read_csv, read_rows, read_workbook, rows_from_grid};
pub use writer::{export_header, export_rows, write_csv, write_export, write_xlsx, SHEET_NAME};

/// Date format used for notes in exported files
pub const EXPORT_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("unsupported file type '{0}'")]
    UnsupportedFormat(String),

    #[error("workbook has no worksheet")]
    NoWorksheet,

    #[error("could not read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("could not write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Workbook,
}

impl Format {
    /// Picks the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self, SpreadsheetError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Format::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Format::Workbook),
            _ => Err(SpreadsheetError::UnsupportedFormat(ext)),
        }
    }
}
