use std::path::PathBuf;

use thiserror::Error;

/// Failures reading or writing spreadsheet documents.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a spreadsheet calamine can open.
    #[error("not a readable spreadsheet: {0}")]
    Open(String),

    #[error("workbook contains no sheets")]
    NoSheets,

    #[error("failed to read sheet '{sheet}': {message}")]
    Sheet { sheet: String, message: String },

    /// Writing the output document failed.
    #[error("failed to build spreadsheet: {0}")]
    Export(String),
}

impl From<rust_xlsxwriter::XlsxError> for IoError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        IoError::Export(e.to_string())
    }
}
