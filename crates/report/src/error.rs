use std::path::PathBuf;

use clipsheet_io::IoError;
use clipsheet_recon::ReconError;
use thiserror::Error;

/// Structural failures that abort a build. No partial document is produced.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("template is unreadable: {0}")]
    TemplateUnreadable(String),

    #[error("worksheet '{0}' is missing after import")]
    SheetMissing(String),

    #[error("no rows to write")]
    NoRows,

    #[error(transparent)]
    Extract(#[from] ReconError),

    #[error("no numeric-named sheets were found in the workbook")]
    NoNumericSheets,

    #[error("numeric sheets do not contain any data rows")]
    EmptyAggregate,

    #[error("invalid build options: {0}")]
    Options(String),

    #[error("{stage}: cannot read {path}: {source}")]
    Read {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage}: cannot write {path}: {source}")]
    Write {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage}: {source}")]
    Import {
        stage: &'static str,
        #[source]
        source: IoError,
    },

    #[error("writing the report failed: {0}")]
    Export(#[source] IoError),
}
