use thiserror::Error;

/// Structural failures of the extraction stage. Row-level problems are
/// reported as [`crate::model::ExtractIssue`] values instead.
#[derive(Debug, Error)]
pub enum ReconError {
    /// The primary source has no content at all.
    #[error("primary source is empty")]
    EmptyPrimary,

    /// The secondary workbook has no worksheet to read.
    #[error("secondary source has no worksheet")]
    NoWorksheet,

    /// Extraction policy failed validation.
    #[error("invalid extract settings: {0}")]
    Policy(String),
}
