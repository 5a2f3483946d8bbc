//! `clipsheet-recon`: media-mention extraction and reconciliation.
//!
//! Pure crate: receives decoded text or an in-memory workbook, returns
//! canonical rows, issues and style warnings. No file I/O.

pub mod config;
pub mod error;
pub mod headers;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod sources;
pub mod table;
pub mod url_key;

pub use config::{ExtractPolicy, AD_EQ_READERSHIP_DIVISOR};
pub use error::ReconError;
pub use headers::SynonymTable;
pub use merge::{merge, MergeOutcome};
pub use model::{
    CanonicalRow, ExtractIssue, Field, PrimaryExtract, RedCell, ReportColumn, RowField, SecondaryExtract,
    StyleWarnings, NUMBER_PLACEHOLDER, TEXT_PLACEHOLDER,
};
pub use sources::{extract_primary, extract_secondary};
pub use url_key::{canonicalize, link_target};
