//! `clipsheet-report`: turns reconciled rows into a report workbook.
//!
//! The assembler stamps rows into the template layout, the aggregate
//! reconstructor reads built sheets back, and the pipeline drives both from
//! files on disk.

pub mod aggregate;
pub mod assemble;
pub mod autofit;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod style;
pub mod summary;
pub mod template;

pub use aggregate::{read_report_rows, rebuild, AggregateOutcome, DEFAULT_AGGREGATE_SHEET};
pub use assemble::{assemble, build, AssembledSheet, BuildOptions, ReportArtifact};
pub use autofit::{AutofitSettings, ColumnBounds};
pub use error::ReportError;
pub use naming::{output_file_name, suggested_sheet_name};
pub use pipeline::{BuildOutcome, BuildRequest, Reconciled, RequestGate, RequestToken, SourcePaths, SummaryTarget};
pub use template::{Template, TEMPLATE_VERSION};
