//! `clipsheet-engine`: in-memory workbook model.
//!
//! Cells carry typed values, formats and hyperlinks; sheets carry the layout
//! (column widths, row heights, merged regions) that a report template
//! defines. Reading and writing documents lives in `clipsheet-io`.

pub mod cell;
pub mod sheet;
pub mod workbook;

pub use cell::{Cell, CellFormat, CellValue, NumberFormat};
pub use sheet::{MergedRegion, Sheet};
pub use workbook::Workbook;
