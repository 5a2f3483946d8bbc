// Spreadsheet I/O: xlsx/xls/ods import, xlsx export, text decoding

pub mod error;
pub mod text;
pub mod xlsx;
pub mod xlsx_styles;

pub use error::IoError;
pub use text::{decode_text, read_text_file};
pub use xlsx::{export_bytes, export_file, import_bytes, import_file, ExportResult, ImportResult};
