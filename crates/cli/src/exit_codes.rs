//! CLI Exit Code Registry
//!
//! Single source of truth for `clipsheet` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments, invalid options)         |
//! | 3    | Settings file unreadable, malformed or invalid       |
//! | 4    | A source or workbook could not be read or parsed     |
//! | 5    | Template unreadable or its sheet could not be placed |
//! | 6    | Nothing to write (empty primary source, no rows)     |
//! | 7    | Aggregate rebuild found no numbered sheets or rows   |
//! | 8    | Output could not be serialized or written            |

use clipsheet_config::ConfigError;
use clipsheet_recon::ReconError;
use clipsheet_report::ReportError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid option values.
pub const EXIT_USAGE: u8 = 2;

/// Settings file could not be read, parsed or validated.
pub const EXIT_CONFIG: u8 = 3;

/// Primary, secondary, baseline or aggregate input unreadable.
pub const EXIT_SOURCE: u8 = 4;

/// Template unreadable, or the imported sheet went missing.
pub const EXIT_TEMPLATE: u8 = 5;

/// Primary source empty, or no rows survived extraction.
pub const EXIT_NO_ROWS: u8 = 6;

/// No numeric-named sheets, or they hold no data rows.
pub const EXIT_AGGREGATE: u8 = 7;

/// Output document could not be produced or written.
pub const EXIT_WRITE: u8 = 8;

pub fn report_exit_code(err: &ReportError) -> u8 {
    match err {
        ReportError::TemplateUnreadable(_) | ReportError::SheetMissing(_) => EXIT_TEMPLATE,
        ReportError::NoRows => EXIT_NO_ROWS,
        ReportError::Extract(ReconError::EmptyPrimary) => EXIT_NO_ROWS,
        ReportError::Extract(ReconError::NoWorksheet) => EXIT_SOURCE,
        ReportError::Extract(ReconError::Policy(_)) => EXIT_CONFIG,
        ReportError::NoNumericSheets | ReportError::EmptyAggregate => EXIT_AGGREGATE,
        ReportError::Options(_) => EXIT_USAGE,
        ReportError::Read { .. } | ReportError::Import { .. } => EXIT_SOURCE,
        ReportError::Write { .. } | ReportError::Export(_) => EXIT_WRITE,
    }
}

pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Write { .. } => EXIT_WRITE,
        _ => EXIT_CONFIG,
    }
}
