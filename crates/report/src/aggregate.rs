//! Rebuild a combined sheet from every numbered report sheet in a workbook.
//!
//! Each numbered sheet is read back into canonical rows (the inverse of
//! [`crate::assemble`]), the rows are concatenated in sheet-number order and
//! assembled into one aggregate sheet, replacing any earlier one.

use chrono::NaiveDate;
use clipsheet_engine::cell::{serial_to_date, CellValue};
use clipsheet_engine::sheet::Sheet;
use clipsheet_engine::workbook::Workbook;
use clipsheet_recon::normalize::{parse_flexible_date, parse_number, round_whole};
use clipsheet_recon::{CanonicalRow, Field, ReportColumn, StyleWarnings, NUMBER_PLACEHOLDER, TEXT_PLACEHOLDER};

use crate::assemble::{build, BuildOptions, ReportArtifact};
use crate::error::ReportError;
use crate::template::{Template, DEFAULT_DATA_START_ROW};

pub const DEFAULT_AGGREGATE_SHEET: &str = "LIST";

#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    pub artifact: ReportArtifact,
    pub aggregated_row_count: usize,
    pub source_sheet_count: usize,
}

/// Indices of sheets whose trimmed name is all digits, by numeric value.
pub fn numeric_sheets(workbook: &Workbook) -> Vec<usize> {
    let mut found: Vec<(usize, String)> = workbook
        .sheets()
        .iter()
        .enumerate()
        .filter_map(|(i, sheet)| {
            let name = sheet.name.trim();
            let digits = name.trim_start_matches('0');
            (!name.is_empty() && name.chars().all(|c| c.is_ascii_digit())).then(|| (i, digits.to_string()))
        })
        .collect();
    // Compare by length then lexically so long digit runs never overflow
    found.sort_by(|(ia, a), (ib, b)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)).then(ia.cmp(ib)));
    found.into_iter().map(|(i, _)| i).collect()
}

/// Read rows from 1-based `start_row` until the sequence cell is empty.
pub fn read_report_rows(sheet: &Sheet, start_row: usize) -> Vec<CanonicalRow> {
    let mut rows = Vec::new();
    let mut r = start_row.saturating_sub(1);
    while has_sequence_value(sheet.value(r, ReportColumn::Sequence as usize)) {
        let (title, url) = read_title(sheet, r);
        rows.push(CanonicalRow {
            published: read_published(sheet.value(r, ReportColumn::Published as usize)),
            outlet: read_text(sheet, r, ReportColumn::Outlet as usize),
            title,
            readership: read_count(sheet.value(r, ReportColumn::Readership as usize)),
            ad_eq: read_count(sheet.value(r, ReportColumn::AdEq as usize)),
            base: read_text(sheet, r, ReportColumn::Base as usize),
            url,
        });
        r += 1;
    }
    rows
}

/// Concatenate every numbered sheet into `options.sheet_name`.
///
/// The aggregate is built without sorting so sheet order is kept. Any sheet
/// already carrying the aggregate name (any case) is replaced.
pub fn rebuild(
    mut workbook: Workbook,
    template: &Template,
    options: &BuildOptions,
) -> Result<AggregateOutcome, ReportError> {
    let sources = numeric_sheets(&workbook);
    if sources.is_empty() {
        return Err(ReportError::NoNumericSheets);
    }

    let mut rows = Vec::new();
    for &index in &sources {
        if let Some(sheet) = workbook.sheet(index) {
            let found = read_report_rows(sheet, options.start_row);
            log::debug!("aggregate: {} rows from sheet '{}'", found.len(), sheet.name);
            rows.extend(found);
        }
    }
    if rows.is_empty() {
        return Err(ReportError::EmptyAggregate);
    }

    let removed = workbook.remove_sheets_named(&options.sheet_name);
    if removed > 0 {
        log::info!("aggregate: replacing existing '{}'", options.sheet_name);
    }

    let options = BuildOptions {
        sort_rows: false,
        style_warnings: StyleWarnings::for_rows(&rows),
        ..options.clone()
    };
    let artifact = build(&rows, &options, template, Some(workbook))?;
    log::info!(
        "aggregate: {} rows from {} sheets into '{}'",
        rows.len(),
        sources.len(),
        artifact.sheet.name
    );
    Ok(AggregateOutcome {
        artifact,
        aggregated_row_count: rows.len(),
        source_sheet_count: sources.len(),
    })
}

/// Options for an aggregate build with the default sheet name and layout.
pub fn aggregate_options(file_name: &str) -> BuildOptions {
    BuildOptions {
        sheet_name: DEFAULT_AGGREGATE_SHEET.to_string(),
        start_row: DEFAULT_DATA_START_ROW,
        file_name: file_name.to_string(),
        ..BuildOptions::default()
    }
}

fn has_sequence_value(value: &CellValue) -> bool {
    match value {
        CellValue::Empty => false,
        CellValue::Number(n) | CellValue::DateTime(n) => !n.is_nan(),
        CellValue::Text(s) => !s.trim().is_empty(),
        CellValue::Formula { cached: Some(v), .. } => has_sequence_value(v),
        CellValue::Formula { cached: None, .. } => false,
        CellValue::Bool(_) | CellValue::Error(_) => true,
    }
}

fn read_published(value: &CellValue) -> Field<NaiveDate> {
    match value.resolved() {
        CellValue::Number(n) | CellValue::DateTime(n) => serial_to_date(*n).into(),
        CellValue::Text(s) => parse_flexible_date(s).into(),
        _ => Field::Unresolved,
    }
}

fn plain_text(sheet: &Sheet, r: usize, c: usize) -> String {
    sheet.display_text(r, c).trim().to_string()
}

fn read_text(sheet: &Sheet, r: usize, c: usize) -> Field<String> {
    let text = plain_text(sheet, r, c);
    if text == TEXT_PLACEHOLDER {
        Field::Unresolved
    } else {
        Field::text(&text)
    }
}

fn read_title(sheet: &Sheet, r: usize) -> (Field<String>, Option<String>) {
    let col = ReportColumn::Title as usize;
    let url = sheet.hyperlink(r, col).map(str::to_string).filter(|u| !u.trim().is_empty());
    (read_text(sheet, r, col), url)
}

/// Numbers as stored; text parsed with `(123)` read as negative.
fn read_count(value: &CellValue) -> Field<i64> {
    match value.resolved() {
        CellValue::Number(n) => Field::Resolved(round_whole(*n)),
        CellValue::Text(s) => {
            let text = s.trim();
            if text.is_empty() || text == NUMBER_PLACEHOLDER || text == TEXT_PLACEHOLDER {
                return Field::Unresolved;
            }
            let negative = text.contains('(') && text.contains(')');
            let cleaned: String = text.chars().filter(|c| *c != '(' && *c != ')').collect();
            parse_number(&cleaned)
                .map(|n| round_whole(if negative { -n.abs() } else { n }))
                .into()
        }
        _ => Field::Unresolved,
    }
}
