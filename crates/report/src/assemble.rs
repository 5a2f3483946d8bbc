//! Stamp canonical rows into the template layout.

use clipsheet_engine::cell::{date_to_serial, CellValue, NumberFormat};
use clipsheet_engine::sheet::Sheet;
use clipsheet_engine::workbook::Workbook;
use clipsheet_recon::merge::sort_rows_with_permutation;
use clipsheet_recon::{
    link_target, CanonicalRow, Field, ReportColumn, StyleWarnings, NUMBER_PLACEHOLDER, TEXT_PLACEHOLDER,
};

use crate::autofit::{autofit_columns, AutofitSettings};
use crate::error::ReportError;
use crate::naming::output_file_name;
use crate::style::{apply_style_warnings, link_style};
use crate::template::{Template, DEFAULT_DATA_START_ROW, HEADLINE_CELL, PUBLISHED_DATE_FORMAT, TITLE_CELL};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Desired sheet name; made unique within the target workbook
    pub sheet_name: String,
    /// 1-based first data row
    pub start_row: usize,
    pub write_totals: bool,
    /// None disables autofit
    pub autofit: Option<AutofitSettings>,
    /// Leading number for the title cell, e.g. "7" gives "7. Headline"
    pub number_prefix: Option<String>,
    /// Replaces the template's headline cell
    pub headline: Option<String>,
    pub style_warnings: StyleWarnings,
    /// Reorder rows newest first before writing
    pub sort_rows: bool,
    pub file_name: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            sheet_name: "Report".to_string(),
            start_row: DEFAULT_DATA_START_ROW,
            write_totals: true,
            autofit: Some(AutofitSettings::default()),
            number_prefix: None,
            headline: None,
            style_warnings: StyleWarnings::default(),
            sort_rows: false,
            file_name: "report.xlsx".to_string(),
        }
    }
}

/// Where the rows landed inside the workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSheet {
    pub index: usize,
    pub name: String,
    /// 1-based first and last data rows
    pub first_row: usize,
    pub last_row: usize,
    /// 1-based totals row, when totals were written
    pub totals_row: Option<usize>,
    pub headline: Option<String>,
    pub total_readership: i64,
    pub total_ad_eq: i64,
}

impl AssembledSheet {
    pub fn row_count(&self) -> usize {
        self.last_row + 1 - self.first_row
    }
}

/// A finished document ready to be saved or offered for download.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub sheet: AssembledSheet,
}

/// Write `rows` into a new sheet of `workbook` cloned from `template`.
pub fn assemble(
    workbook: &mut Workbook,
    template: &Template,
    rows: &[CanonicalRow],
    options: &BuildOptions,
) -> Result<AssembledSheet, ReportError> {
    if rows.is_empty() {
        return Err(ReportError::NoRows);
    }
    if options.start_row == 0 {
        return Err(ReportError::Options("start_row is 1-based".to_string()));
    }
    if let Some(settings) = &options.autofit {
        settings.validate().map_err(ReportError::Options)?;
    }

    let (rows, warnings) = if options.sort_rows {
        let mut sorted = rows.to_vec();
        let new_index = sort_rows_with_permutation(&mut sorted);
        (sorted, options.style_warnings.remap(&new_index))
    } else {
        (rows.to_vec(), options.style_warnings.clone())
    };

    let index = template.import_into(workbook, &options.sheet_name)?;
    let sheet = workbook
        .sheet_mut(index)
        .ok_or_else(|| ReportError::SheetMissing(options.sheet_name.clone()))?;
    let name = sheet.name.clone();

    let first = options.start_row - 1;
    let count = rows.len();
    if count > 1 {
        sheet.insert_rows(first + 1, count - 1);
        log::debug!("assemble: inserted {} rows below row {}", count - 1, options.start_row);
    }
    // Pattern formats go down before any row is written over them
    for i in 1..count {
        sheet.copy_row_format(first, first + i, 0..ReportColumn::COUNT);
    }
    for (i, row) in rows.iter().enumerate() {
        write_row(sheet, first + i, i + 1, row);
    }

    apply_style_warnings(sheet, first, count, &warnings);
    let headline = write_headline(sheet, options);

    let total_readership = rows.iter().filter_map(|r| r.readership.resolved()).sum();
    let total_ad_eq = rows.iter().filter_map(|r| r.ad_eq.resolved()).sum();
    let last_row = options.start_row + count - 1;
    let totals_row = options.write_totals.then(|| {
        write_totals(sheet, options.start_row, last_row, total_readership, total_ad_eq);
        last_row + 1
    });

    if let Some(settings) = &options.autofit {
        autofit_columns(sheet, settings);
    }

    log::info!("assemble: wrote {count} rows to '{name}'");
    Ok(AssembledSheet {
        index,
        name,
        first_row: options.start_row,
        last_row,
        totals_row,
        headline,
        total_readership,
        total_ad_eq,
    })
}

/// Assemble into `baseline` (or a fresh workbook) and serialize.
pub fn build(
    rows: &[CanonicalRow],
    options: &BuildOptions,
    template: &Template,
    baseline: Option<Workbook>,
) -> Result<ReportArtifact, ReportError> {
    let mut workbook = baseline.unwrap_or_else(|| Workbook::from_sheets(Vec::new()));
    let sheet = assemble(&mut workbook, template, rows, options)?;
    let bytes = serialize(&workbook)?;
    Ok(ReportArtifact { file_name: output_file_name(&options.file_name), bytes, sheet })
}

pub(crate) fn serialize(workbook: &Workbook) -> Result<Vec<u8>, ReportError> {
    let (bytes, result) = clipsheet_io::export_bytes(workbook).map_err(ReportError::Export)?;
    for warning in &result.warnings {
        log::warn!("export: {warning}");
    }
    Ok(bytes)
}

fn write_row(sheet: &mut Sheet, r: usize, sequence: usize, row: &CanonicalRow) {
    sheet.set_number(r, ReportColumn::Sequence as usize, sequence as f64);

    let published = ReportColumn::Published as usize;
    match row.published.resolved() {
        Some(date) => {
            sheet.set_value(r, published, CellValue::DateTime(date_to_serial(*date)));
            sheet.cell_mut(r, published).format.number_format =
                NumberFormat::Date(PUBLISHED_DATE_FORMAT.to_string());
        }
        None => sheet.set_text(r, published, TEXT_PLACEHOLDER),
    }

    sheet.set_text(r, ReportColumn::Outlet as usize, row.outlet.display());

    let title = ReportColumn::Title as usize;
    sheet.set_text(r, title, row.title.display());
    match row.url.as_deref().and_then(link_target) {
        Some(target) => {
            let cell = sheet.cell_mut(r, title);
            cell.hyperlink = Some(target);
            cell.format = link_style(&cell.format);
        }
        None => sheet.set_hyperlink(r, title, None),
    }

    write_count(sheet, r, ReportColumn::Readership as usize, &row.readership, NumberFormat::thousands());
    write_count(sheet, r, ReportColumn::AdEq as usize, &row.ad_eq, NumberFormat::whole_currency());
    sheet.set_text(r, ReportColumn::Base as usize, row.base.display());
}

fn write_count(sheet: &mut Sheet, r: usize, col: usize, value: &Field<i64>, default_format: NumberFormat) {
    match value.resolved() {
        Some(n) => sheet.set_number(r, col, *n as f64),
        None => sheet.set_text(r, col, NUMBER_PLACEHOLDER),
    }
    let format = &mut sheet.cell_mut(r, col).format;
    if format.number_format == NumberFormat::General {
        format.number_format = default_format;
    }
}

/// Returns the headline in effect after the override is applied.
fn write_headline(sheet: &mut Sheet, options: &BuildOptions) -> Option<String> {
    let override_text = options.headline.as_deref().map(str::trim).filter(|h| !h.is_empty());
    let headline = match override_text {
        Some(text) => {
            sheet.set_text(HEADLINE_CELL.0, HEADLINE_CELL.1, text);
            text.to_string()
        }
        None => sheet.display_text(HEADLINE_CELL.0, HEADLINE_CELL.1).trim().to_string(),
    };
    if headline.is_empty() {
        return None;
    }
    if let Some(prefix) = options.number_prefix.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        sheet.set_text(TITLE_CELL.0, TITLE_CELL.1, &format!("{prefix}. {headline}"));
    }
    Some(headline)
}

fn write_totals(sheet: &mut Sheet, first_row: usize, last_row: usize, readership: i64, ad_eq: i64) {
    let totals = last_row;
    for (col, letter, cached) in [
        (ReportColumn::Readership as usize, 'E', readership),
        (ReportColumn::AdEq as usize, 'F', ad_eq),
    ] {
        sheet.set_value(
            totals,
            col,
            CellValue::formula(
                format!("SUM({letter}{first_row}:{letter}{last_row})"),
                Some(CellValue::Number(cached as f64)),
            ),
        );
    }
}
