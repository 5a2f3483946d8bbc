// Spreadsheet import (xlsx, xls, ods) and xlsx export.
//
// Import: calamine supplies values, cached results and formulas; for xlsx
//         packages the style/layout layer from xlsx_styles is applied on top.
// Export: rust_xlsxwriter, always to an in-memory buffer. Callers decide
//         whether the bytes go to disk.

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use clipsheet_engine::cell::{
    Alignment, BorderStyle, CellFormat, CellValue, NumberFormat, TextOverflow,
    VerticalAlignment,
};
use clipsheet_engine::sheet::{cell_address, MergedRegion, Sheet};
use clipsheet_engine::workbook::Workbook;
use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, FormatUnderline, Formula, Url,
    Workbook as XlsxWorkbook, Worksheet,
};

use crate::error::IoError;
use crate::xlsx_styles::{self, SheetLayout, StyleTable};

/// Maximum cells to import before giving up on a workbook
const MAX_CELLS: usize = 5_000_000;

/// Import caps per sheet
const MAX_ROWS: usize = 65536;
const MAX_COLS: usize = 256;

/// Excel pads stored column widths by 5px on a 7px digit; undo that so a
/// load/save cycle does not grow columns.
const DIGIT_WIDTH_PX: f64 = 7.0;
const COLUMN_PADDING_PX: f64 = 5.0;

/// Statistics from an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub sheets_imported: usize,
    pub cells_imported: usize,
    pub formulas_imported: usize,
    pub dates_imported: usize,
    pub styles_imported: usize,
    pub merges_imported: usize,
    pub hyperlinks_imported: usize,
    pub truncated: bool,
    pub warnings: Vec<String>,
    pub import_duration_ms: u128,
}

impl ImportResult {
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "{} sheet{}, {} cells",
            self.sheets_imported,
            if self.sheets_imported == 1 { "" } else { "s" },
            self.cells_imported
        )];
        if self.formulas_imported > 0 {
            parts.push(format!("{} formulas", self.formulas_imported));
        }
        if self.hyperlinks_imported > 0 {
            parts.push(format!("{} links", self.hyperlinks_imported));
        }
        if self.merges_imported > 0 {
            parts.push(format!("{} merges", self.merges_imported));
        }
        parts.join(", ")
    }
}

/// Statistics from an export operation
#[derive(Debug, Clone, Default)]
pub struct ExportResult {
    pub sheets_exported: usize,
    pub cells_exported: usize,
    pub formulas_exported: usize,
    pub hyperlinks_exported: usize,
    pub merges_exported: usize,
    /// Links rust_xlsxwriter refused, written as plain text instead
    pub warnings: Vec<String>,
}

// =============================================================================
// Import
// =============================================================================

/// Read a spreadsheet file from disk.
pub fn import_file(path: &Path) -> Result<(Workbook, ImportResult), IoError> {
    let bytes = std::fs::read(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    import_bytes(&bytes)
}

/// Parse spreadsheet bytes (xlsx, xls, xlsb or ods) into a workbook.
/// Styles, merges, column widths and hyperlinks are recovered for xlsx only.
pub fn import_bytes(bytes: &[u8]) -> Result<(Workbook, ImportResult), IoError> {
    let start_time = Instant::now();

    let mut source: Sheets<Cursor<Vec<u8>>> = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IoError::Open(e.to_string()))?;

    let sheet_names: Vec<String> = source.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(IoError::NoSheets);
    }

    let mut result = ImportResult::default();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for name in &sheet_names {
        let range = source.worksheet_range(name).map_err(|e| IoError::Sheet {
            sheet: name.clone(),
            message: e.to_string(),
        })?;
        let mut sheet = Sheet::new(name);

        let (height, width) = range.get_size();
        if height > MAX_ROWS || width > MAX_COLS {
            result.truncated = true;
            result.warnings.push(format!(
                "Sheet '{}' truncated from {}x{} to at most {}x{}",
                name, height, width, MAX_ROWS, MAX_COLS
            ));
        }

        let (origin_row, origin_col) = range.start().unwrap_or((0, 0));
        'rows: for (row_idx, row) in range.rows().enumerate() {
            let target_row = origin_row as usize + row_idx;
            if target_row >= MAX_ROWS {
                break;
            }
            for (col_idx, data) in row.iter().enumerate() {
                let target_col = origin_col as usize + col_idx;
                if target_col >= MAX_COLS {
                    break;
                }
                if result.cells_imported >= MAX_CELLS {
                    result.truncated = true;
                    result.warnings.push(format!("Import stopped at {} cells (limit reached)", MAX_CELLS));
                    break 'rows;
                }
                let value = convert_data(data);
                if value.is_empty() {
                    continue;
                }
                if matches!(value, CellValue::DateTime(_)) {
                    result.dates_imported += 1;
                }
                sheet.set_value(target_row, target_col, value);
                result.cells_imported += 1;
            }
        }

        if let Ok(formulas) = source.worksheet_formula(name) {
            let (origin_row, origin_col) = formulas.start().unwrap_or((0, 0));
            for (row_idx, row) in formulas.rows().enumerate() {
                for (col_idx, formula) in row.iter().enumerate() {
                    if formula.trim().is_empty() {
                        continue;
                    }
                    let (r, c) = (origin_row as usize + row_idx, origin_col as usize + col_idx);
                    if r >= MAX_ROWS || c >= MAX_COLS {
                        continue;
                    }
                    let cached = sheet.value(r, c).clone();
                    let cached = (!cached.is_empty()).then_some(cached);
                    if cached.is_none() {
                        result.cells_imported += 1;
                    }
                    sheet.set_value(r, c, CellValue::formula(formula.as_str(), cached));
                    result.formulas_imported += 1;
                }
            }
        }

        sheets.push(sheet);
        result.sheets_imported += 1;
    }

    if xlsx_styles::is_zip_package(bytes) {
        match xlsx_styles::read_package_layout(bytes, &sheet_names) {
            Ok(package) => {
                for (sheet, layout) in sheets.iter_mut().zip(&package.sheets) {
                    apply_sheet_layout(sheet, layout, &package.styles, &mut result);
                }
                for feature in package.approximations {
                    result.warnings.push(format!("{feature} approximated"));
                }
            }
            Err(e) => {
                log::warn!("styles not imported: {e}");
                result.warnings.push(format!("Formatting not imported: {e}"));
            }
        }
    }

    result.import_duration_ms = start_time.elapsed().as_millis();
    log::debug!("imported workbook: {}", result.summary());
    Ok((Workbook::from_sheets(sheets), result))
}

fn convert_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Error(format!("#{:?}", e)),
        // 1904-based workbooks are rare enough that the 1900 system is assumed
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
    }
}

fn apply_sheet_layout(sheet: &mut Sheet, layout: &SheetLayout, styles: &StyleTable, result: &mut ImportResult) {
    for &(row, col, style_id) in &layout.cell_styles {
        if let Some(format) = styles.get(style_id) {
            sheet.set_format(row, col, format.clone());
            result.styles_imported += 1;
        }
    }

    for (&col, &width) in &layout.col_widths {
        sheet.set_col_width(col, stored_width_to_chars(width));
    }
    for (&row, &height) in &layout.row_heights {
        sheet.set_row_height(row, height);
    }

    for &(sr, sc, er, ec) in &layout.merged_regions {
        if sheet.add_merge(MergedRegion::new(sr, sc, er, ec)) {
            result.merges_imported += 1;
        }
    }

    for (row, col, target) in &layout.hyperlinks {
        sheet.set_hyperlink(*row, *col, Some(target.clone()));
        result.hyperlinks_imported += 1;
    }
}

fn stored_width_to_chars(stored: f64) -> f64 {
    let chars = if stored > 1.0 + COLUMN_PADDING_PX / DIGIT_WIDTH_PX {
        (stored * DIGIT_WIDTH_PX - COLUMN_PADDING_PX) / DIGIT_WIDTH_PX
    } else {
        stored
    };
    (chars * 100.0).round() / 100.0
}

// =============================================================================
// Export
// =============================================================================

/// Serialize a workbook to xlsx bytes.
pub fn export_bytes(workbook: &Workbook) -> Result<(Vec<u8>, ExportResult), IoError> {
    let mut result = ExportResult::default();
    let mut xlsx_workbook = XlsxWorkbook::new();

    for sheet in workbook.sheets() {
        let worksheet = xlsx_workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        // Merges first: merge_range() blanks the whole range, then the origin
        // cell is overwritten below with its typed value.
        for merge in sheet.merged_regions() {
            let format = build_excel_format(&sheet.get_format(merge.start.0, merge.start.1));
            worksheet.merge_range(
                merge.start.0 as u32,
                merge.start.1 as u16,
                merge.end.0 as u32,
                merge.end.1 as u16,
                "",
                &format,
            )?;
            result.merges_exported += 1;
        }

        export_sheet_cells(sheet, worksheet, &mut result)?;

        for (col, width) in sheet.col_widths() {
            worksheet.set_column_width(col as u16, width)?;
        }
        for (row, height) in sheet.row_heights() {
            worksheet.set_row_height(row as u32, height)?;
        }

        result.sheets_exported += 1;
    }

    let bytes = xlsx_workbook.save_to_buffer()?;
    Ok((bytes, result))
}

/// Serialize a workbook and write it to disk.
pub fn export_file(workbook: &Workbook, path: &Path) -> Result<ExportResult, IoError> {
    let (bytes, result) = export_bytes(workbook)?;
    std::fs::write(path, bytes).map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(result)
}

fn export_sheet_cells(sheet: &Sheet, worksheet: &mut Worksheet, result: &mut ExportResult) -> Result<(), IoError> {
    for (&(row, col), cell) in sheet.cells_iter() {
        // Only the origin of a merged range carries a value
        if sheet.merge_at(row, col).is_some_and(|m| m.start != (row, col)) {
            continue;
        }

        let (row32, col16) = (row as u32, col as u16);
        let format = build_excel_format(&cell.format);

        if let Some(target) = &cell.hyperlink {
            let text = cell.display();
            let link = match target.strip_prefix('#') {
                Some(location) => Url::new(format!("internal:{location}")),
                None => Url::new(target.as_str()),
            };
            let link = if text.is_empty() { link } else { link.set_text(&text) };
            match worksheet.write_url_with_format(row32, col16, link, &format) {
                Ok(_) => {
                    result.hyperlinks_exported += 1;
                    result.cells_exported += 1;
                    continue;
                }
                Err(e) => {
                    result.warnings.push(format!("{}: link not written ({e})", cell_address(row, col)));
                }
            }
        }

        match &cell.value {
            CellValue::Empty => {
                if cell.format.is_default() {
                    continue;
                }
                worksheet.write_blank(row32, col16, &format)?;
            }
            CellValue::Text(s) | CellValue::Error(s) => {
                worksheet.write_string_with_format(row32, col16, s, &format)?;
            }
            CellValue::Number(n) => {
                worksheet.write_number_with_format(row32, col16, *n, &format)?;
            }
            CellValue::DateTime(n) => {
                let format = if cell.format.number_format == NumberFormat::General {
                    format.set_num_format("yyyy-mm-dd")
                } else {
                    format
                };
                worksheet.write_number_with_format(row32, col16, *n, &format)?;
            }
            CellValue::Bool(b) => {
                worksheet.write_boolean_with_format(row32, col16, *b, &format)?;
            }
            CellValue::Formula { source, cached } => {
                let mut formula = Formula::new(format!("={source}"));
                if let Some(value) = cached {
                    formula = formula.set_result(value.display(&NumberFormat::General));
                }
                worksheet.write_formula_with_format(row32, col16, formula, &format)?;
                result.formulas_exported += 1;
            }
        }
        result.cells_exported += 1;
    }
    Ok(())
}

fn xlsx_color([r, g, b, _]: [u8; 4]) -> Color {
    Color::RGB(((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
}

/// Build a rust_xlsxwriter Format from a CellFormat
fn build_excel_format(cell_format: &CellFormat) -> Format {
    let mut format = Format::new();

    if cell_format.bold {
        format = format.set_bold();
    }
    if cell_format.italic {
        format = format.set_italic();
    }
    if cell_format.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    if cell_format.strikethrough {
        format = format.set_font_strikethrough();
    }
    if let Some(size) = cell_format.font_size {
        format = format.set_font_size(size as f64);
    }
    if let Some(color) = cell_format.font_color {
        format = format.set_font_color(xlsx_color(color));
    }
    if let Some(ref family) = cell_format.font_family {
        format = format.set_font_name(family);
    }

    format = match cell_format.alignment {
        Alignment::General => format,
        Alignment::Left => format.set_align(FormatAlign::Left),
        Alignment::Center => format.set_align(FormatAlign::Center),
        Alignment::Right => format.set_align(FormatAlign::Right),
    };
    format = match cell_format.vertical_alignment {
        VerticalAlignment::Top => format.set_align(FormatAlign::Top),
        VerticalAlignment::Middle => format.set_align(FormatAlign::VerticalCenter),
        VerticalAlignment::Bottom => format,
    };
    if cell_format.text_overflow == TextOverflow::Wrap {
        format = format.set_text_wrap();
    }

    if let Some(color) = cell_format.background_color {
        format = format.set_background_color(xlsx_color(color));
    }

    let top = &cell_format.border_top;
    if top.is_set() {
        format = format.set_border_top(border_style_to_xlsx(top.style));
        if let Some(color) = top.color {
            format = format.set_border_top_color(xlsx_color(color));
        }
    }
    let right = &cell_format.border_right;
    if right.is_set() {
        format = format.set_border_right(border_style_to_xlsx(right.style));
        if let Some(color) = right.color {
            format = format.set_border_right_color(xlsx_color(color));
        }
    }
    let bottom = &cell_format.border_bottom;
    if bottom.is_set() {
        format = format.set_border_bottom(border_style_to_xlsx(bottom.style));
        if let Some(color) = bottom.color {
            format = format.set_border_bottom_color(xlsx_color(color));
        }
    }
    let left = &cell_format.border_left;
    if left.is_set() {
        format = format.set_border_left(border_style_to_xlsx(left.style));
        if let Some(color) = left.color {
            format = format.set_border_left_color(xlsx_color(color));
        }
    }

    if cell_format.number_format != NumberFormat::General {
        format = format.set_num_format(cell_format.number_format.code());
    }

    format
}

fn border_style_to_xlsx(style: BorderStyle) -> FormatBorder {
    match style {
        BorderStyle::None => FormatBorder::None,
        BorderStyle::Thin => FormatBorder::Thin,
        BorderStyle::Medium => FormatBorder::Medium,
        BorderStyle::Thick => FormatBorder::Thick,
        BorderStyle::Dashed => FormatBorder::Dashed,
        BorderStyle::Dotted => FormatBorder::Dotted,
        BorderStyle::Double => FormatBorder::Double,
    }
}
