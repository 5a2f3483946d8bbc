use clipsheet_engine::cell::CellFormat;
use clipsheet_engine::sheet::Sheet;
use clipsheet_recon::{ReportColumn, StyleWarnings};

/// Font color of flagged cells
pub const WARNING_COLOR: [u8; 4] = [255, 0, 0, 255];
/// Font color of hyperlinked titles
pub const LINK_COLOR: [u8; 4] = [0, 0, 255, 255];

/// Underline and link color, other font attributes kept.
pub fn link_style(format: &CellFormat) -> CellFormat {
    CellFormat { underline: true, font_color: Some(LINK_COLOR), ..format.clone() }
}

/// Recolor one cell's font, keeping every other attribute.
pub fn recolor(sheet: &mut Sheet, row: usize, col: usize, color: [u8; 4]) {
    sheet.cell_mut(row, col).format.font_color = Some(color);
}

/// Paint warnings onto a data block that begins at 0-based `first_row` and
/// holds `row_count` rows. Out-of-range markers are ignored.
pub fn apply_style_warnings(sheet: &mut Sheet, first_row: usize, row_count: usize, warnings: &StyleWarnings) -> usize {
    let mut painted = 0;
    for cell in &warnings.red_cells {
        if cell.row < row_count && cell.col < ReportColumn::COUNT {
            recolor(sheet, first_row + cell.row, cell.col, WARNING_COLOR);
            painted += 1;
        }
    }
    for &row in &warnings.red_rows {
        if row >= row_count {
            continue;
        }
        for col in 0..ReportColumn::COUNT {
            recolor(sheet, first_row + row, col, WARNING_COLOR);
            painted += 1;
        }
    }
    if painted > 0 {
        log::debug!("style: {painted} cells flagged");
    }
    painted
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsheet_recon::RedCell;

    #[test]
    fn recolor_keeps_font() {
        let mut sheet = Sheet::new("S");
        sheet.set_format(2, 3, CellFormat { bold: true, underline: true, ..CellFormat::default() });
        let warnings = StyleWarnings { red_cells: vec![RedCell { row: 0, col: 3 }], red_rows: vec![1, 9] };
        let painted = apply_style_warnings(&mut sheet, 2, 2, &warnings);
        assert_eq!(painted, 8);
        let format = sheet.get_format(2, 3);
        assert!(format.bold && format.underline);
        assert_eq!(format.font_color, Some(WARNING_COLOR));
        assert_eq!(sheet.get_format(3, 6).font_color, Some(WARNING_COLOR));
        assert_eq!(sheet.get_format(3, 7).font_color, None);
    }

    #[test]
    fn link_style_overrides_color_only() {
        let base = CellFormat { italic: true, font_color: Some(WARNING_COLOR), ..CellFormat::default() };
        let styled = link_style(&base);
        assert!(styled.italic && styled.underline);
        assert_eq!(styled.font_color, Some(LINK_COLOR));
    }
}
