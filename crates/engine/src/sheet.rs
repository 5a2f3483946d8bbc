use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::cell::{Cell, CellFormat, CellValue};

/// Maximum sheet name length accepted by spreadsheet applications
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Characters that may not appear in a sheet name
pub const FORBIDDEN_SHEET_NAME_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Case-insensitive key used for sheet name comparisons
pub fn normalize_sheet_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn is_valid_sheet_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty()
        && trimmed.chars().count() <= MAX_SHEET_NAME_LEN
        && !trimmed.contains(FORBIDDEN_SHEET_NAME_CHARS)
        && !trimmed.starts_with('\'')
        && !trimmed.ends_with('\'')
}

/// Parse an A1 reference ("B5", "$B$5") into 0-based (row, col).
pub fn parse_cell_ref(r: &str) -> Option<(usize, usize)> {
    let r = r.trim().replace('$', "");
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = r.split_at(split);
    if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .chars()
        .fold(0usize, |acc, ch| acc * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1));
    let row: usize = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

/// Column letters for a 0-based index (0 = A, 26 = AA)
pub fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col + 1;
    while n > 0 {
        n -= 1;
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    result
}

/// 0-based (row, col) → "B5"
pub fn cell_address(row: usize, col: usize) -> String {
    format!("{}{}", col_to_letter(col), row + 1)
}

/// Rectangular merged range, inclusive on both ends, 0-based (row, col).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRegion {
    pub start: (usize, usize),
    pub end: (usize, usize),
}

impl MergedRegion {
    pub fn new(start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> Self {
        Self {
            start: (start_row.min(end_row), start_col.min(end_col)),
            end: (start_row.max(end_row), start_col.max(end_col)),
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.start.0 && row <= self.end.0 && col >= self.start.1 && col <= self.end.1
    }

    pub fn overlaps(&self, other: &MergedRegion) -> bool {
        self.start.0 <= other.end.0
            && other.start.0 <= self.end.0
            && self.start.1 <= other.end.1
            && other.start.1 <= self.end.1
    }

    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }
}

/// One worksheet: sparse cells plus the layout that travels with them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    cells: FxHashMap<(usize, usize), Cell>,
    col_widths: BTreeMap<usize, f64>,
    row_heights: BTreeMap<usize, f64>,
    merged_regions: Vec<MergedRegion>,
}

static EMPTY_VALUE: CellValue = CellValue::Empty;

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: FxHashMap::default(),
            col_widths: BTreeMap::new(),
            row_heights: BTreeMap::new(),
            merged_regions: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Cells
    // ------------------------------------------------------------------

    pub fn get_cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Mutable access, creating an empty cell if needed
    pub fn cell_mut(&mut self, row: usize, col: usize) -> &mut Cell {
        self.cells.entry((row, col)).or_default()
    }

    pub fn value(&self, row: usize, col: usize) -> &CellValue {
        self.cells.get(&(row, col)).map(|c| &c.value).unwrap_or(&EMPTY_VALUE)
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: CellValue) {
        self.cell_mut(row, col).value = value;
    }

    pub fn set_text(&mut self, row: usize, col: usize, text: &str) {
        self.set_value(row, col, CellValue::Text(text.to_string()));
    }

    pub fn set_number(&mut self, row: usize, col: usize, n: f64) {
        self.set_value(row, col, CellValue::Number(n));
    }

    pub fn get_format(&self, row: usize, col: usize) -> CellFormat {
        self.cells.get(&(row, col)).map(|c| c.format.clone()).unwrap_or_default()
    }

    pub fn set_format(&mut self, row: usize, col: usize, format: CellFormat) {
        self.cell_mut(row, col).format = format;
    }

    pub fn hyperlink(&self, row: usize, col: usize) -> Option<&str> {
        self.cells.get(&(row, col)).and_then(|c| c.hyperlink.as_deref())
    }

    pub fn set_hyperlink(&mut self, row: usize, col: usize, target: Option<String>) {
        self.cell_mut(row, col).hyperlink = target;
    }

    /// Text as a reader would see it, number format applied
    pub fn display_text(&self, row: usize, col: usize) -> String {
        self.cells.get(&(row, col)).map(Cell::display).unwrap_or_default()
    }

    pub fn clear_cell(&mut self, row: usize, col: usize) {
        self.cells.remove(&(row, col));
    }

    pub fn cells_iter(&self) -> impl Iterator<Item = (&(usize, usize), &Cell)> {
        self.cells.iter()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Last row holding any cell (value or format), if any
    pub fn max_row(&self) -> Option<usize> {
        self.cells.keys().map(|(r, _)| *r).max()
    }

    pub fn max_col(&self) -> Option<usize> {
        self.cells.keys().map(|(_, c)| *c).max()
    }

    /// Row-major snapshot of values for rows `0..=max_row`, columns `0..=max_col`
    pub fn value_rows(&self) -> Vec<Vec<&CellValue>> {
        let (Some(max_row), Some(max_col)) = (self.max_row(), self.max_col()) else {
            return Vec::new();
        };
        (0..=max_row)
            .map(|r| (0..=max_col).map(|c| self.value(r, c)).collect())
            .collect()
    }

    /// Copy every cell format in `from` onto `to` for columns `cols`,
    /// leaving values untouched.
    pub fn copy_row_format(&mut self, from: usize, to: usize, cols: std::ops::Range<usize>) {
        for col in cols {
            let format = self.get_format(from, col);
            if format.is_default() && self.get_cell(to, col).is_none() {
                continue;
            }
            self.cell_mut(to, col).format = format;
        }
        if let Some(height) = self.row_heights.get(&from).copied() {
            self.row_heights.insert(to, height);
        }
    }

    /// Insert rows at the specified position, shifting existing rows down.
    /// Row heights and merged regions move with their rows; a merge that
    /// straddles the insertion point grows.
    pub fn insert_rows(&mut self, at_row: usize, count: usize) {
        if count == 0 {
            return;
        }

        let cells_to_shift: Vec<_> = self.cells
            .keys()
            .filter(|(r, _)| *r >= at_row)
            .copied()
            .collect();
        let mut moved = Vec::with_capacity(cells_to_shift.len());
        for key in cells_to_shift {
            if let Some(cell) = self.cells.remove(&key) {
                moved.push(((key.0 + count, key.1), cell));
            }
        }
        self.cells.extend(moved);

        let heights = std::mem::take(&mut self.row_heights);
        self.row_heights = heights
            .into_iter()
            .map(|(r, h)| if r >= at_row { (r + count, h) } else { (r, h) })
            .collect();

        for region in &mut self.merged_regions {
            if region.start.0 >= at_row {
                region.start.0 += count;
                region.end.0 += count;
            } else if region.end.0 >= at_row {
                region.end.0 += count;
            }
        }
    }

    // ------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------

    pub fn col_width(&self, col: usize) -> Option<f64> {
        self.col_widths.get(&col).copied()
    }

    pub fn set_col_width(&mut self, col: usize, width: f64) {
        self.col_widths.insert(col, width);
    }

    pub fn col_widths(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.col_widths.iter().map(|(c, w)| (*c, *w))
    }

    pub fn row_height(&self, row: usize) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    pub fn set_row_height(&mut self, row: usize, height: f64) {
        self.row_heights.insert(row, height);
    }

    pub fn row_heights(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.row_heights.iter().map(|(r, h)| (*r, *h))
    }

    pub fn merged_regions(&self) -> &[MergedRegion] {
        &self.merged_regions
    }

    /// Add a merged region. Returns false (and leaves the sheet unchanged)
    /// if it is a single cell or overlaps an existing region.
    pub fn add_merge(&mut self, region: MergedRegion) -> bool {
        if region.is_single_cell() || self.merged_regions.iter().any(|m| m.overlaps(&region)) {
            return false;
        }
        self.merged_regions.push(region);
        true
    }

    /// Region containing the cell, if the cell is merged
    pub fn merge_at(&self, row: usize, col: usize) -> Option<&MergedRegion> {
        self.merged_regions.iter().find(|m| m.contains(row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_refs() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("b4"), Some((3, 1)));
        assert_eq!(parse_cell_ref("$AA$10"), Some((9, 26)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(cell_address(2, 4), "E3");
    }

    #[test]
    fn test_insert_rows_shifts_cells_heights_and_merges() {
        let mut sheet = Sheet::new("Report");
        sheet.set_text(0, 0, "title");
        sheet.set_number(2, 4, 10.0);
        sheet.set_text(3, 3, "Total");
        sheet.set_row_height(3, 22.0);
        assert!(sheet.add_merge(MergedRegion::new(0, 1, 0, 6)));
        assert!(sheet.add_merge(MergedRegion::new(3, 0, 3, 2)));
        assert!(sheet.add_merge(MergedRegion::new(2, 6, 4, 6)));

        sheet.insert_rows(3, 2);

        assert_eq!(sheet.value(2, 4), &CellValue::Number(10.0));
        assert_eq!(sheet.value(3, 3), &CellValue::Empty);
        assert_eq!(sheet.value(5, 3), &CellValue::Text("Total".into()));
        assert_eq!(sheet.row_height(5), Some(22.0));
        assert_eq!(sheet.row_height(3), None);
        let merges = sheet.merged_regions();
        assert_eq!(merges[0], MergedRegion::new(0, 1, 0, 6));
        assert_eq!(merges[1], MergedRegion::new(5, 0, 5, 2));
        assert_eq!(merges[2], MergedRegion::new(2, 6, 6, 6));
    }

    #[test]
    fn test_add_merge_rejects_overlap_and_single_cell() {
        let mut sheet = Sheet::new("S");
        assert!(sheet.add_merge(MergedRegion::new(0, 0, 1, 1)));
        assert!(!sheet.add_merge(MergedRegion::new(1, 1, 2, 2)));
        assert!(!sheet.add_merge(MergedRegion::new(5, 5, 5, 5)));
        assert_eq!(sheet.merged_regions().len(), 1);
        assert!(sheet.merge_at(1, 0).is_some());
    }

    #[test]
    fn test_copy_row_format() {
        let mut sheet = Sheet::new("S");
        let mut fmt = CellFormat::default();
        fmt.bold = true;
        sheet.set_format(2, 1, fmt.clone());
        sheet.set_row_height(2, 18.0);
        sheet.copy_row_format(2, 7, 0..7);
        assert_eq!(sheet.get_format(7, 1), fmt);
        assert!(sheet.get_cell(7, 0).is_none());
        assert_eq!(sheet.row_height(7), Some(18.0));
    }

    #[test]
    fn test_sheet_name_validation() {
        assert!(is_valid_sheet_name("Report"));
        assert!(!is_valid_sheet_name("   "));
        assert!(!is_valid_sheet_name("a/b"));
        assert!(!is_valid_sheet_name(&"x".repeat(32)));
        assert_eq!(normalize_sheet_name(" List "), "list");
    }
}
