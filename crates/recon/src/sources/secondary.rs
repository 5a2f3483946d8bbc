//! Spreadsheet source whose header row can sit anywhere in the first sheet.
//!
//! The header row is found by [`HeaderLocator`] strategies tried in order;
//! the data block runs from the row after the headers to the first blank row
//! or trailer row.

use chrono::NaiveDate;
use clipsheet_engine::cell::{serial_to_date, CellValue};
use clipsheet_engine::sheet::Sheet;
use clipsheet_engine::workbook::Workbook;

use crate::config::ExtractPolicy;
use crate::error::ReconError;
use crate::headers::{norm, resolve_headers, HeaderResolution, SynonymTable};
use crate::model::{CanonicalRow, ExtractIssue, Field, RowField, SecondaryExtract};
use crate::normalize::{collapse_whitespace, date_from_rkey, parse_flexible_date, parse_number, round_whole};

// ---------------------------------------------------------------------------
// Grid view
// ---------------------------------------------------------------------------

/// One cell as the extractor sees it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridCell {
    /// Displayed text, trimmed
    pub text: String,
    /// Numeric value when the cell holds a plain number
    pub number: Option<f64>,
    /// Calendar date when the cell holds a date
    pub date: Option<NaiveDate>,
    pub link: Option<String>,
}

impl GridCell {
    pub fn is_blank(&self) -> bool {
        self.text.is_empty() && self.number.is_none() && self.date.is_none()
    }
}

/// Row-major snapshot of a sheet's values.
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    rows: Vec<Vec<GridCell>>,
}

impl SheetGrid {
    pub fn from_sheet(sheet: &Sheet) -> Self {
        let (Some(max_row), Some(max_col)) = (sheet.max_row(), sheet.max_col()) else {
            return Self::default();
        };
        let rows = (0..=max_row)
            .map(|r| (0..=max_col).map(|c| grid_cell(sheet, r, c)).collect())
            .collect();
        Self { rows }
    }

    pub fn from_text_rows(rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|cells| {
                cells
                    .iter()
                    .map(|t| GridCell {
                        text: t.trim().to_string(),
                        ..GridCell::default()
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, r: usize) -> &[GridCell] {
        self.rows.get(r).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, r: usize, c: usize) -> Option<&GridCell> {
        self.rows.get(r).and_then(|row| row.get(c))
    }

    pub fn text(&self, r: usize, c: usize) -> &str {
        self.cell(r, c).map_or("", |cell| cell.text.as_str())
    }

    pub fn is_blank_row(&self, r: usize) -> bool {
        self.row(r).iter().all(GridCell::is_blank)
    }
}

fn grid_cell(sheet: &Sheet, row: usize, col: usize) -> GridCell {
    let Some(cell) = sheet.get_cell(row, col) else {
        return GridCell::default();
    };
    let (number, date) = match cell.value.resolved() {
        CellValue::Number(n) => (Some(*n), None),
        CellValue::DateTime(serial) => (None, serial_to_date(*serial)),
        _ => (None, None),
    };
    GridCell {
        text: cell.display().trim().to_string(),
        number,
        date,
        link: cell.hyperlink.clone(),
    }
}

// ---------------------------------------------------------------------------
// Header location
// ---------------------------------------------------------------------------

/// Where the headers and the first data row are (0-based row indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPosition {
    pub header_row: usize,
    pub first_data_row: usize,
}

/// A strategy for finding the header row.
pub trait HeaderLocator {
    fn name(&self) -> &'static str;
    fn locate(&self, grid: &SheetGrid) -> Option<HeaderPosition>;
}

/// A row holding the expected labels, in order and adjacent.
pub struct ExpectedSequence {
    labels: Vec<String>,
}

impl ExpectedSequence {
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        Self { labels: labels.iter().map(|l| norm(l.as_ref())).collect() }
    }
}

impl HeaderLocator for ExpectedSequence {
    fn name(&self) -> &'static str {
        "expected header sequence"
    }

    fn locate(&self, grid: &SheetGrid) -> Option<HeaderPosition> {
        if self.labels.is_empty() {
            return None;
        }
        (0..grid.row_count())
            .find(|&r| {
                let cells: Vec<String> = grid.row(r).iter().map(|c| norm(&c.text)).collect();
                cells.windows(self.labels.len()).any(|w| w == self.labels.as_slice())
            })
            .map(|header_row| HeaderPosition { header_row, first_data_row: header_row + 1 })
    }
}

/// The value of an anchor cell reappears in column A of the first data row;
/// the headers are the row above it.
pub struct AnchorCell {
    position: (usize, usize),
}

impl AnchorCell {
    pub fn new(position: (usize, usize)) -> Self {
        Self { position }
    }
}

impl HeaderLocator for AnchorCell {
    fn name(&self) -> &'static str {
        "anchor cell"
    }

    fn locate(&self, grid: &SheetGrid) -> Option<HeaderPosition> {
        let (anchor_row, anchor_col) = self.position;
        let anchor = grid.text(anchor_row, anchor_col);
        if anchor.is_empty() {
            return None;
        }
        let first_data_row = (1..grid.row_count())
            .filter(|&r| !(r == anchor_row && anchor_col == 0))
            .find(|&r| grid.text(r, 0) == anchor)?;
        Some(HeaderPosition { header_row: first_data_row - 1, first_data_row })
    }
}

/// Run locators in priority order; the first hit wins.
pub fn locate_header(grid: &SheetGrid, locators: &[&dyn HeaderLocator]) -> Option<(HeaderPosition, &'static str)> {
    locators
        .iter()
        .find_map(|l| l.locate(grid).map(|pos| (pos, l.name())))
}

/// Exclusive end of the data block: first blank row or trailer row.
pub fn data_end(grid: &SheetGrid, first_data_row: usize, trailer_markers: &[String]) -> usize {
    let markers: Vec<String> = trailer_markers.iter().map(|m| norm(m)).collect();
    (first_data_row..grid.row_count())
        .find(|&r| {
            if grid.is_blank_row(r) {
                return true;
            }
            let first = grid
                .row(r)
                .iter()
                .find(|c| !c.text.is_empty())
                .map(|c| norm(&c.text))
                .unwrap_or_default();
            markers.contains(&first)
        })
        .unwrap_or(grid.row_count())
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Largest positive number anywhere in the row, dates excluded.
///
/// Used only when the readership column is missing or unreadable. This is an
/// approximation: any larger figure in the row (visits, ranks, IDs) wins.
pub fn estimate_readership_from_row(cells: &[GridCell]) -> Option<f64> {
    cells
        .iter()
        .filter(|c| c.date.is_none())
        .filter_map(|c| c.number.or_else(|| parse_number(&c.text)))
        .filter(|n| *n > 0.0)
        .max_by(|a, b| a.total_cmp(b))
}

/// Extract canonical rows from the first sheet of a workbook.
pub fn extract_secondary(
    workbook: &Workbook,
    policy: &ExtractPolicy,
    synonyms: &SynonymTable,
) -> Result<SecondaryExtract, ReconError> {
    policy.validate()?;
    let sheet = workbook.sheet(0).ok_or(ReconError::NoWorksheet)?;
    let grid = SheetGrid::from_sheet(sheet);
    let mut out = SecondaryExtract::default();

    out.headline = policy
        .headline_position()
        .map(|(r, c)| grid.text(r, c).to_string())
        .filter(|h| !h.is_empty());

    if grid.row_count() == 0 {
        out.issues.push(ExtractIssue::new(0, "Empty sheet"));
        return Ok(out);
    }

    let sequence = ExpectedSequence::new(&policy.secondary_header_sequence);
    let anchor = policy.anchor_position().map(AnchorCell::new);
    let mut locators: Vec<&dyn HeaderLocator> = vec![&sequence];
    if let Some(anchor) = &anchor {
        locators.push(anchor);
    }
    let position = match locate_header(&grid, &locators) {
        Some((position, strategy)) => {
            log::debug!("secondary: header row {} found by {strategy}", position.header_row + 1);
            position
        }
        None => {
            out.issues.push(ExtractIssue::new(0, "Header row not found; using the first row"));
            HeaderPosition { header_row: 0, first_data_row: 1 }
        }
    };

    let header_labels: Vec<&str> = grid.row(position.header_row).iter().map(|c| c.text.as_str()).collect();
    let headers = resolve_headers(synonyms, &header_labels);
    let end = data_end(&grid, position.first_data_row, &policy.secondary_trailer_markers);

    let mut skipped = 0usize;
    for r in position.first_data_row..end {
        match extract_row(&grid, r, &headers, policy, &mut out) {
            Some(row) => out.rows.push(row),
            None => skipped += 1,
        }
    }

    log::info!(
        "secondary: {} rows, {} skipped, {} without a date",
        out.rows.len(),
        skipped,
        out.invalid_date_urls.len()
    );
    Ok(out)
}

fn extract_row(
    grid: &SheetGrid,
    r: usize,
    headers: &HeaderResolution,
    policy: &ExtractPolicy,
    out: &mut SecondaryExtract,
) -> Option<CanonicalRow> {
    let row_number = r + 1;
    let cell_for = |field: RowField| headers.column_of(field).and_then(|c| grid.cell(r, c));
    let text_for = |field: RowField| cell_for(field).map_or("", |c| c.text.as_str());

    let url = Some(text_for(RowField::Url).to_string())
        .filter(|u| !u.is_empty())
        .or_else(|| cell_for(RowField::Url).and_then(|c| c.link.clone()))
        .or_else(|| cell_for(RowField::Title).and_then(|c| c.link.clone()))
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    let outlet = Field::text(text_for(RowField::Outlet));
    let title = Field::text(text_for(RowField::Title));
    let base = Field::text(&collapse_whitespace(text_for(RowField::Base)));

    if url.is_none() && !outlet.is_resolved() && !title.is_resolved() && !base.is_resolved() {
        return None;
    }

    let readership = cell_for(RowField::Readership)
        .and_then(|c| c.number.or_else(|| parse_number(&c.text)))
        .or_else(|| estimate_readership_from_row(grid.row(r)))
        .map(round_whole);

    let ad_eq = cell_for(RowField::AdEq)
        .and_then(|c| c.number.or_else(|| parse_number(&c.text)))
        .map(round_whole)
        .or_else(|| readership.map(|n| policy.ad_eq_for(n)));

    let published = match cell_for(RowField::Published) {
        Some(cell) if cell.date.is_some() => cell.date,
        Some(cell) if !cell.text.is_empty() => {
            let parsed = parse_flexible_date(&cell.text);
            if parsed.is_none() {
                out.issues.push(
                    ExtractIssue::for_field(row_number, RowField::Published, "Invalid published date")
                        .with_raw(cell.text.clone()),
                );
            }
            parsed
        }
        _ => None,
    }
    .or_else(|| url.as_deref().and_then(date_from_rkey));

    if published.is_none() {
        if let Some(u) = &url {
            out.invalid_date_urls.insert(u.clone());
        }
    }

    Some(CanonicalRow {
        published: published.into(),
        outlet,
        title,
        readership: readership.into(),
        ad_eq: ad_eq.into(),
        base,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ExtractPolicy {
        ExtractPolicy::default()
    }

    fn headers_row(sheet: &mut Sheet, row: usize, labels: &[&str]) {
        for (c, label) in labels.iter().enumerate() {
            sheet.set_text(row, c, label);
        }
    }

    /// Typical export: title block, anchor id in B4, headers on row 6
    fn export_sheet() -> Sheet {
        let mut sheet = Sheet::new("Export");
        sheet.set_text(0, 1, "Acme Launch Coverage");
        sheet.set_text(3, 0, "Client");
        sheet.set_text(3, 1, "PRN-7");
        headers_row(
            &mut sheet,
            5,
            &["ID", "Outlet Name", "Headline", "Potential Audience", "Location", "URL"],
        );
        sheet.set_text(6, 0, "PRN-7");
        sheet.set_text(6, 1, "Example Times");
        sheet.set_text(6, 2, "Big Launch");
        sheet.set_number(6, 3, 150.0);
        sheet.set_text(6, 4, "  United \n States ");
        sheet.set_text(6, 5, "https://www.example.com/a/?rkey=20250115");
        sheet.set_text(7, 0, "PRN-7");
        sheet.set_text(7, 1, "Wire");
        sheet.set_text(7, 2, "No date here");
        sheet.set_text(7, 3, "2,400");
        sheet.set_text(7, 5, "https://wire.example/b");
        sheet.set_text(8, 0, "Total");
        sheet.set_number(8, 3, 2550.0);
        sheet
    }

    fn extract(sheet: Sheet) -> SecondaryExtract {
        extract_secondary(&Workbook::from_sheets(vec![sheet]), &policy(), &SynonymTable::default()).unwrap()
    }

    #[test]
    fn anchor_locates_header_and_rkey_dates_rows() {
        let out = extract(export_sheet());
        assert_eq!(out.headline.as_deref(), Some("Acme Launch Coverage"));
        assert_eq!(out.rows.len(), 2);

        let first = &out.rows[0];
        assert_eq!(first.published, Field::Resolved(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()));
        assert_eq!(first.readership, Field::Resolved(150));
        assert_eq!(first.ad_eq, Field::Resolved(50));
        assert_eq!(first.base, Field::Resolved("United States".into()));

        let second = &out.rows[1];
        assert_eq!(second.published, Field::Unresolved);
        assert_eq!(second.readership, Field::Resolved(2400));
        assert_eq!(second.base, Field::Unresolved);
        assert!(out.invalid_date_urls.contains("https://wire.example/b"));
        assert_eq!(out.invalid_date_urls.len(), 1);
    }

    #[test]
    fn expected_sequence_wins_over_anchor() {
        let mut sheet = Sheet::new("S");
        headers_row(
            &mut sheet,
            2,
            &["Date", "Outlet Name", "Headline", "Potential Audience", "Location", "URL"],
        );
        sheet.set_text(3, 0, "2025-02-01");
        sheet.set_text(3, 1, "Wire");
        sheet.set_text(3, 2, "Story");
        sheet.set_text(3, 3, "90");
        sheet.set_text(3, 4, "UK");
        sheet.set_text(3, 5, "https://w.example/s");
        let grid = SheetGrid::from_sheet(&sheet);
        let sequence = ExpectedSequence::new(&policy().secondary_header_sequence);
        let anchor = AnchorCell::new((3, 1));
        let (pos, name) = locate_header(&grid, &[&sequence, &anchor]).unwrap();
        assert_eq!(pos, HeaderPosition { header_row: 2, first_data_row: 3 });
        assert_eq!(name, "expected header sequence");

        let out = extract(sheet);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].published, Field::Resolved(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()));
        assert_eq!(out.rows[0].ad_eq, Field::Resolved(30));
    }

    #[test]
    fn anchor_strategy_alone() {
        let grid = SheetGrid::from_text_rows(&[
            &["Report", "Q1"],
            &["", ""],
            &["", ""],
            &["", "X-1"],
            &["Key", "Outlet"],
            &["X-1", "Wire"],
        ]);
        let pos = AnchorCell::new((3, 1)).locate(&grid).unwrap();
        assert_eq!(pos, HeaderPosition { header_row: 4, first_data_row: 5 });
        assert!(AnchorCell::new((0, 5)).locate(&grid).is_none());
    }

    #[test]
    fn data_block_stops_at_blank_row() {
        let grid = SheetGrid::from_text_rows(&[&["h", "h"], &["a", "1"], &["", ""], &["b", "2"]]);
        assert_eq!(data_end(&grid, 1, &[]), 2);
        let grid = SheetGrid::from_text_rows(&[&["h"], &["a"], &["  grand   TOTAL "]]);
        assert_eq!(data_end(&grid, 1, &["Grand Total".to_string()]), 2);
        let grid = SheetGrid::from_text_rows(&[&["h"], &["a"]]);
        assert_eq!(data_end(&grid, 1, &[]), 2);
    }

    #[test]
    fn rows_without_content_are_skipped_silently() {
        let mut sheet = export_sheet();
        // Only an ID and a number: no url, outlet, title or base
        sheet.set_text(7, 1, "");
        sheet.set_text(7, 2, "");
        sheet.set_text(7, 5, "");
        let out = extract(sheet);
        assert_eq!(out.rows.len(), 1);
        assert!(out.issues.is_empty());
    }

    #[test]
    fn hyperlink_supplies_missing_url() {
        let mut sheet = export_sheet();
        sheet.set_text(7, 5, "");
        sheet.set_hyperlink(7, 5, Some("https://wire.example/linked?rkey=20250201".into()));
        let out = extract(sheet);
        assert_eq!(out.rows[1].url.as_deref(), Some("https://wire.example/linked?rkey=20250201"));
        assert_eq!(out.rows[1].published, Field::Resolved(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()));
        assert!(out.invalid_date_urls.is_empty());
    }

    #[test]
    fn readership_estimate_can_pick_the_wrong_column() {
        // Readership blank; the row also carries a larger unrelated figure
        // (monthly site visits), which the estimate takes as readership.
        let mut sheet = Sheet::new("S");
        headers_row(
            &mut sheet,
            0,
            &["Date", "Outlet Name", "Headline", "Potential Audience", "Location", "URL", "Monthly Visits"],
        );
        sheet.set_text(1, 0, "2025-02-01");
        sheet.set_text(1, 1, "Wire");
        sheet.set_text(1, 2, "Story");
        sheet.set_text(1, 4, "UK");
        sheet.set_text(1, 5, "https://w.example/s");
        sheet.set_number(1, 6, 900_000.0);
        let out = extract(sheet);
        assert_eq!(out.rows[0].readership, Field::Resolved(900_000));
        assert_eq!(out.rows[0].ad_eq, Field::Resolved(300_000));
    }

    #[test]
    fn estimate_ignores_dates_and_non_positive_numbers() {
        let cells = vec![
            GridCell { date: NaiveDate::from_ymd_opt(2025, 1, 1), number: None, text: "45658".into(), link: None },
            GridCell { number: Some(-5.0), ..GridCell::default() },
            GridCell { text: "$1,200".into(), ..GridCell::default() },
            GridCell { text: "n/a".into(), ..GridCell::default() },
        ];
        assert_eq!(estimate_readership_from_row(&cells), Some(1200.0));
        assert_eq!(estimate_readership_from_row(&[]), None);
    }

    #[test]
    fn date_cells_and_unparsable_dates() {
        let mut sheet = Sheet::new("S");
        headers_row(
            &mut sheet,
            0,
            &["Date", "Outlet Name", "Headline", "Potential Audience", "Location", "URL"],
        );
        sheet.set_value(1, 0, CellValue::DateTime(45672.0));
        sheet.set_text(1, 1, "Wire");
        sheet.set_text(1, 5, "https://w.example/a");
        sheet.set_text(2, 0, "soon");
        sheet.set_text(2, 1, "Wire");
        sheet.set_text(2, 5, "https://w.example/b");
        let out = extract(sheet);
        assert_eq!(out.rows[0].published, Field::Resolved(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()));
        assert_eq!(out.rows[1].published, Field::Unresolved);
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].row, 3);
        assert!(out.invalid_date_urls.contains("https://w.example/b"));
    }

    #[test]
    fn empty_workbook_and_sheet() {
        let err = extract_secondary(&Workbook::from_sheets(vec![]), &policy(), &SynonymTable::default());
        assert!(matches!(err, Err(ReconError::NoWorksheet)));
        let out = extract(Sheet::new("Blank"));
        assert!(out.rows.is_empty());
        assert_eq!(out.issues[0].message, "Empty sheet");
    }
}
