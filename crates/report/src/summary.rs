//! One-line-per-report index kept on a `PRs` sheet in the baseline workbook.

use clipsheet_engine::cell::CellValue;
use clipsheet_engine::sheet::Sheet;
use clipsheet_engine::workbook::Workbook;

use crate::assemble::AssembledSheet;
use crate::style::link_style;

pub const DEFAULT_SUMMARY_SHEET: &str = "PRs";

/// 0-based first data row of the summary sheet (row 2)
const FIRST_DATA_ROW: usize = 1;
/// Columns written by a summary row; the rest of the row keeps its values
const COL_SEQUENCE: usize = 0;
const COL_DATE: usize = 1;
const COL_HEADLINE: usize = 2;
const COL_NOTES: usize = 3;
const COL_COUNT: usize = 4;
const COL_READERSHIP: usize = 5;
const COL_AD_EQ: usize = 6;
const COL_EXTRA: usize = 7;
const SUMMARY_COLUMNS: usize = 8;

/// Append a row describing `report` to the summary sheet named `summary_sheet`.
/// Returns the 1-based row written, or None when the workbook has no such sheet.
pub fn append_summary_row(
    workbook: &mut Workbook,
    summary_sheet: &str,
    report: &AssembledSheet,
    link: Option<&str>,
) -> Option<usize> {
    let index = workbook.sheet_index(summary_sheet)?;
    let sheet = workbook.sheet_mut(index)?;

    let mut r = FIRST_DATA_ROW;
    while !row_is_empty(sheet, r) {
        r += 1;
    }
    if r > FIRST_DATA_ROW {
        sheet.copy_row_format(FIRST_DATA_ROW, r, 0..SUMMARY_COLUMNS);
    }

    sheet.set_number(r, COL_SEQUENCE, (r - FIRST_DATA_ROW + 1) as f64);
    for col in [COL_DATE, COL_NOTES, COL_EXTRA] {
        sheet.set_value(r, col, CellValue::Empty);
    }

    match report.headline.as_deref() {
        Some(headline) => {
            sheet.set_text(r, COL_HEADLINE, headline);
            if let Some(target) = link.map(str::trim).filter(|l| !l.is_empty()) {
                let cell = sheet.cell_mut(r, COL_HEADLINE);
                cell.hyperlink = Some(target.to_string());
                cell.format = link_style(&cell.format);
            }
        }
        None => sheet.set_text(r, COL_HEADLINE, ""),
    }

    let sheet_ref = format!("'{}'!", report.name.replace('\'', "''"));
    sheet.set_value(
        r,
        COL_COUNT,
        CellValue::formula(
            format!("{sheet_ref}$A${}", report.last_row),
            Some(CellValue::Number(report.row_count() as f64)),
        ),
    );
    match report.totals_row {
        Some(totals) => {
            sheet.set_value(
                r,
                COL_READERSHIP,
                CellValue::formula(
                    format!("{sheet_ref}$E${totals}"),
                    Some(CellValue::Number(report.total_readership as f64)),
                ),
            );
            sheet.set_value(
                r,
                COL_AD_EQ,
                CellValue::formula(
                    format!("{sheet_ref}$F${totals}"),
                    Some(CellValue::Number(report.total_ad_eq as f64)),
                ),
            );
        }
        None => {
            sheet.set_number(r, COL_READERSHIP, report.total_readership as f64);
            sheet.set_number(r, COL_AD_EQ, report.total_ad_eq as f64);
        }
    }

    log::info!("summary: '{}' row {} -> '{}'", sheet.name, r + 1, report.name);
    Some(r + 1)
}

fn row_is_empty(sheet: &Sheet, r: usize) -> bool {
    (0..SUMMARY_COLUMNS).all(|c| match sheet.value(r, c) {
        CellValue::Empty => true,
        CellValue::Text(s) => s.is_empty(),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, totals: Option<usize>) -> AssembledSheet {
        AssembledSheet {
            index: 1,
            name: name.to_string(),
            first_row: 3,
            last_row: 7,
            totals_row: totals,
            headline: Some("Acme Launch".to_string()),
            total_readership: 5000,
            total_ad_eq: 1700,
        }
    }

    fn summary_book() -> Workbook {
        let mut prs = Sheet::new("PRs");
        for (c, label) in ["No.", "Date", "Headline", "Notes", "Clips", "Readership", "Ad Value"].iter().enumerate() {
            prs.set_text(0, c, label);
        }
        prs.set_number(1, 0, 1.0);
        prs.set_text(1, 2, "Earlier release");
        Workbook::from_sheets(vec![prs, Sheet::new("7")])
    }

    #[test]
    fn appends_after_last_filled_row() {
        let mut workbook = summary_book();
        let row = append_summary_row(&mut workbook, "prs", &report("O'Brien 7", Some(8)), Some("https://news.example"));
        assert_eq!(row, Some(3));

        let sheet = workbook.sheet(0).unwrap();
        assert_eq!(sheet.display_text(2, 0), "2");
        assert_eq!(sheet.display_text(2, 2), "Acme Launch");
        assert_eq!(sheet.hyperlink(2, 2), Some("https://news.example"));
        match sheet.value(2, 4) {
            CellValue::Formula { source, .. } => assert_eq!(source, "'O''Brien 7'!$A$7"),
            other => panic!("expected formula, got {other:?}"),
        }
        match sheet.value(2, 6) {
            CellValue::Formula { source, cached } => {
                assert_eq!(source, "'O''Brien 7'!$F$8");
                assert_eq!(cached.as_deref(), Some(&CellValue::Number(1700.0)));
            }
            other => panic!("expected formula, got {other:?}"),
        }
    }

    #[test]
    fn without_totals_writes_numbers() {
        let mut workbook = summary_book();
        append_summary_row(&mut workbook, "PRs", &report("7", None), None).unwrap();
        let sheet = workbook.sheet(0).unwrap();
        assert_eq!(sheet.value(2, 5), &CellValue::Number(5000.0));
        assert_eq!(sheet.hyperlink(2, 2), None);
    }

    #[test]
    fn no_summary_sheet() {
        let mut workbook = Workbook::from_sheets(vec![Sheet::new("7")]);
        assert_eq!(append_summary_row(&mut workbook, "PRs", &report("7", None), None), None);
    }
}
