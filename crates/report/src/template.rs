//! The report layout every built sheet starts from.
//!
//! The bundled template is defined in code and versioned with
//! [`TEMPLATE_VERSION`]; an external `.xlsx` may replace it as long as its
//! first sheet keeps the same column order and data-start row.

use clipsheet_engine::cell::{Alignment, CellBorder, CellFormat, NumberFormat, VerticalAlignment};
use clipsheet_engine::sheet::{MergedRegion, Sheet};
use clipsheet_engine::workbook::Workbook;

use crate::error::ReportError;

/// Bump when the column layout of the bundled template changes.
pub const TEMPLATE_VERSION: u32 = 1;

/// Report column headers, in column order.
pub const HEADER_LABELS: [&str; 7] = [
    "No.",
    "Published",
    "Outlet",
    "Headline",
    "Readership",
    "Ad Value",
    "Base",
];

/// 1-based row of the first data row
pub const DEFAULT_DATA_START_ROW: usize = 3;

/// 0-based (row, col) of the composed title, A1
pub const TITLE_CELL: (usize, usize) = (0, 0);
/// 0-based (row, col) of the headline, B1
pub const HEADLINE_CELL: (usize, usize) = (0, 1);

pub const PUBLISHED_DATE_FORMAT: &str = "dd-mmm-yy";

const HEADER_FILL: [u8; 4] = [217, 225, 242, 255];
const COLUMN_WIDTHS: [f64; 7] = [6.0, 12.0, 24.0, 48.0, 14.0, 14.0, 16.0];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Bundled { version: u32 },
    External { name: String },
}

/// A read-only report layout. Cloned into each workbook it is used in.
#[derive(Debug, Clone)]
pub struct Template {
    sheet: Sheet,
    source: TemplateSource,
}

impl Template {
    pub fn bundled() -> Self {
        Self {
            sheet: bundled_sheet(),
            source: TemplateSource::Bundled { version: TEMPLATE_VERSION },
        }
    }

    /// First sheet of an `.xlsx` document.
    pub fn from_bytes(bytes: &[u8], name: &str) -> Result<Self, ReportError> {
        let (workbook, _) = clipsheet_io::import_bytes(bytes)
            .map_err(|e| ReportError::TemplateUnreadable(format!("{name}: {e}")))?;
        let sheet = workbook
            .sheet(0)
            .cloned()
            .ok_or_else(|| ReportError::TemplateUnreadable(format!("{name}: no worksheet")))?;
        log::debug!("template: loaded '{}' from {name}", sheet.name);
        Ok(Self { sheet, source: TemplateSource::External { name: name.to_string() } })
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Copy the template sheet into `workbook` under a unique variant of
    /// `desired`. Returns the new sheet's index.
    pub fn import_into(&self, workbook: &mut Workbook, desired: &str) -> Result<usize, ReportError> {
        let name = workbook.unique_sheet_name(desired);
        let mut sheet = self.sheet.clone();
        sheet.name = name.clone();
        let index = workbook
            .add_sheet(sheet)
            .ok_or_else(|| ReportError::SheetMissing(name.clone()))?;
        if name != desired.trim() {
            log::info!("template: sheet '{desired}' exists, using '{name}'");
        }
        Ok(index)
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::bundled()
    }
}

fn bordered() -> CellFormat {
    CellFormat {
        border_top: CellBorder::thin(),
        border_right: CellBorder::thin(),
        border_bottom: CellBorder::thin(),
        border_left: CellBorder::thin(),
        vertical_alignment: VerticalAlignment::Middle,
        ..CellFormat::default()
    }
}

fn bundled_sheet() -> Sheet {
    let mut sheet = Sheet::new("Report");

    // Title row: A1 composed title, B1:G1 headline
    sheet.set_format(
        TITLE_CELL.0,
        TITLE_CELL.1,
        CellFormat { bold: true, font_size: Some(14.0), ..CellFormat::default() },
    );
    sheet.set_format(
        HEADLINE_CELL.0,
        HEADLINE_CELL.1,
        CellFormat { bold: true, font_size: Some(12.0), ..CellFormat::default() },
    );
    sheet.add_merge(MergedRegion::new(0, 1, 0, 6));
    sheet.set_row_height(0, 24.0);

    for (col, label) in HEADER_LABELS.iter().enumerate() {
        sheet.set_text(1, col, label);
        sheet.set_format(
            1,
            col,
            CellFormat {
                bold: true,
                background_color: Some(HEADER_FILL),
                alignment: Alignment::Center,
                ..bordered()
            },
        );
    }
    sheet.set_row_height(1, 20.0);

    // Data pattern row
    let pattern = DEFAULT_DATA_START_ROW - 1;
    let formats = [
        CellFormat { alignment: Alignment::Center, ..bordered() },
        CellFormat {
            alignment: Alignment::Center,
            number_format: NumberFormat::Date(PUBLISHED_DATE_FORMAT.to_string()),
            ..bordered()
        },
        bordered(),
        bordered(),
        CellFormat { number_format: NumberFormat::thousands(), ..bordered() },
        CellFormat { number_format: NumberFormat::whole_currency(), ..bordered() },
        bordered(),
    ];
    for (col, format) in formats.into_iter().enumerate() {
        sheet.set_format(pattern, col, format);
    }

    // Totals row
    let totals = pattern + 1;
    sheet.set_text(totals, 3, "Total");
    sheet.set_format(totals, 3, CellFormat { bold: true, alignment: Alignment::Right, ..CellFormat::default() });
    sheet.set_format(
        totals,
        4,
        CellFormat { bold: true, number_format: NumberFormat::thousands(), ..bordered() },
    );
    sheet.set_format(
        totals,
        5,
        CellFormat { bold: true, number_format: NumberFormat::whole_currency(), ..bordered() },
    );

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        sheet.set_col_width(col, *width);
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_layout() {
        let template = Template::bundled();
        let sheet = template.sheet();
        assert_eq!(template.source(), &TemplateSource::Bundled { version: TEMPLATE_VERSION });
        assert_eq!(sheet.display_text(1, 3), "Headline");
        assert!(sheet.get_format(2, 1).number_format.is_date());
        assert_eq!(sheet.get_format(2, 4).number_format, NumberFormat::thousands());
        assert_eq!(sheet.display_text(3, 3), "Total");
        assert!(sheet.merge_at(0, 4).is_some());
    }

    #[test]
    fn import_resolves_unique_names() {
        let template = Template::bundled();
        let mut workbook = Workbook::from_sheets(vec![Sheet::new("7")]);
        let index = template.import_into(&mut workbook, "7").unwrap();
        assert_eq!(workbook.sheet_names(), vec!["7", "7-1"]);
        let imported = workbook.sheet(index).unwrap();
        assert_eq!(imported.col_width(3), Some(48.0));
        assert_eq!(imported.merged_regions().len(), 1);
    }

    #[test]
    fn external_template_round_trips_through_io() {
        let workbook = Workbook::from_sheets(vec![bundled_sheet()]);
        let (bytes, _) = clipsheet_io::export_bytes(&workbook).unwrap();
        let template = Template::from_bytes(&bytes, "custom.xlsx").unwrap();
        assert_eq!(template.sheet().display_text(1, 5), "Ad Value");
        assert!(matches!(template.source(), TemplateSource::External { .. }));
    }

    #[test]
    fn unreadable_template() {
        let err = Template::from_bytes(b"not a workbook", "broken.xlsx").unwrap_err();
        assert!(matches!(err, ReportError::TemplateUnreadable(_)));
        assert!(err.to_string().contains("broken.xlsx"));
    }
}
