use chrono::NaiveDate;
use serde::Serialize;

/// Placeholder written for text fields (and dates) that could not be determined.
pub const TEXT_PLACEHOLDER: &str = "Not Available";
/// Placeholder written for numeric fields that could not be determined.
pub const NUMBER_PLACEHOLDER: &str = "N/A";

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// A value that was either determined from the source or is known to be
/// missing. Serializes as the bare value, or `null` when unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Field<T> {
    Resolved(T),
    Unresolved,
}

impl<T> Field<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Field::Resolved(_))
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            Field::Resolved(v) => Some(v),
            Field::Unresolved => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Resolved(v) => Some(v),
            Field::Unresolved => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Resolved(v) => Field::Resolved(f(v)),
            Field::Unresolved => Field::Unresolved,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Field::Unresolved, Field::Resolved)
    }
}

impl Field<String> {
    /// Empty or whitespace-only text is unresolved.
    pub fn text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Field::Unresolved
        } else {
            Field::Resolved(trimmed.to_string())
        }
    }

    /// Display text, placeholder when unresolved
    pub fn display(&self) -> &str {
        self.resolved().map_or(TEXT_PLACEHOLDER, String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Row fields and report columns
// ---------------------------------------------------------------------------

/// The canonical fields every source is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RowField {
    Published,
    Outlet,
    Title,
    Readership,
    AdEq,
    Base,
    Url,
}

impl RowField {
    /// Fields a primary-source row must carry to be kept.
    pub const REQUIRED: [RowField; 7] = [
        RowField::Published,
        RowField::Outlet,
        RowField::Title,
        RowField::Readership,
        RowField::AdEq,
        RowField::Base,
        RowField::Url,
    ];

    /// Fields that appear as report columns and may carry a placeholder.
    pub const REPORTED: [RowField; 6] = [
        RowField::Published,
        RowField::Outlet,
        RowField::Title,
        RowField::Readership,
        RowField::AdEq,
        RowField::Base,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RowField::Published => "published",
            RowField::Outlet => "outlet",
            RowField::Title => "title",
            RowField::Readership => "readership",
            RowField::AdEq => "adEq",
            RowField::Base => "base",
            RowField::Url => "url",
        }
    }

    /// 0-based report column. The link lives on the title cell.
    pub fn report_column(self) -> usize {
        match self {
            RowField::Published => ReportColumn::Published as usize,
            RowField::Outlet => ReportColumn::Outlet as usize,
            RowField::Title | RowField::Url => ReportColumn::Title as usize,
            RowField::Readership => ReportColumn::Readership as usize,
            RowField::AdEq => ReportColumn::AdEq as usize,
            RowField::Base => ReportColumn::Base as usize,
        }
    }
}

impl std::fmt::Display for RowField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The seven report columns, in template order (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportColumn {
    Sequence = 0,
    Published = 1,
    Outlet = 2,
    Title = 3,
    Readership = 4,
    AdEq = 5,
    Base = 6,
}

impl ReportColumn {
    pub const COUNT: usize = 7;
}

// ---------------------------------------------------------------------------
// Canonical row
// ---------------------------------------------------------------------------

/// One media mention, normalized from any source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRow {
    pub published: Field<NaiveDate>,
    pub outlet: Field<String>,
    pub title: Field<String>,
    pub readership: Field<i64>,
    pub ad_eq: Field<i64>,
    pub base: Field<String>,
    /// None means no link is known.
    pub url: Option<String>,
}

impl Default for CanonicalRow {
    fn default() -> Self {
        Self {
            published: Field::Unresolved,
            outlet: Field::Unresolved,
            title: Field::Unresolved,
            readership: Field::Unresolved,
            ad_eq: Field::Unresolved,
            base: Field::Unresolved,
            url: None,
        }
    }
}

impl CanonicalRow {
    pub fn is_resolved(&self, field: RowField) -> bool {
        match field {
            RowField::Published => self.published.is_resolved(),
            RowField::Outlet => self.outlet.is_resolved(),
            RowField::Title => self.title.is_resolved(),
            RowField::Readership => self.readership.is_resolved(),
            RowField::AdEq => self.ad_eq.is_resolved(),
            RowField::Base => self.base.is_resolved(),
            RowField::Url => self.url.is_some(),
        }
    }

    /// Reported fields currently holding a placeholder
    pub fn unresolved_fields(&self) -> Vec<RowField> {
        RowField::REPORTED.into_iter().filter(|f| !self.is_resolved(*f)).collect()
    }

    pub fn is_fully_resolved(&self) -> bool {
        RowField::REPORTED.iter().all(|f| self.is_resolved(*f))
    }

    /// Outlet text used for ordering; unresolved sorts as the placeholder.
    pub fn outlet_sort_key(&self) -> String {
        self.outlet.display().to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// A non-fatal problem found while extracting a source row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractIssue {
    /// 1-based source row; 0 for source-level problems.
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<String>,
}

impl ExtractIssue {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self { row, field: None, message: message.into(), raw_value: None }
    }

    pub fn for_field(row: usize, field: RowField, message: impl Into<String>) -> Self {
        Self { field: Some(field.name().to_string()), ..Self::new(row, message) }
    }

    /// Source-level failure (e.g. an unreadable optional source).
    pub fn source(message: impl Into<String>) -> Self {
        Self { field: Some("source".to_string()), ..Self::new(0, message) }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw_value = Some(raw.into());
        self
    }
}

impl std::fmt::Display for ExtractIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}", self.row)?;
        if let Some(field) = &self.field {
            write!(f, " [{field}]")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(raw) = &self.raw_value {
            write!(f, " ({raw:?})")?;
        }
        Ok(())
    }
}

/// Order issues by source row for display; stable within a row.
pub fn sort_issues(issues: &mut [ExtractIssue]) {
    issues.sort_by_key(|i| i.row);
}

/// A single cell to flag, relative to the reconciled row list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RedCell {
    pub row: usize,
    pub col: usize,
}

/// Cells and whole rows to recolor in the assembled report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleWarnings {
    pub red_cells: Vec<RedCell>,
    pub red_rows: Vec<usize>,
}

impl StyleWarnings {
    pub fn is_empty(&self) -> bool {
        self.red_cells.is_empty() && self.red_rows.is_empty()
    }

    /// Placeholder cells of every row, without whole-row markers
    pub fn for_rows(rows: &[CanonicalRow]) -> Self {
        let red_cells = rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| {
                row.unresolved_fields()
                    .into_iter()
                    .map(move |f| RedCell { row: i, col: f.report_column() })
            })
            .collect();
        Self { red_cells, red_rows: Vec::new() }
    }

    /// Rewrite row indices after a reorder. `new_index[old] = new`.
    pub fn remap(&self, new_index: &[usize]) -> Self {
        let lookup = |row: usize| new_index.get(row).copied().unwrap_or(row);
        Self {
            red_cells: self
                .red_cells
                .iter()
                .map(|c| RedCell { row: lookup(c.row), col: c.col })
                .collect(),
            red_rows: self.red_rows.iter().map(|r| lookup(*r)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction output
// ---------------------------------------------------------------------------

/// Result of reading the delimited-text source.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryExtract {
    pub rows: Vec<CanonicalRow>,
    pub issues: Vec<ExtractIssue>,
    pub unmapped_headers: Vec<String>,
    /// Raw header label -> canonical field name (None when unrecognized)
    pub header_map: Vec<(String, Option<RowField>)>,
}

/// Result of reading the spreadsheet source.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryExtract {
    pub rows: Vec<CanonicalRow>,
    pub issues: Vec<ExtractIssue>,
    /// Trimmed URLs of rows whose date could not be derived
    pub invalid_date_urls: std::collections::BTreeSet<String>,
    pub headline: Option<String>,
}
