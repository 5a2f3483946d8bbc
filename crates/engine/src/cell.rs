use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum Alignment {
    #[default]
    General,
    Left,
    Center,
    Right,
}

/// Vertical text alignment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum VerticalAlignment {
    Top,
    Middle,
    #[default]
    Bottom,
}

/// Text overflow behavior
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum TextOverflow {
    #[default]
    Clip,
    Wrap,
}

/// Border line style for one cell edge
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CellBorder {
    pub style: BorderStyle,
    /// RGBA; None = automatic (black)
    pub color: Option<[u8; 4]>,
}

impl CellBorder {
    pub fn thin() -> Self {
        Self { style: BorderStyle::Thin, color: None }
    }

    pub fn is_set(&self) -> bool {
        self.style != BorderStyle::None
    }
}

/// Number format attached to a cell.
///
/// The structured variants cover the formats the report layout uses; anything
/// else read from a workbook is carried verbatim in `Custom` so it survives a
/// load/save cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum NumberFormat {
    #[default]
    General,
    Number { decimals: u8, thousands: bool },
    Currency { decimals: u8 },
    Percent { decimals: u8 },
    /// Date pattern such as `dd-mmm-yy`
    Date(String),
    Custom(String),
}

impl NumberFormat {
    /// `#,##0`
    pub fn thousands() -> Self {
        NumberFormat::Number { decimals: 0, thousands: true }
    }

    /// `$#,##0`
    pub fn whole_currency() -> Self {
        NumberFormat::Currency { decimals: 0 }
    }

    /// Classify an Excel number format code.
    pub fn from_code(code: &str) -> Self {
        let trimmed = code.trim();
        match trimmed {
            "" | "General" | "general" => return NumberFormat::General,
            "0" => return NumberFormat::Number { decimals: 0, thousands: false },
            "0.00" => return NumberFormat::Number { decimals: 2, thousands: false },
            "#,##0" => return NumberFormat::Number { decimals: 0, thousands: true },
            "#,##0.00" => return NumberFormat::Number { decimals: 2, thousands: true },
            "$#,##0" | "\"$\"#,##0" => return NumberFormat::Currency { decimals: 0 },
            "$#,##0.00" | "\"$\"#,##0.00" => return NumberFormat::Currency { decimals: 2 },
            "0%" => return NumberFormat::Percent { decimals: 0 },
            "0.00%" => return NumberFormat::Percent { decimals: 2 },
            _ => {}
        }
        if is_date_code(trimmed) {
            NumberFormat::Date(trimmed.to_string())
        } else {
            NumberFormat::Custom(trimmed.to_string())
        }
    }

    /// Excel format code for export.
    pub fn code(&self) -> String {
        match self {
            NumberFormat::General => "General".to_string(),
            NumberFormat::Number { decimals, thousands } => {
                let int = if *thousands { "#,##0" } else { "0" };
                with_decimals(int, *decimals)
            }
            NumberFormat::Currency { decimals } => with_decimals("$#,##0", *decimals),
            NumberFormat::Percent { decimals } => format!("{}%", with_decimals("0", *decimals)),
            NumberFormat::Date(code) | NumberFormat::Custom(code) => code.clone(),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, NumberFormat::Date(_))
    }
}

fn with_decimals(int: &str, decimals: u8) -> String {
    if decimals == 0 {
        int.to_string()
    } else {
        format!("{}.{}", int, "0".repeat(decimals as usize))
    }
}

/// True when a format code renders a date: it carries a day, month or year
/// token outside quoted literals and bracketed sections.
fn is_date_code(code: &str) -> bool {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;
    for ch in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            'd' | 'D' | 'y' | 'Y' if !in_quotes && !in_brackets => return true,
            _ => {}
        }
    }
    false
}

/// Cell formatting options
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CellFormat {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    /// RGBA; None = automatic
    pub font_color: Option<[u8; 4]>,
    pub background_color: Option<[u8; 4]>,
    pub alignment: Alignment,
    pub vertical_alignment: VerticalAlignment,
    pub text_overflow: TextOverflow,
    pub number_format: NumberFormat,
    pub border_top: CellBorder,
    pub border_right: CellBorder,
    pub border_bottom: CellBorder,
    pub border_left: CellBorder,
}

impl CellFormat {
    pub fn is_default(&self) -> bool {
        *self == CellFormat::default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Date/time held as a spreadsheet serial number
    DateTime(f64),
    Error(String),
    /// Formula source (without the leading `=`) and the value last computed
    /// by whichever application saved the workbook.
    Formula { source: String, cached: Option<Box<CellValue>> },
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn formula(source: impl Into<String>, cached: Option<CellValue>) -> Self {
        let source = source.into();
        let source = source.strip_prefix('=').map(str::to_string).unwrap_or(source);
        CellValue::Formula { source, cached: cached.map(Box::new) }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The value a reader sees: formulas resolve to their cached result.
    pub fn resolved(&self) -> &CellValue {
        match self {
            CellValue::Formula { cached: Some(v), .. } => v.resolved(),
            CellValue::Formula { cached: None, .. } => &CellValue::Empty,
            other => other,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.resolved() {
            CellValue::Number(n) | CellValue::DateTime(n) => Some(*n),
            _ => None,
        }
    }

    /// Rendered text under the given number format
    pub fn display(&self, format: &NumberFormat) -> String {
        match self.resolved() {
            CellValue::Empty => String::new(),
            CellValue::Text(s) | CellValue::Error(s) => s.clone(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Number(n) => format_number(*n, format),
            CellValue::DateTime(n) => match format {
                NumberFormat::Date(code) => format_date_serial(*n, code),
                NumberFormat::General => format_date_serial(*n, "yyyy-mm-dd"),
                other => format_number(*n, other),
            },
            CellValue::Formula { .. } => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub format: CellFormat,
    /// External link target when the cell is a hyperlink
    pub hyperlink: Option<String>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self { value, ..Self::default() }
    }

    pub fn display(&self) -> String {
        self.value.display(&self.format.number_format)
    }

    pub fn is_blank(&self) -> bool {
        self.value.is_empty() && self.hyperlink.is_none()
    }
}

// ============================================================================
// Number and date rendering
// ============================================================================

/// Format a number according to the specified format
pub fn format_number(n: f64, format: &NumberFormat) -> String {
    match format {
        NumberFormat::General => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", n as i64)
            } else {
                let s = format!("{:.10}", n);
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            }
        }
        NumberFormat::Number { decimals, thousands } => {
            fixed(n, *decimals, *thousands)
        }
        NumberFormat::Currency { decimals } => {
            if n < 0.0 {
                format!("-${}", fixed(n.abs(), *decimals, true))
            } else {
                format!("${}", fixed(n, *decimals, true))
            }
        }
        NumberFormat::Percent { decimals } => {
            format!("{}%", fixed(n * 100.0, *decimals, false))
        }
        NumberFormat::Date(code) => format_date_serial(n, code),
        NumberFormat::Custom(code) => {
            let decimals = code
                .split_once('.')
                .map(|(_, frac)| frac.chars().take_while(|c| *c == '0').count() as u8)
                .unwrap_or(0);
            let grouped = code.contains("#,##");
            if code.contains('$') {
                format_number(n, &NumberFormat::Currency { decimals })
            } else if grouped || code.starts_with('0') {
                fixed(n, decimals, grouped)
            } else {
                format_number(n, &NumberFormat::General)
            }
        }
    }
}

fn fixed(n: f64, decimals: u8, thousands: bool) -> String {
    let rendered = format!("{:.*}", decimals as usize, n);
    if !thousands {
        return rendered;
    }
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (int, frac) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match frac {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

const WEEKDAYS: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Largest serial Excel accepts (9999-12-31).
pub const MAX_DATE_SERIAL: f64 = 2_958_465.0;

/// Whole-day spreadsheet serial for a date (1900 date system).
pub fn date_to_serial(date: NaiveDate) -> f64 {
    (date - serial_epoch()).num_days() as f64
}

/// Date part of a spreadsheet serial. Time-of-day is discarded.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_DATE_SERIAL + 1.0 {
        return None;
    }
    serial_epoch().checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Render a serial with a date pattern. Supports the d/m/y tokens; other
/// characters are copied through.
pub fn format_date_serial(serial: f64, code: &str) -> String {
    let Some(date) = serial_to_date(serial) else {
        return format_number(serial, &NumberFormat::General);
    };
    let chars: Vec<char> = code.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match ch.to_ascii_lowercase() {
            c @ ('d' | 'm' | 'y') => {
                let mut run = 1;
                while i + run < chars.len() && chars[i + run].to_ascii_lowercase() == c {
                    run += 1;
                }
                out.push_str(&date_token(date, c, run));
                i += run;
            }
            '"' => {
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    out.push(chars[i]);
                    i += 1;
                }
                i += 1;
            }
            '\\' => {
                if let Some(next) = chars.get(i + 1) {
                    out.push(*next);
                }
                i += 2;
            }
            _ => {
                out.push(ch);
                i += 1;
            }
        }
    }
    out
}

fn date_token(date: NaiveDate, token: char, run: usize) -> String {
    let month = MONTHS[date.month0() as usize];
    match (token, run) {
        ('d', 1) => date.day().to_string(),
        ('d', 2) => format!("{:02}", date.day()),
        ('d', 3) => WEEKDAYS[date.weekday().num_days_from_monday() as usize][..3].to_string(),
        ('d', _) => WEEKDAYS[date.weekday().num_days_from_monday() as usize].to_string(),
        ('m', 1) => date.month().to_string(),
        ('m', 2) => format!("{:02}", date.month()),
        ('m', 3) => month[..3].to_string(),
        ('m', _) => month.to_string(),
        ('y', 1 | 2) => format!("{:02}", date.year().rem_euclid(100)),
        _ => format!("{:04}", date.year()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_format_defaults() {
        let format = CellFormat::default();
        assert!(!format.bold);
        assert!(!format.underline);
        assert_eq!(format.alignment, Alignment::General);
        assert_eq!(format.vertical_alignment, VerticalAlignment::Bottom);
        assert_eq!(format.number_format, NumberFormat::General);
        assert!(format.is_default());
    }

    #[test]
    fn test_number_format_codes() {
        assert_eq!(NumberFormat::thousands().code(), "#,##0");
        assert_eq!(NumberFormat::whole_currency().code(), "$#,##0");
        assert_eq!(NumberFormat::Percent { decimals: 2 }.code(), "0.00%");
        assert_eq!(NumberFormat::from_code("#,##0"), NumberFormat::thousands());
        assert_eq!(NumberFormat::from_code("\"$\"#,##0"), NumberFormat::whole_currency());
        assert!(NumberFormat::from_code("dd-mmm-yy").is_date());
        assert!(!NumberFormat::from_code("[Red]0.0").is_date());
        assert_eq!(NumberFormat::from_code("General"), NumberFormat::General);
    }

    #[test]
    fn test_format_number_grouping() {
        assert_eq!(format_number(1234567.0, &NumberFormat::thousands()), "1,234,567");
        assert_eq!(format_number(999.0, &NumberFormat::thousands()), "999");
        assert_eq!(format_number(-1500.0, &NumberFormat::whole_currency()), "-$1,500");
        assert_eq!(format_number(12.5, &NumberFormat::General), "12.5");
        assert_eq!(format_number(0.25, &NumberFormat::Percent { decimals: 0 }), "25%");
    }

    #[test]
    fn test_serial_round_trip_and_render() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let serial = date_to_serial(date);
        assert_eq!(serial, 45672.0);
        assert_eq!(serial_to_date(serial), Some(date));
        assert_eq!(serial_to_date(serial + 0.75), Some(date));
        assert_eq!(format_date_serial(serial, "dd-mmm-yy"), "15-Jan-25");
        assert_eq!(format_date_serial(serial, "d mmmm yyyy"), "15 January 2025");
        assert_eq!(serial_to_date(0.0), None);
    }

    #[test]
    fn test_formula_display_uses_cached_value() {
        let v = CellValue::formula("=SUM(E3:E4)", Some(CellValue::Number(2500.0)));
        assert_eq!(v.display(&NumberFormat::thousands()), "2,500");
        assert_eq!(v.as_number(), Some(2500.0));
        if let CellValue::Formula { source, .. } = &v {
            assert_eq!(source, "SUM(E3:E4)");
        }
        let pending = CellValue::formula("A1", None);
        assert_eq!(pending.display(&NumberFormat::General), "");
    }
}
