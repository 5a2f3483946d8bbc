//! Value cleaning shared by the extractors: numbers, dates, whitespace.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use regex::Regex;

/// Characters stripped before parsing a number
const NUMBER_NOISE: &[char] = &['$', '€', '£', '¥', ','];

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Parse a number after removing currency symbols, thousands separators and
/// whitespace. Returns None for empty or non-numeric text.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !NUMBER_NOISE.contains(c) && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Round half away from zero to a whole number
pub fn round_whole(n: f64) -> i64 {
    n.round() as i64
}

/// Collapse internal whitespace runs to one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a date in any of the accepted source formats, discarding time of day.
///
/// Tried in order:
/// 1. generic forms: ISO 8601 / RFC 3339 / RFC 2822, `YYYY-MM-DD[ HH:MM[:SS]]`,
///    and month-name forms such as `January 15, 2025` or `15 Jan 2025`
/// 2. `D-M-Y` or `D/M/Y` with a 2 or 4 digit year
/// 3. `D-MON-Y` with a three-letter month
///
/// Zoned timestamps are converted to the local calendar before the time is dropped.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    parse_generic_date(s)
        // chrono reads `%Y` with any width, so "5-1-25" would land in year 5
        .filter(|d| d.year() >= 1000)
        .or_else(|| parse_day_month_year(s))
        .or_else(|| parse_day_month_name_year(s))
}

fn parse_generic_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    let s = collapse_whitespace(&s.replace(',', " "));
    const DATE_FORMATS: [&str; 7] = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%B %d %Y",
        "%b %d %Y",
        "%d %B %Y",
        "%d %b %Y",
        "%a %b %d %Y",
    ];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&s, fmt).ok())
}

fn parse_day_month_year(s: &str) -> Option<NaiveDate> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})[-/](\d{1,2})[-/](\d{2}|\d{4})$").expect("day-month-year pattern")
    });
    let caps = re.captures(s)?;
    let day = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let year = expand_year(&caps[3])?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_day_month_name_year(s: &str) -> Option<NaiveDate> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})-([A-Za-z]{3})-(\d{2}|\d{4})$").expect("day-month-name pattern")
    });
    let caps = re.captures(s)?;
    let day = caps[1].parse().ok()?;
    let month_name = caps[2].to_ascii_lowercase();
    let month = MONTHS.iter().position(|m| *m == month_name)? as u32 + 1;
    let year = expand_year(&caps[3])?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Two-digit years pivot at 50: `<50` is 2000s, otherwise 1900s.
fn expand_year(digits: &str) -> Option<i32> {
    let year: i32 = digits.parse().ok()?;
    Some(match digits.len() {
        2 if year < 50 => 2000 + year,
        2 => 1900 + year,
        _ => year,
    })
}

/// Date from an 8-digit `YYYYMMDD` value of an `rkey` query parameter.
pub fn date_from_rkey(url: &str) -> Option<NaiveDate> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)[?&]rkey=(\d{8})(?:\D|$)").expect("rkey pattern"));
    let digits = &re.captures(url)?[1];
    let year = digits[0..4].parse().ok()?;
    let month = digits[4..6].parse().ok()?;
    let day = digits[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("$1,234"), Some(1234.0));
        assert_eq!(parse_number(" 1 500 "), Some(1500.0));
        assert_eq!(parse_number("€2,000.50"), Some(2000.5));
        assert_eq!(parse_number("-12"), Some(-12.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("12 units"), None);
    }

    #[test]
    fn generic_dates() {
        assert_eq!(parse_flexible_date("2025-01-15"), Some(ymd(2025, 1, 15)));
        assert_eq!(parse_flexible_date("2025-01-15 23:10:00"), Some(ymd(2025, 1, 15)));
        assert_eq!(parse_flexible_date("January 15, 2025"), Some(ymd(2025, 1, 15)));
        assert_eq!(parse_flexible_date("Jan 15 2025"), Some(ymd(2025, 1, 15)));
        assert_eq!(parse_flexible_date("15 January 2025"), Some(ymd(2025, 1, 15)));
    }

    #[test]
    fn zoned_timestamp_lands_on_a_local_date() {
        let parsed = parse_flexible_date("2025-01-15T12:00:00Z").unwrap();
        let expected = DateTime::parse_from_rfc3339("2025-01-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Local)
            .date_naive();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn day_month_year_forms() {
        assert_eq!(parse_flexible_date("05/01/2025"), Some(ymd(2025, 1, 5)));
        assert_eq!(parse_flexible_date("5-1-25"), Some(ymd(2025, 1, 5)));
        assert_eq!(parse_flexible_date("31/12/99"), Some(ymd(1999, 12, 31)));
        assert_eq!(parse_flexible_date("1/2/49"), Some(ymd(2049, 2, 1)));
        assert_eq!(parse_flexible_date("1/2/50"), Some(ymd(1950, 2, 1)));
        assert_eq!(parse_flexible_date("31/02/2025"), None);
    }

    #[test]
    fn day_month_name_forms() {
        assert_eq!(parse_flexible_date("5-Jan-2025"), Some(ymd(2025, 1, 5)));
        assert_eq!(parse_flexible_date("15-feb-25"), Some(ymd(2025, 2, 15)));
        assert_eq!(parse_flexible_date("15-Foo-25"), None);
        assert_eq!(parse_flexible_date("soon"), None);
        assert_eq!(parse_flexible_date(""), None);
    }

    #[test]
    fn rkey_dates() {
        let url = "https://www.prnewswire.com/news/article?rkey=20250115&filter=1";
        assert_eq!(date_from_rkey(url), Some(ymd(2025, 1, 15)));
        assert_eq!(date_from_rkey("https://x.com/a?id=1&RKEY=20241231"), Some(ymd(2024, 12, 31)));
        assert_eq!(date_from_rkey("https://x.com/a?rkey=20251301"), None);
        assert_eq!(date_from_rkey("https://x.com/a?rkey=2025011"), None);
        assert_eq!(date_from_rkey("https://x.com/rkey=20250115"), None);
        assert_eq!(date_from_rkey("https://x.com/a?rkey=202501151234"), None);
        assert_eq!(date_from_rkey("https://x.com/a?rkey=20250115#top"), Some(ymd(2025, 1, 15)));
    }

    #[test]
    fn whitespace_collapse() {
        assert_eq!(collapse_whitespace("  New \n York\t City "), "New York City");
        assert_eq!(round_whole(50.0 / 3.0), 17);
        assert_eq!(round_whole(1.5), 2);
    }
}
