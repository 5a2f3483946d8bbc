use std::sync::OnceLock;

use regex::Regex;

pub const DEFAULT_SHEET_NAME: &str = "Report";

/// Sheet name from a leading 1-4 digit number in a source file name, such
/// as `07_client.csv` -> `07`. Falls back to `default`.
pub fn suggested_sheet_name(file_name: &str, default: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(^|\D)(\d{1,4})[_\-\s]").expect("sheet number pattern"));
    re.captures(file_name)
        .map(|caps| caps[2].to_string())
        .unwrap_or_else(|| default.to_string())
}

/// Append `.xlsx` unless the name already ends with it (any case).
pub fn output_file_name(name: &str) -> String {
    let trimmed = name.trim();
    let base = if trimmed.is_empty() { "report" } else { trimmed };
    if base.to_ascii_lowercase().ends_with(".xlsx") {
        base.to_string()
    } else {
        format!("{base}.xlsx")
    }
}
