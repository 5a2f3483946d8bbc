use serde::{Deserialize, Serialize};

use crate::sheet::{
    is_valid_sheet_name, normalize_sheet_name, Sheet, FORBIDDEN_SHEET_NAME_CHARS,
    MAX_SHEET_NAME_LEN,
};

/// Highest numeric suffix tried before falling back to a clock-derived name
const MAX_NAME_SUFFIX: usize = 999;

/// A workbook containing multiple sheets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Create a workbook with one default sheet
    pub fn new() -> Self {
        Self { sheets: vec![Sheet::new("Sheet1")] }
    }

    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(index)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Index of the sheet with this name (case-insensitive)
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        let key = normalize_sheet_name(name);
        self.sheets.iter().position(|s| normalize_sheet_name(&s.name) == key)
    }

    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        self.sheet_index(name).and_then(|i| self.sheets.get(i))
    }

    pub fn sheet_name_exists(&self, name: &str) -> bool {
        self.sheet_index(name).is_some()
    }

    /// Append a sheet. Returns None if its name is invalid or taken.
    pub fn add_sheet(&mut self, sheet: Sheet) -> Option<usize> {
        if !is_valid_sheet_name(&sheet.name) || self.sheet_name_exists(&sheet.name) {
            return None;
        }
        self.sheets.push(sheet);
        Some(self.sheets.len() - 1)
    }

    pub fn remove_sheet(&mut self, index: usize) -> Option<Sheet> {
        if index < self.sheets.len() {
            Some(self.sheets.remove(index))
        } else {
            None
        }
    }

    /// Remove every sheet whose name matches case-insensitively.
    /// Returns how many were removed.
    pub fn remove_sheets_named(&mut self, name: &str) -> usize {
        let key = normalize_sheet_name(name);
        let before = self.sheets.len();
        self.sheets.retain(|s| normalize_sheet_name(&s.name) != key);
        before - self.sheets.len()
    }

    /// Rename a sheet by index.
    /// Returns false if the index or name is invalid, or another sheet
    /// already uses the name (case-insensitive).
    pub fn rename_sheet(&mut self, index: usize, new_name: &str) -> bool {
        if !is_valid_sheet_name(new_name) || index >= self.sheets.len() {
            return false;
        }
        let key = normalize_sheet_name(new_name);
        let taken = self
            .sheets
            .iter()
            .enumerate()
            .any(|(i, s)| i != index && normalize_sheet_name(&s.name) == key);
        if taken {
            return false;
        }
        self.sheets[index].name = new_name.trim().to_string();
        true
    }

    /// Resolve `desired` to a name no existing sheet uses: forbidden characters
    /// are replaced, the name is cut to the length limit, then `-1`, `-2`, ...
    /// are tried. When every suffix is taken the name ends in digits taken
    /// from the current clock.
    pub fn unique_sheet_name(&self, desired: &str) -> String {
        let cleaned: String = desired
            .trim()
            .chars()
            .map(|c| if FORBIDDEN_SHEET_NAME_CHARS.contains(&c) { '_' } else { c })
            .collect();
        let cleaned = cleaned.trim_matches('\'');
        let base = if cleaned.trim().is_empty() { "Sheet" } else { cleaned };

        let first = truncate_chars(base, MAX_SHEET_NAME_LEN);
        if !self.sheet_name_exists(&first) {
            return first;
        }

        for n in 1..=MAX_NAME_SUFFIX {
            let suffix = format!("-{n}");
            let candidate = format!(
                "{}{}",
                truncate_chars(base, MAX_SHEET_NAME_LEN - suffix.len()),
                suffix
            );
            if !self.sheet_name_exists(&candidate) {
                return candidate;
            }
        }

        let millis = chrono::Utc::now().timestamp_millis().to_string();
        let stamp = &millis[millis.len().saturating_sub(6)..];
        format!("{}-{}", truncate_chars(base, MAX_SHEET_NAME_LEN - stamp.len() - 1), stamp)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect::<String>().trim_end().to_string()
}
