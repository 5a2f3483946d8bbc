//! Column widths sized to the longest rendered value.

use std::collections::BTreeMap;

use clipsheet_engine::sheet::Sheet;
use serde::{Deserialize, Serialize};

/// Per-column clamp; unset bounds fall back to the global ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutofitSettings {
    /// 1-based columns to size
    pub columns: Vec<usize>,
    pub min_width: f64,
    pub max_width: f64,
    pub padding: f64,
    /// Keyed by 1-based column number
    pub overrides: BTreeMap<String, ColumnBounds>,
}

impl Default for AutofitSettings {
    fn default() -> Self {
        let mut overrides = BTreeMap::new();
        // Published
        overrides.insert("2".to_string(), ColumnBounds { min: None, max: Some(14.0) });
        // Ad value
        overrides.insert("6".to_string(), ColumnBounds { min: None, max: Some(16.0) });
        Self {
            columns: (2..=7).collect(),
            min_width: 10.0,
            max_width: 60.0,
            padding: 2.0,
            overrides,
        }
    }
}

impl AutofitSettings {
    /// `(min, max)` for a 1-based column
    pub fn bounds_for(&self, column: usize) -> (f64, f64) {
        let custom = self.overrides.get(&column.to_string()).copied().unwrap_or_default();
        let min = custom.min.unwrap_or(self.min_width);
        let max = custom.max.unwrap_or(self.max_width).max(min);
        (min, max)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.columns.contains(&0) {
            return Err("autofit columns are 1-based".to_string());
        }
        if !(self.min_width >= 0.0 && self.min_width <= self.max_width) {
            return Err(format!(
                "autofit min_width {} must not exceed max_width {}",
                self.min_width, self.max_width
            ));
        }
        for key in self.overrides.keys() {
            if !key.parse::<usize>().is_ok_and(|c| c > 0) {
                return Err(format!("autofit override '{key}' is not a column number"));
            }
        }
        Ok(())
    }
}

/// Set the width of each configured column. Returns the widths applied,
/// keyed by 0-based column.
pub fn autofit_columns(sheet: &mut Sheet, settings: &AutofitSettings) -> BTreeMap<usize, f64> {
    let mut longest: BTreeMap<usize, usize> = BTreeMap::new();
    for (&(_, col), cell) in sheet.cells_iter() {
        if !settings.columns.contains(&(col + 1)) {
            continue;
        }
        let len = cell.display().chars().count();
        let entry = longest.entry(col).or_default();
        *entry = (*entry).max(len);
    }

    let mut applied = BTreeMap::new();
    for &column in &settings.columns {
        let col = column - 1;
        let (min, max) = settings.bounds_for(column);
        let observed = longest.get(&col).map_or(0.0, |len| *len as f64 + settings.padding);
        let width = observed.max(min).min(max);
        sheet.set_col_width(col, width);
        applied.insert(col, width);
    }
    applied
}
