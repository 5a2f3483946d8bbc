use clipsheet_engine::sheet::parse_cell_ref;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::normalize::round_whole;

/// adEq derived from readership when a source has none: `readership / 3`.
pub const AD_EQ_READERSHIP_DIVISOR: f64 = 3.0;

// ---------------------------------------------------------------------------
// Extraction policy
// ---------------------------------------------------------------------------

/// Tunables for the two extractors. Loaded from the `[extract]` section of
/// the settings file; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractPolicy {
    /// Divisor for deriving adEq from readership
    pub ad_eq_divisor: f64,
    /// Header labels expected, in order, somewhere in the secondary sheet
    pub secondary_header_sequence: Vec<String>,
    /// First-cell labels marking the end of the secondary data block
    pub secondary_trailer_markers: Vec<String>,
    /// Cell holding the secondary source headline
    pub headline_cell: String,
    /// Cell whose value also opens the first data row in column A
    pub anchor_cell: String,
}

impl Default for ExtractPolicy {
    fn default() -> Self {
        Self {
            ad_eq_divisor: AD_EQ_READERSHIP_DIVISOR,
            secondary_header_sequence: ["Date", "Outlet Name", "Headline", "Potential Audience", "Location", "URL"]
                .map(String::from)
                .to_vec(),
            secondary_trailer_markers: ["Total", "Totals", "Grand Total", "End of Report"]
                .map(String::from)
                .to_vec(),
            headline_cell: "B1".to_string(),
            anchor_cell: "B4".to_string(),
        }
    }
}

impl ExtractPolicy {
    pub fn validate(&self) -> Result<(), ReconError> {
        if !(self.ad_eq_divisor.is_finite() && self.ad_eq_divisor > 0.0) {
            return Err(ReconError::Policy(format!(
                "ad_eq_divisor must be a positive number, got {}",
                self.ad_eq_divisor
            )));
        }
        for (name, cell) in [("headline_cell", &self.headline_cell), ("anchor_cell", &self.anchor_cell)] {
            if parse_cell_ref(cell).is_none() {
                return Err(ReconError::Policy(format!("{name} '{cell}' is not a cell reference")));
            }
        }
        Ok(())
    }

    /// adEq for a readership figure, rounded to a whole number
    pub fn ad_eq_for(&self, readership: i64) -> i64 {
        round_whole(readership as f64 / self.ad_eq_divisor)
    }

    pub fn headline_position(&self) -> Option<(usize, usize)> {
        parse_cell_ref(&self.headline_cell)
    }

    pub fn anchor_position(&self) -> Option<(usize, usize)> {
        parse_cell_ref(&self.anchor_cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let policy = ExtractPolicy::default();
        policy.validate().unwrap();
        assert_eq!(policy.headline_position(), Some((0, 1)));
        assert_eq!(policy.anchor_position(), Some((3, 1)));
        assert_eq!(policy.ad_eq_for(150), 50);
        assert_eq!(policy.ad_eq_for(100), 33);
    }

    #[test]
    fn divisor_is_adjustable() {
        let policy = ExtractPolicy { ad_eq_divisor: 4.0, ..ExtractPolicy::default() };
        assert_eq!(policy.ad_eq_for(150), 38);
    }

    #[test]
    fn rejects_bad_values() {
        let zero = ExtractPolicy { ad_eq_divisor: 0.0, ..ExtractPolicy::default() };
        assert!(zero.validate().unwrap_err().to_string().contains("ad_eq_divisor"));
        let cell = ExtractPolicy { anchor_cell: "4B".into(), ..ExtractPolicy::default() };
        assert!(cell.validate().unwrap_err().to_string().contains("anchor_cell"));
    }
}
