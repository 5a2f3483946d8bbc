//! Source extractors. Each turns one input format into canonical rows plus
//! non-fatal issues.

pub mod primary;
pub mod secondary;

pub use primary::extract_primary;
pub use secondary::{extract_secondary, AnchorCell, ExpectedSequence, HeaderLocator, SheetGrid};
