// Configuration loading

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{AggregateSettings, LayoutSettings, OutputSettings, ReportSettings};
