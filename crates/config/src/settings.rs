//! Report settings, stored as TOML in the platform config directory.
//!
//! Every section and field has a default, so an empty or partial file is
//! valid. A missing default file means "use the defaults"; a file that exists
//! but does not parse is an error.

use std::fs;
use std::path::{Path, PathBuf};

use clipsheet_recon::ExtractPolicy;
use clipsheet_report::{AutofitSettings, BuildOptions, DEFAULT_AGGREGATE_SHEET};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const APP_DIR: &str = "clipsheet";
const FILE_NAME: &str = "settings.toml";

/// Where report rows go inside the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// 1-based first data row of the template
    pub data_start_row: usize,
    /// External `.xlsx` template. Relative paths resolve against the
    /// settings file's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,
    /// Fallback sheet name when the primary file name carries no number
    pub sheet_name: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            data_start_row: 3,
            template_path: None,
            sheet_name: "Report".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub write_totals: bool,
    pub autofit: bool,
    pub file_name: String,
    /// Baseline sheet that gets one row per built report
    pub summary_sheet: String,
    /// Link target for the summary row's headline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_link: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            write_totals: true,
            autofit: true,
            file_name: "report.xlsx".to_string(),
            summary_sheet: "PRs".to_string(),
            summary_link: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateSettings {
    pub sheet_name: String,
}

impl Default for AggregateSettings {
    fn default() -> Self {
        Self { sheet_name: DEFAULT_AGGREGATE_SHEET.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub extract: ExtractPolicy,
    pub layout: LayoutSettings,
    pub output: OutputSettings,
    pub autofit: AutofitSettings,
    pub aggregate: AggregateSettings,
}

impl ReportSettings {
    /// Get the default settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(FILE_NAME)
    }

    /// Load from `explicit`, or from [`Self::config_path`] when None.
    ///
    /// An explicit path must exist. The default path may be absent, in which
    /// case the defaults are returned.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = Self::config_path();
                if !path.exists() {
                    log::debug!("config: {} not found, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let mut settings: Self = toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

        if let (Some(template), Some(dir)) = (&settings.layout.template_path, path.parent()) {
            if template.is_relative() {
                settings.layout.template_path = Some(dir.join(template));
            }
        }
        settings.validate()?;
        log::debug!("config: loaded {}", path.display());
        Ok(settings)
    }

    /// Write the settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })?;
        }
        let text = self.to_toml()?;
        fs::write(path, text).map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.extract
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.autofit.validate().map_err(ConfigError::Invalid)?;
        if self.layout.data_start_row == 0 {
            return Err(ConfigError::Invalid("layout.data_start_row is 1-based".to_string()));
        }
        for (key, value) in [
            ("layout.sheet_name", &self.layout.sheet_name),
            ("output.file_name", &self.output.file_name),
            ("aggregate.sheet_name", &self.aggregate.sheet_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }

    /// Build options for a single report sheet.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            sheet_name: self.layout.sheet_name.clone(),
            start_row: self.layout.data_start_row,
            write_totals: self.output.write_totals,
            autofit: self.output.autofit.then(|| self.autofit.clone()),
            file_name: self.output.file_name.clone(),
            ..BuildOptions::default()
        }
    }

    /// Build options for the aggregate sheet.
    pub fn aggregate_options(&self) -> BuildOptions {
        BuildOptions {
            sheet_name: self.aggregate.sheet_name.clone(),
            ..self.build_options()
        }
    }
}
