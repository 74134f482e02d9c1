//! User settings for Spendwise

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use super::paths::SpendwisePaths;
use crate::error::SpendwiseError;
use crate::models::{Currency, UserId};
use crate::services::{DEFAULT_CATEGORY_LIMIT, DEFAULT_TREND_MONTHS};

/// Persisted preferences, stored as `config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Currency for new transactions when none is given
    #[serde(default)]
    pub default_currency: Currency,

    /// Date format for terminal output (strftime)
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Row cap for category lookups
    #[serde(default = "default_category_limit")]
    pub category_limit: usize,

    /// Lookback window for monthly trends
    #[serde(default = "default_trend_months")]
    pub trend_months: u32,

    /// Acting user when neither `--user` nor `SPENDWISE_USER` is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_user: Option<UserId>,
}

fn default_schema_version() -> u32 {
    1
}

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_category_limit() -> usize {
    DEFAULT_CATEGORY_LIMIT
}

fn default_trend_months() -> u32 {
    DEFAULT_TREND_MONTHS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            default_currency: Currency::default(),
            date_format: default_date_format(),
            category_limit: default_category_limit(),
            trend_months: default_trend_months(),
            default_user: None,
        }
    }
}

impl Settings {
    /// The configured date format, or the default if it has invalid specifiers
    pub fn effective_date_format(&self) -> &str {
        let invalid = StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error));
        if invalid {
            DEFAULT_DATE_FORMAT
        } else {
            &self.date_format
        }
    }

    /// Load settings from disk, or defaults if the file doesn't exist
    ///
    /// Defaults are not written; the caller decides when to persist.
    pub fn load_or_create(paths: &SpendwisePaths) -> Result<Self, SpendwiseError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| SpendwiseError::Io(format!("Failed to read settings file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| SpendwiseError::Config(format!("Failed to parse settings file: {}", e)))
    }

    /// Save settings to disk
    pub fn save(&self, paths: &SpendwisePaths) -> Result<(), SpendwiseError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| SpendwiseError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| SpendwiseError::Io(format!("Failed to write settings file: {}", e)))
    }
}
