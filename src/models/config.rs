//! Configuration of the import worker.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

use crate::domain::types::StockQuantity;

/// Configuration file looked up (without extension) in the working directory.
pub const CONFIG_FILE: &str = "config/importer";
/// Prefix of environment overrides, e.g. `IMPORTER__DATABASE_URL`.
pub const ENV_PREFIX: &str = "IMPORTER";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Configuration options of the import worker.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ImporterConfig {
    /// SQLite database path.
    #[validate(length(min = 1))]
    pub database_url: String,
    /// Root directory of blob storage.
    #[serde(default = "default_storage_root")]
    #[validate(length(min = 1))]
    pub storage_root: String,
    #[serde(default = "default_listing_timeout_secs")]
    #[validate(range(min = 1))]
    pub listing_timeout_secs: u64,
    #[serde(default = "default_image_timeout_secs")]
    #[validate(range(min = 1))]
    pub image_timeout_secs: u64,
    #[serde(default = "default_run_timeout_secs")]
    #[validate(range(min = 1))]
    pub run_timeout_secs: u64,
    /// Stock placed on products reported as in stock.
    #[serde(default = "default_in_stock_quantity")]
    #[validate(range(min = 0))]
    pub in_stock_quantity: i32,
}

impl ImporterConfig {
    /// Reads the optional YAML file and applies environment overrides.
    pub fn load() -> Result<Self, ConfigLoadError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));
        let config: ImporterConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Values handed to the orchestrator for every run.
    pub fn settings(&self) -> ImportSettings {
        ImportSettings {
            listing_timeout: Duration::from_secs(self.listing_timeout_secs),
            image_timeout: Duration::from_secs(self.image_timeout_secs),
            run_timeout: Duration::from_secs(self.run_timeout_secs),
            in_stock_quantity: StockQuantity::new(self.in_stock_quantity).unwrap_or_default(),
        }
    }
}

/// Tunables of one import run, passed explicitly instead of read from global
/// state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportSettings {
    /// Timeout of category listing and product page requests.
    pub listing_timeout: Duration,
    /// Timeout of a single image download.
    pub image_timeout: Duration,
    /// Deadline of the whole run, measured from its start.
    pub run_timeout: Duration,
    pub in_stock_quantity: StockQuantity,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            listing_timeout: Duration::from_secs(default_listing_timeout_secs()),
            image_timeout: Duration::from_secs(default_image_timeout_secs()),
            run_timeout: Duration::from_secs(default_run_timeout_secs()),
            in_stock_quantity: StockQuantity::new(default_in_stock_quantity())
                .unwrap_or_default(),
        }
    }
}

fn default_storage_root() -> String {
    "storage".to_string()
}

fn default_listing_timeout_secs() -> u64 {
    60
}

fn default_image_timeout_secs() -> u64 {
    30
}

fn default_run_timeout_secs() -> u64 {
    3600
}

fn default_in_stock_quantity() -> i32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_worker_conventions() {
        let settings = ImportSettings::default();
        assert_eq!(settings.listing_timeout, Duration::from_secs(60));
        assert_eq!(settings.image_timeout, Duration::from_secs(30));
        assert_eq!(settings.run_timeout, Duration::from_secs(3600));
        assert_eq!(settings.in_stock_quantity, 100);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ImporterConfig = config::Config::builder()
            .set_override("database_url", "app.db")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage_root, "storage");
        assert_eq!(config.settings(), ImportSettings::default());
    }

    #[test]
    fn rejects_zero_timeouts() {
        let config = ImporterConfig {
            database_url: "app.db".into(),
            storage_root: "storage".into(),
            listing_timeout_secs: 0,
            image_timeout_secs: 30,
            run_timeout_secs: 3600,
            in_stock_quantity: 100,
        };
        assert!(config.validate().is_err());
    }
}
