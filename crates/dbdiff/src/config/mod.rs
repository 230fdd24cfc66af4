//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::diff::FilterConfig;
use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Build the diff engine's filter from the file-level settings.
    pub fn filter_config(&self) -> Result<FilterConfig> {
        let settings = &self.filter;
        let mut filter = FilterConfig {
            ignore_indexes: settings.ignore_indexes,
            ignore_foreign_keys: settings.ignore_foreign_keys,
            ignore_checks: settings.ignore_checks,
            ..FilterConfig::default()
        };

        for table in &settings.ignore_tables {
            filter = filter.ignore_table(table.as_str());
        }
        for (table, columns) in &settings.ignore_columns {
            for column in columns {
                filter = filter.ignore_column(table.as_str(), column.as_str());
            }
        }
        if let Some(pattern) = &settings.ignore_table_pattern {
            filter = filter.with_table_pattern(pattern)?;
        }

        Ok(filter)
    }
}
