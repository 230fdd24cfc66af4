//! Configuration validation.
//!
//! Everything here runs before any connection is attempted.

use super::{Config, ConnectionConfig, MAX_CONNECTIONS_LIMIT};
use crate::drivers::{Dialect, SslMode};
use crate::error::{DiffError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_connection("source", &config.source)?;
    validate_connection("target", &config.target)?;

    if let Some(n) = config.extraction.max_connections {
        if n == 0 || n > MAX_CONNECTIONS_LIMIT {
            return Err(DiffError::Config(format!(
                "extraction.max_connections must be between 1 and {}, got {}",
                MAX_CONNECTIONS_LIMIT, n
            )));
        }
    }

    for (table, columns) in &config.filter.ignore_columns {
        if table.is_empty() || columns.iter().any(String::is_empty) {
            return Err(DiffError::Config(
                "filter.ignore_columns entries must name a table and its columns".into(),
            ));
        }
    }

    // Compiles the table pattern.
    config.filter_config()?;

    Ok(())
}

fn validate_connection(side: &str, conn: &ConnectionConfig) -> Result<()> {
    Dialect::parse(&conn.driver)
        .map_err(|e| DiffError::Config(format!("{}.driver: {}", side, config_message(e))))?;

    if conn.url.trim().is_empty() {
        return Err(DiffError::Config(format!("{}.url is required", side)));
    }
    if conn.schema.is_empty() {
        return Err(DiffError::Config(format!("{}.schema must not be empty", side)));
    }

    SslMode::parse(&conn.ssl_mode)
        .map_err(|e| DiffError::Config(format!("{}.ssl_mode: {}", side, config_message(e))))?;

    Ok(())
}

fn config_message(e: DiffError) -> String {
    match e {
        DiffError::Config(msg) => msg,
        other => other.to_string(),
    }
}
