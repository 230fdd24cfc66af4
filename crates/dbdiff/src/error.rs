//! Error types for schema extraction and comparison.

use thiserror::Error;

use crate::core::schema::Facet;

/// Main error type for dbdiff operations.
#[derive(Error, Debug)]
pub enum DiffError {
    /// Configuration error (invalid YAML, bad regex, unknown driver, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// PostgreSQL connection or query error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL connection or query error
    #[error("MySQL error: {0}")]
    Mysql(#[from] sqlx::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Loading one metadata facet of one table failed
    #[error("Failed to extract {facet} for table {table}: {source}")]
    Extraction {
        table: String,
        facet: Facet,
        #[source]
        source: Box<DiffError>,
    },

    /// A per-table extraction task panicked or was aborted
    #[error("Extraction task failed: {0}")]
    Task(String),

    /// Comparison was cancelled (SIGINT, etc.)
    #[error("Comparison cancelled")]
    Cancelled,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DiffError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        DiffError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Wrap an error with the table and facet being loaded when it occurred.
    pub fn extraction(table: impl Into<String>, facet: Facet, source: DiffError) -> Self {
        DiffError::Extraction {
            table: table.into(),
            facet,
            source: Box::new(source),
        }
    }

    /// Process exit code for this error.
    ///
    /// Every error maps to 1; exit code 2 is reserved for "drift found",
    /// which is not an error.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for dbdiff operations.
pub type Result<T> = std::result::Result<T, DiffError>;
