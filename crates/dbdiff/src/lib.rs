//! # dbdiff
//!
//! Structural schema drift detection between two live databases.
//!
//! This library extracts table metadata from PostgreSQL and MySQL/MariaDB
//! and reports how a target schema differs from a source schema:
//!
//! - **Columns**: presence, data type, nullability, default
//! - **Primary keys**, **foreign keys**, **unique constraints**
//! - **Indexes** and **check constraints**
//! - **Filtering** of tables (exact or regex), columns, and whole facets
//! - **Parallel extraction** with one task per table
//! - **Migration notes**: an annotated SQL script describing the changes
//!
//! ## Example
//!
//! ```rust,no_run
//! use dbdiff::{Comparator, Config};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> dbdiff::Result<()> {
//!     let config = Config::load("dbdiff.yaml")?;
//!     let comparator = Comparator::new(config).await?;
//!     let result = comparator.run(CancellationToken::new()).await?;
//!     println!("{} difference(s)", result.diff.change_count());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod diff;
pub mod drivers;
pub mod error;
pub mod migration;
pub mod orchestrator;

// Re-exports for convenient access
pub use config::{Config, ConnectionConfig, ExtractionConfig, FilterSettings};
pub use core::{
    extract_schema, extract_schema_parallel, Column, Facet, Schema, SchemaExtractor, Table,
};
pub use diff::{compute_diff, FilterConfig, SchemaDiff, TableDiff};
pub use drivers::{Dialect, ExtractorImpl};
pub use error::{DiffError, Result};
pub use migration::generate_migration_sql;
pub use orchestrator::{compare_extractors, Comparator, ComparisonResult};
