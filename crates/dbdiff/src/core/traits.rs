//! Core trait for dialect-specific schema extraction.
//!
//! - [`SchemaExtractor`]: Populates a [`Table`] facet by facet from a live connection
//!
//! # Design Patterns
//!
//! - **Strategy**: each dialect supplies its own catalog queries
//! - **Template Method**: [`SchemaExtractor::load_table`] defines the facet order
//!   and the error wrapping once for every dialect

use async_trait::async_trait;
use tracing::debug;

use crate::drivers::Dialect;
use crate::error::{DiffError, Result};

use super::schema::{Facet, Table};

/// Read structural metadata from one database.
///
/// Implementations must be cheap to share between tasks: the parallel
/// extraction path clones the extractor once per table, so the connection
/// pool inside it has to be a shared handle.
#[async_trait]
pub trait SchemaExtractor: Send + Sync {
    /// Dialect this extractor speaks.
    fn dialect(&self) -> Dialect;

    /// List base table names in the configured schema, sorted ascending.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Load column definitions into `table`.
    async fn load_columns(&self, table: &mut Table) -> Result<()>;

    /// Load the primary key, if any, into `table`.
    async fn load_primary_key(&self, table: &mut Table) -> Result<()>;

    /// Load foreign key constraints into `table`.
    async fn load_foreign_keys(&self, table: &mut Table) -> Result<()>;

    /// Load unique constraints into `table`.
    async fn load_unique_constraints(&self, table: &mut Table) -> Result<()>;

    /// Load indexes that do not back a constraint into `table`.
    async fn load_indexes(&self, table: &mut Table) -> Result<()>;

    /// Load check constraints into `table`.
    async fn load_check_constraints(&self, table: &mut Table) -> Result<()>;

    /// Load every facet of one table.
    ///
    /// This is a template method: the six loaders run in order and the first
    /// failure is wrapped with the table name and the facet being loaded.
    async fn load_table(&self, name: &str) -> Result<Table> {
        let mut table = Table::new(name);
        let wrap = |facet: Facet| move |e: DiffError| DiffError::extraction(name, facet, e);

        self.load_columns(&mut table)
            .await
            .map_err(wrap(Facet::Columns))?;
        self.load_primary_key(&mut table)
            .await
            .map_err(wrap(Facet::PrimaryKey))?;
        self.load_foreign_keys(&mut table)
            .await
            .map_err(wrap(Facet::ForeignKeys))?;
        self.load_unique_constraints(&mut table)
            .await
            .map_err(wrap(Facet::UniqueConstraints))?;
        self.load_indexes(&mut table)
            .await
            .map_err(wrap(Facet::Indexes))?;
        self.load_check_constraints(&mut table)
            .await
            .map_err(wrap(Facet::CheckConstraints))?;

        debug!(
            "Loaded {}: {} columns, {} foreign keys, {} uniques, {} indexes, {} checks",
            name,
            table.columns.len(),
            table.foreign_keys.len(),
            table.unique_constraints.len(),
            table.indexes.len(),
            table.check_constraints.len()
        );

        Ok(table)
    }
}
