//! Database driver implementations.
//!
//! - [`postgres`]: PostgreSQL extractor (deadpool-postgres)
//! - [`mysql`]: MySQL/MariaDB extractor (SQLx)
//! - [`common`]: Shared utilities (TLS)
//!
//! # Static dispatch
//!
//! The set of dialects is closed, so [`ExtractorImpl`] wraps the concrete
//! extractors in an enum instead of a `Box<dyn SchemaExtractor>` and
//! implements the trait by delegation.
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/` implementing `SchemaExtractor`
//! 2. Add a variant to [`Dialect`] and [`ExtractorImpl`]
//! 3. Accept its driver names in [`Dialect::parse`]

pub mod common;
pub mod mysql;
pub mod postgres;

use std::fmt;

pub use common::{SslMode, TlsBuilder};
pub use mysql::MysqlExtractor;
pub use postgres::PostgresExtractor;

use async_trait::async_trait;

use crate::config::{ConnectionConfig, MAX_CONNECTIONS_LIMIT};
use crate::core::schema::Table;
use crate::core::traits::SchemaExtractor;
use crate::error::{DiffError, Result};

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Mysql,
}

impl Dialect {
    /// Parse a driver name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the driver is not recognized.
    pub fn parse(driver: &str) -> Result<Self> {
        match driver.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::Mysql),
            other => Err(DiffError::Config(format!(
                "Unsupported driver: '{}'. Supported drivers: postgres, mysql",
                other
            ))),
        }
    }

    /// Canonical driver name.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reject pool sizes the pool builders cannot allocate.
pub(crate) fn check_pool_size(max_conns: usize) -> Result<()> {
    if max_conns == 0 || max_conns > MAX_CONNECTIONS_LIMIT {
        return Err(DiffError::Config(format!(
            "Pool size must be between 1 and {}, got {}",
            MAX_CONNECTIONS_LIMIT, max_conns
        )));
    }
    Ok(())
}

/// Enum-based static dispatch over the concrete extractors.
///
/// This provides zero-cost polymorphism: the compiler generates a match
/// instead of a vtable call, and the enum stays `Clone` for the parallel
/// extraction path.
#[derive(Clone)]
pub enum ExtractorImpl {
    Postgres(PostgresExtractor),
    Mysql(MysqlExtractor),
}

impl ExtractorImpl {
    /// Connect to the database described by `config`.
    pub async fn connect(config: &ConnectionConfig, max_conns: usize) -> Result<Self> {
        match Dialect::parse(&config.driver)? {
            Dialect::Postgres => Ok(ExtractorImpl::Postgres(
                PostgresExtractor::new(config, max_conns).await?,
            )),
            Dialect::Mysql => Ok(ExtractorImpl::Mysql(
                MysqlExtractor::new(config, max_conns).await?,
            )),
        }
    }
}

#[async_trait]
impl SchemaExtractor for ExtractorImpl {
    fn dialect(&self) -> Dialect {
        match self {
            ExtractorImpl::Postgres(e) => e.dialect(),
            ExtractorImpl::Mysql(e) => e.dialect(),
        }
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        match self {
            ExtractorImpl::Postgres(e) => e.list_tables().await,
            ExtractorImpl::Mysql(e) => e.list_tables().await,
        }
    }

    async fn load_columns(&self, table: &mut Table) -> Result<()> {
        match self {
            ExtractorImpl::Postgres(e) => e.load_columns(table).await,
            ExtractorImpl::Mysql(e) => e.load_columns(table).await,
        }
    }

    async fn load_primary_key(&self, table: &mut Table) -> Result<()> {
        match self {
            ExtractorImpl::Postgres(e) => e.load_primary_key(table).await,
            ExtractorImpl::Mysql(e) => e.load_primary_key(table).await,
        }
    }

    async fn load_foreign_keys(&self, table: &mut Table) -> Result<()> {
        match self {
            ExtractorImpl::Postgres(e) => e.load_foreign_keys(table).await,
            ExtractorImpl::Mysql(e) => e.load_foreign_keys(table).await,
        }
    }

    async fn load_unique_constraints(&self, table: &mut Table) -> Result<()> {
        match self {
            ExtractorImpl::Postgres(e) => e.load_unique_constraints(table).await,
            ExtractorImpl::Mysql(e) => e.load_unique_constraints(table).await,
        }
    }

    async fn load_indexes(&self, table: &mut Table) -> Result<()> {
        match self {
            ExtractorImpl::Postgres(e) => e.load_indexes(table).await,
            ExtractorImpl::Mysql(e) => e.load_indexes(table).await,
        }
    }

    async fn load_check_constraints(&self, table: &mut Table) -> Result<()> {
        match self {
            ExtractorImpl::Postgres(e) => e.load_check_constraints(table).await,
            ExtractorImpl::Mysql(e) => e.load_check_constraints(table).await,
        }
    }
}
