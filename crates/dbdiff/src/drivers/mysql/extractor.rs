//! MySQL/MariaDB schema extractor.
//!
//! Uses SQLx for connection pooling. All catalog reads go through
//! `INFORMATION_SCHEMA` for the database named in the connection URL.
//! Multi-column constraints are fetched one row per column and grouped
//! in Rust, so column names containing commas survive intact.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlDatabaseError, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::schema::{
    CheckConstraint, Column, ForeignKey, Index, PrimaryKey, Table, Unique,
};
use crate::core::traits::SchemaExtractor;
use crate::drivers::{check_pool_size, Dialect};
use crate::error::{DiffError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// MySQL/MariaDB schema extractor.
///
/// Cloning shares the underlying pool.
#[derive(Clone)]
pub struct MysqlExtractor {
    pool: MySqlPool,
    database: String,
}

impl MysqlExtractor {
    /// Connect to MySQL and resolve the current database.
    pub async fn new(config: &ConnectionConfig, max_conns: usize) -> Result<Self> {
        check_pool_size(max_conns)?;
        let max_conns = u32::try_from(max_conns).map_err(|_| {
            DiffError::Config(format!("MySQL pool size {} is out of range", max_conns))
        })?;

        let pool = MySqlPoolOptions::new()
            .max_connections(max_conns)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect(&config.url)
            .await
            .map_err(|e| DiffError::pool(e, "creating MySQL pool"))?;

        let database: Option<String> = sqlx::query_scalar("SELECT CAST(DATABASE() AS CHAR(255))")
            .fetch_one(&pool)
            .await
            .map_err(|e| DiffError::pool(e, "testing MySQL connection"))?;

        let database = database.ok_or_else(|| {
            DiffError::Config("MySQL connection URL must name a database".to_string())
        })?;

        info!("Connected to MySQL database '{}'", database);

        Ok(Self { pool, database })
    }

    async fn fetch_raw(&self, query: &str, table: &str) -> sqlx::Result<Vec<MySqlRow>> {
        sqlx::query(query)
            .bind(&self.database)
            .bind(table)
            .fetch_all(&self.pool)
            .await
    }

    async fn fetch(&self, query: &str, table: &str, context: &str) -> Result<Vec<MySqlRow>> {
        self.fetch_raw(query, table)
            .await
            .map_err(|e| DiffError::pool(e, format!("loading MySQL {}", context)))
    }
}

/// `ER_UNKNOWN_TABLE`: unknown table in a system schema.
const ER_UNKNOWN_TABLE: u16 = 1109;

/// SQLSTATE for "base table or view not found".
const SQLSTATE_NO_SUCH_TABLE: &str = "42S02";

/// True when `err` means the server has no check-constraint catalog.
fn is_missing_catalog(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let number = db
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(MySqlDatabaseError::number);
            is_missing_catalog_code(db.code().as_deref(), number)
        }
        _ => false,
    }
}

fn is_missing_catalog_code(sqlstate: Option<&str>, number: Option<u16>) -> bool {
    number == Some(ER_UNKNOWN_TABLE) || sqlstate == Some(SQLSTATE_NO_SUCH_TABLE)
}

/// One row of a foreign key column listing.
#[derive(Debug, Clone)]
struct ForeignKeyColumn {
    constraint: String,
    column: String,
    ref_table: String,
    ref_column: String,
    update_rule: String,
    delete_rule: String,
}

/// Fold per-column rows (already in ordinal order) into foreign keys.
fn group_foreign_keys(rows: Vec<ForeignKeyColumn>) -> Vec<ForeignKey> {
    let mut fk_map: BTreeMap<String, ForeignKey> = BTreeMap::new();

    for row in rows {
        let fk = fk_map
            .entry(row.constraint.clone())
            .or_insert_with(|| ForeignKey {
                name: row.constraint,
                columns: Vec::new(),
                ref_table: row.ref_table,
                ref_columns: Vec::new(),
                on_update: row.update_rule,
                on_delete: row.delete_rule,
            });
        fk.columns.push(row.column);
        fk.ref_columns.push(row.ref_column);
    }

    fk_map.into_values().collect()
}

/// Fold `(name, column)` rows (already in ordinal order) into column lists.
fn group_columns(rows: Vec<(String, String)>) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, column) in rows {
        grouped.entry(name).or_default().push(column);
    }
    grouped
}

#[async_trait]
impl SchemaExtractor for MysqlExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        // CAST to CHAR: information_schema may return VARBINARY under some collations
        let query = r#"
            SELECT CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&self.database)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DiffError::pool(e, "listing MySQL tables"))?;

        let mut tables: Vec<String> = rows.iter().map(|row| row.get("TABLE_NAME")).collect();
        tables.sort();
        Ok(tables)
    }

    async fn load_columns(&self, table: &mut Table) -> Result<()> {
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(COLUMN_TYPE AS CHAR(255)) AS COLUMN_TYPE,
                CAST(IS_NULLABLE = 'YES' AS SIGNED) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR(4000)) AS COLUMN_DEFAULT
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = self.fetch(query, &table.name, "columns").await?;

        for row in rows {
            table.add_column(Column {
                name: row.get("COLUMN_NAME"),
                data_type: row.get("COLUMN_TYPE"),
                is_nullable: row.get::<i64, _>("is_nullable") == 1,
                default_value: row.get::<Option<String>, _>("COLUMN_DEFAULT"),
            });
        }

        debug!("Loaded {} columns for {}", table.columns.len(), table.name);
        Ok(())
    }

    async fn load_primary_key(&self, table: &mut Table) -> Result<()> {
        let query = r#"
            SELECT CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = self.fetch(query, &table.name, "primary key").await?;
        let columns: Vec<String> = rows.iter().map(|row| row.get("COLUMN_NAME")).collect();

        if !columns.is_empty() {
            table.set_primary_key(PrimaryKey {
                name: "PRIMARY".to_string(),
                columns,
            });
        }

        debug!("Primary key for {}: {:?}", table.name, table.primary_key);
        Ok(())
    }

    async fn load_foreign_keys(&self, table: &mut Table) -> Result<()> {
        let query = r#"
            SELECT
                CAST(kcu.CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(kcu.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(kcu.REFERENCED_TABLE_NAME AS CHAR(255)) AS REFERENCED_TABLE_NAME,
                CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR(255)) AS REFERENCED_COLUMN_NAME,
                CAST(rc.UPDATE_RULE AS CHAR(64)) AS UPDATE_RULE,
                CAST(rc.DELETE_RULE AS CHAR(64)) AS DELETE_RULE
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
            JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
                ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
                AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
                AND rc.TABLE_NAME = kcu.TABLE_NAME
            WHERE kcu.TABLE_SCHEMA = ? AND kcu.TABLE_NAME = ?
              AND kcu.REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#;

        let rows = self.fetch(query, &table.name, "foreign keys").await?;

        let fk_rows = rows
            .iter()
            .map(|row| ForeignKeyColumn {
                constraint: row.get("CONSTRAINT_NAME"),
                column: row.get("COLUMN_NAME"),
                ref_table: row.get("REFERENCED_TABLE_NAME"),
                ref_column: row.get("REFERENCED_COLUMN_NAME"),
                update_rule: row.get("UPDATE_RULE"),
                delete_rule: row.get("DELETE_RULE"),
            })
            .collect();

        for fk in group_foreign_keys(fk_rows) {
            table.add_foreign_key(fk);
        }

        debug!(
            "Loaded {} foreign keys for {}",
            table.foreign_keys.len(),
            table.name
        );
        Ok(())
    }

    async fn load_unique_constraints(&self, table: &mut Table) -> Result<()> {
        let query = r#"
            SELECT
                CAST(kcu.CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(kcu.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
            JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
                ON tc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
                AND tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
                AND tc.TABLE_NAME = kcu.TABLE_NAME
            WHERE kcu.TABLE_SCHEMA = ? AND kcu.TABLE_NAME = ?
              AND tc.CONSTRAINT_TYPE = 'UNIQUE'
            ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#;

        let rows = self.fetch(query, &table.name, "unique constraints").await?;
        let pairs = rows
            .iter()
            .map(|row| (row.get("CONSTRAINT_NAME"), row.get("COLUMN_NAME")))
            .collect();

        for (name, columns) in group_columns(pairs) {
            table.add_unique(Unique { name, columns });
        }

        debug!(
            "Loaded {} unique constraints for {}",
            table.unique_constraints.len(),
            table.name
        );
        Ok(())
    }

    async fn load_indexes(&self, table: &mut Table) -> Result<()> {
        // Functional index parts have a NULL COLUMN_NAME and are skipped.
        let query = r#"
            SELECT
                CAST(s.INDEX_NAME AS CHAR(255)) AS INDEX_NAME,
                CAST(s.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(s.NON_UNIQUE AS SIGNED) AS NON_UNIQUE
            FROM INFORMATION_SCHEMA.STATISTICS s
            WHERE s.TABLE_SCHEMA = ? AND s.TABLE_NAME = ?
              AND s.INDEX_NAME != 'PRIMARY'
              AND s.INDEX_NAME NOT IN (
                  SELECT tc.CONSTRAINT_NAME
                  FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
                  WHERE tc.TABLE_SCHEMA = s.TABLE_SCHEMA
                    AND tc.TABLE_NAME = s.TABLE_NAME
                    AND tc.CONSTRAINT_TYPE IN ('UNIQUE', 'FOREIGN KEY')
              )
            ORDER BY s.INDEX_NAME, s.SEQ_IN_INDEX
        "#;

        let rows = self.fetch(query, &table.name, "indexes").await?;

        let mut uniqueness: BTreeMap<String, bool> = BTreeMap::new();
        let mut pairs = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.get("INDEX_NAME");
            let non_unique: i64 = row.get("NON_UNIQUE");
            uniqueness.insert(name.clone(), non_unique == 0);
            if let Some(column) = row.get::<Option<String>, _>("COLUMN_NAME") {
                pairs.push((name, column));
            }
        }

        let mut columns_by_index = group_columns(pairs);
        for (name, is_unique) in uniqueness {
            let columns = columns_by_index.remove(&name).unwrap_or_default();
            table.add_index(Index {
                name,
                columns,
                is_unique,
            });
        }

        debug!("Loaded {} indexes for {}", table.indexes.len(), table.name);
        Ok(())
    }

    async fn load_check_constraints(&self, table: &mut Table) -> Result<()> {
        let query = r#"
            SELECT
                CAST(cc.CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(cc.CHECK_CLAUSE AS CHAR(4000)) AS CHECK_CLAUSE
            FROM INFORMATION_SCHEMA.CHECK_CONSTRAINTS cc
            JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
                ON cc.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
                AND cc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
            WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ?
              AND tc.CONSTRAINT_TYPE = 'CHECK'
        "#;

        // Servers before MySQL 8.0.16 have no CHECK_CONSTRAINTS view.
        let rows = match self.fetch_raw(query, &table.name).await {
            Ok(rows) => rows,
            Err(e) if is_missing_catalog(&e) => {
                debug!(
                    "Skipping check constraints for {} (catalog unavailable): {}",
                    table.name, e
                );
                return Ok(());
            }
            Err(e) => return Err(DiffError::pool(e, "loading MySQL check constraints")),
        };

        for row in rows {
            table.add_check(CheckConstraint {
                name: row.get("CONSTRAINT_NAME"),
                expression: row.get("CHECK_CLAUSE"),
            });
        }

        debug!(
            "Loaded {} check constraints for {}",
            table.check_constraints.len(),
            table.name
        );
        Ok(())
    }
}
