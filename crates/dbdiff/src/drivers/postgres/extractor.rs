//! PostgreSQL schema extractor.
//!
//! Reads table structure from `information_schema` and `pg_catalog` over a
//! deadpool-postgres pool. Every facet query is scoped to one schema
//! (default `public`) and one table.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::config::Host;
use tokio_postgres::Config as PgConfig;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::schema::{
    CheckConstraint, Column, ForeignKey, Index, PrimaryKey, Table, Unique,
};
use crate::core::traits::SchemaExtractor;
use crate::drivers::common::TlsBuilder;
use crate::drivers::{check_pool_size, Dialect};
use crate::error::{DiffError, Result};

/// PostgreSQL schema extractor.
///
/// Cloning shares the underlying pool.
#[derive(Clone)]
pub struct PostgresExtractor {
    pool: Pool,
    schema: String,
}

impl PostgresExtractor {
    /// Connect to PostgreSQL and verify the connection with a ping.
    pub async fn new(config: &ConnectionConfig, max_conns: usize) -> Result<Self> {
        check_pool_size(max_conns)?;

        let pg_config: PgConfig = config
            .url
            .parse()
            .map_err(|e| DiffError::Config(format!("Invalid PostgreSQL URL: {}", e)))?;
        let target = describe_target(&pg_config);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let pool = match TlsBuilder::parse(&config.ssl_mode)?.build()? {
            None => {
                debug!("PostgreSQL TLS is disabled for {}", target);
                let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_conns)
                    .build()
                    .map_err(|e| DiffError::pool(e, "creating PostgreSQL pool"))?
            }
            Some(tls) => {
                let mgr = Manager::from_config(pg_config, tls, mgr_config);
                Pool::builder(mgr)
                    .max_size(max_conns)
                    .build()
                    .map_err(|e| DiffError::pool(e, "creating PostgreSQL pool"))?
            }
        };

        let client = pool
            .get()
            .await
            .map_err(|e| DiffError::pool(e, format!("connecting to PostgreSQL at {}", target)))?;
        client.simple_query("SELECT 1").await?;

        info!("Connected to PostgreSQL: {} (schema '{}')", target, config.schema);

        Ok(Self {
            pool,
            schema: config.schema.clone(),
        })
    }

    async fn client(&self, context: &str) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| DiffError::pool(e, format!("getting connection for {}", context)))
    }
}

/// Host and database of a connection, without credentials.
fn describe_target(config: &PgConfig) -> String {
    let host = match config.get_hosts().first() {
        Some(Host::Tcp(h)) => h.clone(),
        #[cfg(unix)]
        Some(Host::Unix(path)) => path.display().to_string(),
        None => "localhost".to_string(),
    };
    let port = config.get_ports().first().copied().unwrap_or(5432);
    format!(
        "{}:{}/{}",
        host,
        port,
        config.get_dbname().unwrap_or_default()
    )
}

/// Map a `pg_constraint` referential action code to its SQL keyword.
fn referential_action(code: i8) -> &'static str {
    match code as u8 {
        b'r' => "RESTRICT",
        b'c' => "CASCADE",
        b'n' => "SET NULL",
        b'd' => "SET DEFAULT",
        _ => "NO ACTION",
    }
}

#[async_trait]
impl SchemaExtractor for PostgresExtractor {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let client = self.client("list_tables").await?;

        let query = r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = client.query(query, &[&self.schema]).await?;
        let mut tables: Vec<String> = rows.iter().map(|row| row.get(0)).collect();
        // Server collation may not be bytewise; slot order must match key order.
        tables.sort();
        Ok(tables)
    }

    async fn load_columns(&self, table: &mut Table) -> Result<()> {
        let client = self.client("load_columns").await?;

        let query = r#"
            SELECT
                column_name::text,
                data_type::text,
                is_nullable = 'YES',
                column_default::text
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
        "#;

        let rows = client.query(query, &[&self.schema, &table.name]).await?;

        for row in rows {
            table.add_column(Column {
                name: row.get(0),
                data_type: row.get(1),
                is_nullable: row.get(2),
                default_value: row.get::<_, Option<String>>(3),
            });
        }

        debug!("Loaded {} columns for {}", table.columns.len(), table.name);
        Ok(())
    }

    async fn load_primary_key(&self, table: &mut Table) -> Result<()> {
        let client = self.client("load_primary_key").await?;

        let query = r#"
            SELECT
                c.conname::text,
                array_agg(a.attname::text ORDER BY array_position(c.conkey, a.attnum))
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(c.conkey)
            WHERE n.nspname = $1
              AND t.relname = $2
              AND c.contype = 'p'
            GROUP BY c.conname
        "#;

        if let Some(row) = client
            .query_opt(query, &[&self.schema, &table.name])
            .await?
        {
            table.set_primary_key(PrimaryKey {
                name: row.get(0),
                columns: row.get(1),
            });
        }

        debug!("Primary key for {}: {:?}", table.name, table.primary_key);
        Ok(())
    }

    async fn load_foreign_keys(&self, table: &mut Table) -> Result<()> {
        let client = self.client("load_foreign_keys").await?;

        // Columns and referenced columns are unnested pairwise so that
        // composite keys stay index-aligned.
        let query = r#"
            SELECT
                c.conname::text,
                array_agg(a.attname::text ORDER BY k.ord),
                rt.relname::text,
                array_agg(ra.attname::text ORDER BY k.ord),
                c.confupdtype,
                c.confdeltype
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_class rt ON rt.oid = c.confrelid
            CROSS JOIN LATERAL unnest(c.conkey, c.confkey) WITH ORDINALITY AS k(attnum, refnum, ord)
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            JOIN pg_catalog.pg_attribute ra ON ra.attrelid = rt.oid AND ra.attnum = k.refnum
            WHERE n.nspname = $1
              AND t.relname = $2
              AND c.contype = 'f'
            GROUP BY c.conname, rt.relname, c.confupdtype, c.confdeltype
        "#;

        let rows = client.query(query, &[&self.schema, &table.name]).await?;

        for row in rows {
            table.add_foreign_key(ForeignKey {
                name: row.get(0),
                columns: row.get(1),
                ref_table: row.get(2),
                ref_columns: row.get(3),
                on_update: referential_action(row.get(4)).to_string(),
                on_delete: referential_action(row.get(5)).to_string(),
            });
        }

        debug!(
            "Loaded {} foreign keys for {}",
            table.foreign_keys.len(),
            table.name
        );
        Ok(())
    }

    async fn load_unique_constraints(&self, table: &mut Table) -> Result<()> {
        let client = self.client("load_unique_constraints").await?;

        let query = r#"
            SELECT
                c.conname::text,
                array_agg(a.attname::text ORDER BY array_position(c.conkey, a.attnum))
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(c.conkey)
            WHERE n.nspname = $1
              AND t.relname = $2
              AND c.contype = 'u'
            GROUP BY c.conname
        "#;

        let rows = client.query(query, &[&self.schema, &table.name]).await?;

        for row in rows {
            table.add_unique(Unique {
                name: row.get(0),
                columns: row.get(1),
            });
        }

        debug!(
            "Loaded {} unique constraints for {}",
            table.unique_constraints.len(),
            table.name
        );
        Ok(())
    }

    async fn load_indexes(&self, table: &mut Table) -> Result<()> {
        let client = self.client("load_indexes").await?;

        // Expression indexes have attnum 0 entries in indkey; those columns
        // are simply not joined, matching what the catalog can name.
        let query = r#"
            SELECT
                i.relname::text,
                array_agg(a.attname::text ORDER BY array_position(ix.indkey::int2[], a.attnum)),
                ix.indisunique
            FROM pg_catalog.pg_index ix
            JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
            JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey::int2[])
            WHERE n.nspname = $1
              AND t.relname = $2
              AND NOT ix.indisprimary
              AND NOT EXISTS (
                  SELECT 1 FROM pg_catalog.pg_constraint c
                  WHERE c.conindid = ix.indexrelid
                    AND c.conrelid = t.oid
                    AND c.contype IN ('p', 'u', 'x')
              )
            GROUP BY i.relname, ix.indisunique
        "#;

        let rows = client.query(query, &[&self.schema, &table.name]).await?;

        for row in rows {
            table.add_index(Index {
                name: row.get(0),
                columns: row.get(1),
                is_unique: row.get(2),
            });
        }

        debug!("Loaded {} indexes for {}", table.indexes.len(), table.name);
        Ok(())
    }

    async fn load_check_constraints(&self, table: &mut Table) -> Result<()> {
        let client = self.client("load_check_constraints").await?;

        let query = r#"
            SELECT c.conname::text, pg_get_constraintdef(c.oid)
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            WHERE n.nspname = $1 AND t.relname = $2 AND c.contype = 'c'
        "#;

        let rows = client.query(query, &[&self.schema, &table.name]).await?;

        for row in rows {
            table.add_check(CheckConstraint {
                name: row.get(0),
                expression: row.get(1),
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
