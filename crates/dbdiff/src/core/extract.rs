//! Sequential and parallel schema extraction.
//!
//! Both entry points drive a [`SchemaExtractor`] over every base table and
//! return either a complete [`Schema`] or the first error; a partially
//! populated schema never escapes.

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{DiffError, Result};

use super::schema::{Schema, Table};
use super::traits::SchemaExtractor;

/// Extract every table one after another.
///
/// One table's six facets are loaded to completion before the next table
/// begins.
pub async fn extract_schema<E>(extractor: &E) -> Result<Schema>
where
    E: SchemaExtractor + ?Sized,
{
    let names = extractor.list_tables().await?;
    debug!("Found {} tables ({})", names.len(), extractor.dialect());

    let mut schema = Schema::new();
    for name in &names {
        let table = extractor.load_table(name).await?;
        schema.insert(table);
    }

    info!(
        "Extracted {} tables from {} (sequential)",
        schema.len(),
        extractor.dialect()
    );
    Ok(schema)
}

/// Extract every table concurrently, one task per table.
///
/// Each task owns a clone of the extractor (and therefore of its pool
/// handle) and reports back `(slot, result)`. Results land in an
/// index-addressed slot vector and are merged only after every task has
/// joined. When several tables fail, the error for the earliest table in
/// listing order is returned and the others are logged.
pub async fn extract_schema_parallel<E>(extractor: &E) -> Result<Schema>
where
    E: SchemaExtractor + Clone + 'static,
{
    let names = extractor.list_tables().await?;
    debug!(
        "Found {} tables ({}), spawning one task per table",
        names.len(),
        extractor.dialect()
    );

    let mut tasks = JoinSet::new();
    for (slot, name) in names.iter().enumerate() {
        let extractor = extractor.clone();
        let name = name.clone();
        tasks.spawn(async move { (slot, extractor.load_table(&name).await) });
    }

    let mut slots: Vec<Option<Result<Table>>> = names.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((slot, result)) => slots[slot] = Some(result),
            Err(e) => warn!("Extraction task did not complete: {}", e),
        }
    }

    let mut schema = Schema::new();
    let mut first_error: Option<DiffError> = None;
    for (name, slot) in names.iter().zip(slots) {
        let result = slot.unwrap_or_else(|| {
            Err(DiffError::Task(format!(
                "task for table {} panicked or was aborted",
                name
            )))
        });
        match result {
            Ok(table) => schema.insert(table),
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(e) => warn!("Additional extraction failure: {}", e),
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    info!(
        "Extracted {} tables from {} (parallel)",
        schema.len(),
        extractor.dialect()
    );
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{
        CheckConstraint, Column, Facet, ForeignKey, Index, PrimaryKey, Unique,
    };
    use crate::drivers::Dialect;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    /// In-memory extractor serving a fixed set of tables.
    #[derive(Clone, Default)]
    struct MockExtractor {
        tables: Arc<BTreeMap<String, Table>>,
        failures: Arc<BTreeMap<String, Facet>>,
        panic_on: Option<String>,
    }

    impl MockExtractor {
        fn new(tables: Vec<Table>) -> Self {
            Self {
                tables: Arc::new(tables.into_iter().map(|t| (t.name.clone(), t)).collect()),
                ..Default::default()
            }
        }

        fn failing(mut self, table: &str, facet: Facet) -> Self {
            let mut failures = (*self.failures).clone();
            failures.insert(table.to_string(), facet);
            self.failures = Arc::new(failures);
            self
        }

        fn check(&self, table: &Table, facet: Facet) -> Result<&Table> {
            if self.panic_on.as_deref() == Some(table.name.as_str()) {
                panic!("simulated driver panic");
            }
            if self.failures.get(&table.name) == Some(&facet) {
                return Err(DiffError::Config(format!("boom on {}", table.name)));
            }
            self.tables
                .get(&table.name)
                .ok_or_else(|| DiffError::Config(format!("no such table {}", table.name)))
        }
    }

    #[async_trait]
    impl SchemaExtractor for MockExtractor {
        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }

        async fn list_tables(&self) -> Result<Vec<String>> {
            Ok(self.tables.keys().cloned().collect())
        }

        async fn load_columns(&self, table: &mut Table) -> Result<()> {
            let fixture = self.check(table, Facet::Columns)?;
            table.columns = fixture.columns.clone();
            Ok(())
        }

        async fn load_primary_key(&self, table: &mut Table) -> Result<()> {
            let fixture = self.check(table, Facet::PrimaryKey)?;
            table.primary_key = fixture.primary_key.clone();
            Ok(())
        }

        async fn load_foreign_keys(&self, table: &mut Table) -> Result<()> {
            let fixture = self.check(table, Facet::ForeignKeys)?;
            table.foreign_keys = fixture.foreign_keys.clone();
            Ok(())
        }

        async fn load_unique_constraints(&self, table: &mut Table) -> Result<()> {
            let fixture = self.check(table, Facet::UniqueConstraints)?;
            table.unique_constraints = fixture.unique_constraints.clone();
            Ok(())
        }

        async fn load_indexes(&self, table: &mut Table) -> Result<()> {
            let fixture = self.check(table, Facet::Indexes)?;
            table.indexes = fixture.indexes.clone();
            Ok(())
        }

        async fn load_check_constraints(&self, table: &mut Table) -> Result<()> {
            let fixture = self.check(table, Facet::CheckConstraints)?;
            table.check_constraints = fixture.check_constraints.clone();
            Ok(())
        }
    }

    fn make_test_table(name: &str) -> Table {
        let mut table = Table::new(name);
        table.add_column(Column::new("id", "integer", false));
        table.add_column(Column::new("created_at", "timestamp", false).with_default("now()"));
        table.set_primary_key(PrimaryKey {
            name: format!("{}_pkey", name),
            columns: vec!["id".to_string()],
        });
        table.add_index(Index {
            name: format!("idx_{}_created", name),
            columns: vec!["created_at".to_string()],
            is_unique: false,
        });
        table.add_check(CheckConstraint {
            name: format!("{}_id_positive", name),
            expression: "(id > 0)".to_string(),
        });
        table
    }

    fn make_test_extractor() -> MockExtractor {
        let mut orders = make_test_table("orders");
        orders.add_column(Column::new("user_id", "integer", false));
        orders.add_foreign_key(ForeignKey {
            name: "orders_user_id_fkey".to_string(),
            columns: vec!["user_id".to_string()],
            ref_table: "users".to_string(),
            ref_columns: vec!["id".to_string()],
            on_update: "NO ACTION".to_string(),
            on_delete: "CASCADE".to_string(),
        });

        let mut users = make_test_table("users");
        users.add_column(Column::new("email", "text", true));
        users.add_unique(Unique {
            name: "users_email_key".to_string(),
            columns: vec!["email".to_string()],
        });

        MockExtractor::new(vec![users, orders, make_test_table("audit_log")])
    }

    #[tokio::test]
    async fn test_sequential_extraction_loads_every_facet() {
        let extractor = make_test_extractor();
        let schema = extract_schema(&extractor).await.unwrap();

        assert_eq!(schema.len(), 3);
        let orders = schema.table("orders").unwrap();
        assert_eq!(orders.columns.len(), 3);
        assert!(orders.primary_key.is_some());
        assert!(orders.foreign_keys.contains_key("orders_user_id_fkey"));
        assert!(orders.indexes.contains_key("idx_orders_created"));
        assert!(orders.check_constraints.contains_key("orders_id_positive"));
        assert_eq!(schema, Schema::from_iter(extractor.tables.values().cloned()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_matches_sequential() {
        let extractor = make_test_extractor();
        let sequential = extract_schema(&extractor).await.unwrap();
        let parallel = extract_schema_parallel(&extractor).await.unwrap();
        assert_eq!(sequential, parallel);
    }

    #[tokio::test]
    async fn test_empty_database_yields_empty_schema() {
        let extractor = MockExtractor::new(Vec::new());
        assert!(extract_schema(&extractor).await.unwrap().is_empty());
        assert!(extract_schema_parallel(&extractor).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_wrapped_with_table_and_facet() {
        let extractor = make_test_extractor().failing("users", Facet::Indexes);

        let err = extract_schema(&extractor).await.unwrap_err();
        match err {
            DiffError::Extraction { table, facet, .. } => {
                assert_eq!(table, "users");
                assert_eq!(facet, Facet::Indexes);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_returns_first_submitted_error() {
        let extractor = make_test_extractor()
            .failing("users", Facet::Columns)
            .failing("audit_log", Facet::CheckConstraints);

        // audit_log sorts first, so its failure wins regardless of timing.
        for _ in 0..10 {
            let err = extract_schema_parallel(&extractor).await.unwrap_err();
            match err {
                DiffError::Extraction { table, facet, .. } => {
                    assert_eq!(table, "audit_log");
                    assert_eq!(facet, Facet::CheckConstraints);
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_parallel_panic_becomes_task_error() {
        let mut extractor = make_test_extractor();
        extractor.panic_on = Some("orders".to_string());

        let err = extract_schema_parallel(&extractor).await.unwrap_err();
        match err {
            DiffError::Task(msg) => assert!(msg.contains("orders")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
