//! Comparison orchestrator: connect, extract both sides, diff.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::extract::{extract_schema, extract_schema_parallel};
use crate::core::schema::Schema;
use crate::core::traits::SchemaExtractor;
use crate::diff::{compute_diff, FilterConfig, SchemaDiff};
use crate::drivers::{Dialect, ExtractorImpl};
use crate::error::{DiffError, Result};

/// Connected source/target pair ready to be compared.
pub struct Comparator {
    config: Config,
    filter: FilterConfig,
    source: ExtractorImpl,
    target: ExtractorImpl,
}

/// Outcome of one comparison run.
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub diff: SchemaDiff,
    pub source_tables: usize,
    pub target_tables: usize,
    pub duration_seconds: f64,
}

impl Comparator {
    /// Validate the configuration and open both connection pools.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let filter = config.filter_config()?;
        let max_conns = config.extraction.get_max_connections();

        let (source, target) = tokio::try_join!(
            ExtractorImpl::connect(&config.source, max_conns),
            ExtractorImpl::connect(&config.target, max_conns),
        )?;

        Ok(Self {
            config,
            filter,
            source,
            target,
        })
    }

    /// Dialect of the source side, used as the migration hint.
    pub fn source_dialect(&self) -> Dialect {
        self.source.dialect()
    }

    /// Extract both schemas and compute their differences.
    pub async fn run(&self, cancel: CancellationToken) -> Result<ComparisonResult> {
        compare_extractors(
            &self.source,
            &self.target,
            self.config.extraction.parallel,
            &self.filter,
            cancel,
        )
        .await
    }
}

/// Extract both sides concurrently and diff them.
///
/// The two extractions race the cancellation token; cancelling drops both
/// in-flight extractions and returns [`DiffError::Cancelled`].
pub async fn compare_extractors<S, T>(
    source: &S,
    target: &T,
    parallel: bool,
    filter: &FilterConfig,
    cancel: CancellationToken,
) -> Result<ComparisonResult>
where
    S: SchemaExtractor + Clone + 'static,
    T: SchemaExtractor + Clone + 'static,
{
    let start = Instant::now();
    info!(
        "Phase 1: Extracting schemas ({} -> {}, {})",
        source.dialect(),
        target.dialect(),
        if parallel { "parallel" } else { "sequential" }
    );

    let extraction = async {
        tokio::try_join!(extract(source, parallel), extract(target, parallel))
    };

    let (source_schema, target_schema) = tokio::select! {
        _ = cancel.cancelled() => {
            warn!("Comparison cancelled during extraction");
            return Err(DiffError::Cancelled);
        }
        result = extraction => result?,
    };

    info!("Phase 2: Comparing schemas");
    let diff = compute_diff(&source_schema, &target_schema, filter);

    let duration = start.elapsed().as_secs_f64();
    info!(
        "Comparison finished in {:.2}s: {} difference(s)",
        duration,
        diff.change_count()
    );

    Ok(ComparisonResult {
        diff,
        source_tables: source_schema.len(),
        target_tables: target_schema.len(),
        duration_seconds: duration,
    })
}

async fn extract<E>(extractor: &E, parallel: bool) -> Result<Schema>
where
    E: SchemaExtractor + Clone + 'static,
{
    if parallel {
        extract_schema_parallel(extractor).await
    } else {
        extract_schema(extractor).await
    }
}

impl ComparisonResult {
    /// True when the schemas differ after filtering.
    pub fn has_drift(&self) -> bool {
        !self.diff.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, Table};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    /// Serves column-only tables; optionally stalls on `list_tables`.
    #[derive(Clone)]
    struct FixtureExtractor {
        tables: Arc<Vec<Table>>,
        stall: bool,
    }

    impl FixtureExtractor {
        fn new(tables: Vec<Table>) -> Self {
            Self {
                tables: Arc::new(tables),
                stall: false,
            }
        }

        fn lookup(&self, name: &str) -> Result<&Table> {
            self.tables
                .iter()
                .find(|t| t.name == name)
                .ok_or_else(|| DiffError::Config(format!("no such table {}", name)))
        }
    }

    #[async_trait]
    impl SchemaExtractor for FixtureExtractor {
        fn dialect(&self) -> Dialect {
            Dialect::Mysql
        }

        async fn list_tables(&self) -> Result<Vec<String>> {
            if self.stall {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(self.tables.iter().map(|t| t.name.clone()).collect())
        }

        async fn load_columns(&self, table: &mut Table) -> Result<()> {
            table.columns = self.lookup(&table.name)?.columns.clone();
            Ok(())
        }

        async fn load_primary_key(&self, _table: &mut Table) -> Result<()> {
            Ok(())
        }

        async fn load_foreign_keys(&self, _table: &mut Table) -> Result<()> {
            Ok(())
        }

        async fn load_unique_constraints(&self, _table: &mut Table) -> Result<()> {
            Ok(())
        }

        async fn load_indexes(&self, _table: &mut Table) -> Result<()> {
            Ok(())
        }

        async fn load_check_constraints(&self, _table: &mut Table) -> Result<()> {
            Ok(())
        }
    }

    fn make_test_table(name: &str, columns: &[(&str, &str)]) -> Table {
        let mut table = Table::new(name);
        for (column, data_type) in columns {
            table.add_column(Column::new(*column, *data_type, true));
        }
        table
    }

    #[tokio::test]
    async fn test_identical_schemas_have_no_drift() {
        let tables = vec![make_test_table("users", &[("id", "int"), ("email", "varchar(255)")])];
        let source = FixtureExtractor::new(tables.clone());
        let target = FixtureExtractor::new(tables);

        let result = compare_extractors(
            &source,
            &target,
            false,
            &FilterConfig::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(!result.has_drift());
        assert_eq!(result.source_tables, 1);
        assert_eq!(result.target_tables, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_drift_detected_in_parallel_mode() {
        let source = FixtureExtractor::new(vec![
            make_test_table("users", &[("id", "int"), ("email", "varchar(255)")]),
            make_test_table("orders", &[("id", "int")]),
        ]);
        let target = FixtureExtractor::new(vec![make_test_table(
            "users",
            &[("id", "bigint"), ("email", "varchar(255)")],
        )]);

        let result = compare_extractors(
            &source,
            &target,
            true,
            &FilterConfig::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(result.has_drift());
        assert_eq!(result.diff.tables_only_in_source, vec!["orders".to_string()]);
        assert_eq!(result.diff.table_diffs.len(), 1);
        assert_eq!(result.diff.table_diffs[0].column_diffs[0].diff, "type: int → bigint");
    }

    #[tokio::test]
    async fn test_filter_is_applied() {
        let source = FixtureExtractor::new(vec![make_test_table("tmp_import", &[("id", "int")])]);
        let target = FixtureExtractor::new(Vec::new());
        let filter = FilterConfig::new().with_table_pattern("^tmp_").unwrap();

        let result =
            compare_extractors(&source, &target, false, &filter, CancellationToken::new())
                .await
                .unwrap();
        assert!(!result.has_drift());
    }

    #[tokio::test]
    async fn test_cancellation_stops_extraction() {
        let mut source = FixtureExtractor::new(vec![make_test_table("users", &[("id", "int")])]);
        source.stall = true;
        let target = source.clone();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = compare_extractors(&source, &target, false, &FilterConfig::default(), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DiffError::Cancelled));
    }
}
