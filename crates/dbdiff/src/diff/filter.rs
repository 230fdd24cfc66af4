//! Filtering rules applied during comparison.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::error::{DiffError, Result};

/// What the diff engine should leave out.
///
/// Filters only affect comparison; extraction always reads everything.
/// Unique constraints have no suppression switch.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    /// Exact table names to skip.
    pub ignore_tables: BTreeSet<String>,

    /// Tables whose name matches this pattern (unanchored) are skipped.
    pub ignore_table_pattern: Option<Regex>,

    /// Per-table column names to skip.
    pub ignore_columns: BTreeMap<String, BTreeSet<String>>,

    pub ignore_indexes: bool,
    pub ignore_foreign_keys: bool,
    pub ignore_checks: bool,
}

impl FilterConfig {
    /// A filter that keeps everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip a table by exact name.
    pub fn ignore_table(mut self, name: impl Into<String>) -> Self {
        self.ignore_tables.insert(name.into());
        self
    }

    /// Skip tables matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pattern does not compile.
    pub fn with_table_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            DiffError::Config(format!("Invalid ignore_table_pattern '{}': {}", pattern, e))
        })?;
        self.ignore_table_pattern = Some(regex);
        Ok(self)
    }

    /// Skip one column of one table.
    pub fn ignore_column(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.ignore_columns
            .entry(table.into())
            .or_default()
            .insert(column.into());
        self
    }

    /// Check if a table is excluded by exact name or pattern.
    pub fn should_ignore_table(&self, name: &str) -> bool {
        self.ignore_tables.contains(name)
            || self
                .ignore_table_pattern
                .as_ref()
                .is_some_and(|re| re.is_match(name))
    }

    /// Check if a column is excluded for the given table.
    pub fn should_ignore_column(&self, table: &str, column: &str) -> bool {
        self.ignore_columns
            .get(table)
            .is_some_and(|cols| cols.contains(column))
    }
}

/// Parse `table.column` entries into a per-table map.
///
/// # Errors
///
/// Returns a configuration error for entries without a dot or with an
/// empty half.
pub fn parse_column_list<'a>(
    entries: impl IntoIterator<Item = &'a str>,
) -> Result<BTreeMap<String, BTreeSet<String>>> {
    let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for entry in entries {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        match entry.split_once('.') {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                map.entry(table.to_string())
                    .or_default()
                    .insert(column.to_string());
            }
            _ => {
                return Err(DiffError::Config(format!(
                    "Invalid ignored column '{}': expected table.column",
                    entry
                )))
            }
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_pattern_table_matching() {
        let filter = FilterConfig::new()
            .ignore_table("schema_migrations")
            .with_table_pattern("^tmp_")
            .unwrap();

        assert!(filter.should_ignore_table("schema_migrations"));
        assert!(filter.should_ignore_table("tmp_import"));
        assert!(!filter.should_ignore_table("users"));
        assert!(!filter.should_ignore_table("Schema_migrations"));
    }

    #[test]
    fn test_pattern_is_unanchored() {
        let filter = FilterConfig::new().with_table_pattern("_bak").unwrap();
        assert!(filter.should_ignore_table("users_bak_2024"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = FilterConfig::new().with_table_pattern("([").unwrap_err();
        assert!(matches!(err, DiffError::Config(_)));
    }

    #[test]
    fn test_column_ignore_is_per_table() {
        let filter = FilterConfig::new().ignore_column("users", "updated_at");
        assert!(filter.should_ignore_column("users", "updated_at"));
        assert!(!filter.should_ignore_column("orders", "updated_at"));
        assert!(!filter.should_ignore_column("users", "created_at"));
    }

    #[test]
    fn test_parse_column_list() {
        let map = parse_column_list(["users.updated_at", " users.version ", "", "orders.note"])
            .unwrap();
        assert_eq!(map["users"].len(), 2);
        assert!(map["orders"].contains("note"));

        assert!(parse_column_list(["no_dot"]).is_err());
        assert!(parse_column_list([".col"]).is_err());
    }
}
