//! Schema and metadata types for database tables, columns, indexes, and constraints.
//!
//! These types provide a dialect-agnostic snapshot of one database's base
//! tables. A [`Schema`] is built once per extraction and treated as immutable
//! afterwards; the diff engine only ever borrows it.
//!
//! Every collection is a [`BTreeMap`] keyed by the name the database assigns,
//! so iteration is always in ascending key order regardless of the order the
//! catalog queries returned rows in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One of the six structural categories compared per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Columns,
    PrimaryKey,
    ForeignKeys,
    UniqueConstraints,
    Indexes,
    CheckConstraints,
}

impl Facet {
    /// Title-case label used in human-readable reports.
    pub fn label(&self) -> &'static str {
        match self {
            Facet::Columns => "Columns",
            Facet::PrimaryKey => "Primary Key",
            Facet::ForeignKeys => "Foreign Keys",
            Facet::UniqueConstraints => "Unique Constraints",
            Facet::Indexes => "Indexes",
            Facet::CheckConstraints => "Check Constraints",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Facet::Columns => "columns",
            Facet::PrimaryKey => "primary key",
            Facet::ForeignKeys => "foreign keys",
            Facet::UniqueConstraints => "unique constraints",
            Facet::Indexes => "indexes",
            Facet::CheckConstraints => "check constraints",
        };
        f.write_str(name)
    }
}

/// Complete structural description of one database's base tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Tables keyed by their case-sensitive name.
    pub tables: BTreeMap<String, Table>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table, replacing any table with the same name.
    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the schema has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<Table> for Schema {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for table in iter {
            schema.insert(table);
        }
        schema
    }
}

/// Table metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Column definitions keyed by column name.
    pub columns: BTreeMap<String, Column>,

    /// Primary key, if the table has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKey>,

    /// Foreign key constraints keyed by constraint name.
    pub foreign_keys: BTreeMap<String, ForeignKey>,

    /// Unique constraints keyed by constraint name.
    pub unique_constraints: BTreeMap<String, Unique>,

    /// Indexes not backing a constraint, keyed by index name.
    pub indexes: BTreeMap<String, Index>,

    /// Check constraints keyed by constraint name.
    pub check_constraints: BTreeMap<String, CheckConstraint>,
}

impl Table {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a column keyed by its name.
    pub fn add_column(&mut self, column: Column) {
        self.columns.insert(column.name.clone(), column);
    }

    /// Set the primary key. A missing constraint name is synthesized.
    pub fn set_primary_key(&mut self, mut pk: PrimaryKey) {
        if pk.name.is_empty() {
            pk.name = synthesize_name(&self.name, &pk.columns, "pkey");
        }
        self.primary_key = Some(pk);
    }

    /// Add a foreign key. A missing constraint name is synthesized.
    pub fn add_foreign_key(&mut self, mut fk: ForeignKey) {
        if fk.name.is_empty() {
            fk.name = synthesize_name(&self.name, &fk.columns, "fkey");
        }
        self.foreign_keys.insert(fk.name.clone(), fk);
    }

    /// Add a unique constraint. A missing constraint name is synthesized.
    pub fn add_unique(&mut self, mut unique: Unique) {
        if unique.name.is_empty() {
            unique.name = synthesize_name(&self.name, &unique.columns, "key");
        }
        self.unique_constraints.insert(unique.name.clone(), unique);
    }

    /// Add an index. A missing index name is synthesized.
    pub fn add_index(&mut self, mut index: Index) {
        if index.name.is_empty() {
            index.name = synthesize_name(&self.name, &index.columns, "idx");
        }
        self.indexes.insert(index.name.clone(), index);
    }

    /// Add a check constraint. A missing constraint name is synthesized
    /// from the expression text.
    pub fn add_check(&mut self, mut check: CheckConstraint) {
        if check.name.is_empty() {
            let words: Vec<String> = check
                .expression
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|w| !w.is_empty())
                .map(str::to_ascii_lowercase)
                .collect();
            check.name = format!("{}_{}_check", self.name, words.join("_"));
        }
        self.check_constraints.insert(check.name.clone(), check);
    }
}

/// Build a deterministic constraint name from the table, the sorted column
/// list and a kind suffix, e.g. `users_email_tenant_id_key`.
pub fn synthesize_name(table: &str, columns: &[String], suffix: &str) -> String {
    let mut sorted: Vec<&str> = columns.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    format!("{}_{}_{}", table, sorted.join("_"), suffix)
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Dialect-native type signature (e.g., "integer", "varchar(255)").
    pub data_type: String,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Default expression as reported by the catalog. `None` means the
    /// catalog reported no default at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl Column {
    /// Create a column without a default.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, is_nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable,
            default_value: None,
        }
    }

    /// Set the default expression.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }
}

/// Primary key metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Constraint name.
    pub name: String,

    /// Key columns in ordinal position order.
    pub columns: Vec<String>,
}

/// Foreign key metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Referencing columns.
    pub columns: Vec<String>,

    /// Referenced table name.
    pub ref_table: String,

    /// Referenced columns, index-aligned with `columns`.
    pub ref_columns: Vec<String>,

    /// ON UPDATE action (e.g. "CASCADE", "NO ACTION").
    pub on_update: String,

    /// ON DELETE action.
    pub on_delete: String,
}

/// Unique constraint metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unique {
    /// Constraint name.
    pub name: String,

    /// Constrained columns.
    pub columns: Vec<String>,
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,

    /// Indexed column names.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub is_unique: bool,
}

/// Check constraint metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraint {
    /// Constraint name.
    pub name: String,

    /// Raw check expression in the dialect's own syntax.
    pub expression: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_schema_keys_tables_by_name() {
        let schema: Schema = vec![Table::new("users"), Table::new("accounts")]
            .into_iter()
            .collect();

        let names: Vec<&String> = schema.tables.keys().collect();
        assert_eq!(names, vec!["accounts", "users"]);
        assert_eq!(schema.len(), 2);
        assert!(schema.table("users").is_some());
        assert!(schema.table("Users").is_none());
    }

    #[test]
    fn test_synthesized_names_ignore_column_order() {
        let a = synthesize_name("users", &cols(&["tenant_id", "email"]), "key");
        let b = synthesize_name("users", &cols(&["email", "tenant_id"]), "key");
        assert_eq!(a, b);
        assert_eq!(a, "users_email_tenant_id_key");
    }

    #[test]
    fn test_unnamed_constraints_get_stable_names() {
        let mut table = Table::new("orders");
        table.add_unique(Unique {
            name: String::new(),
            columns: cols(&["number"]),
        });
        table.add_index(Index {
            name: String::new(),
            columns: cols(&["created_at"]),
            is_unique: false,
        });
        table.add_check(CheckConstraint {
            name: String::new(),
            expression: "(total >= 0)".to_string(),
        });
        table.set_primary_key(PrimaryKey {
            name: String::new(),
            columns: cols(&["id"]),
        });

        assert!(table.unique_constraints.contains_key("orders_number_key"));
        assert!(table.indexes.contains_key("orders_created_at_idx"));
        assert!(table.check_constraints.contains_key("orders_total_0_check"));
        assert_eq!(table.primary_key.unwrap().name, "orders_id_pkey");
    }

    #[test]
    fn test_named_constraints_keep_their_names() {
        let mut table = Table::new("orders");
        table.add_foreign_key(ForeignKey {
            name: "fk_orders_user".to_string(),
            columns: cols(&["user_id"]),
            ref_table: "users".to_string(),
            ref_columns: cols(&["id"]),
            on_update: "NO ACTION".to_string(),
            on_delete: "CASCADE".to_string(),
        });
        assert!(table.foreign_keys.contains_key("fk_orders_user"));
    }

    #[test]
    fn test_column_default_omitted_from_json_when_absent() {
        let col = Column::new("id", "integer", false);
        let json = serde_json::to_string(&col).unwrap();
        assert!(!json.contains("default_value"));

        let col = Column::new("created_at", "timestamp", false).with_default("now()");
        let json = serde_json::to_string(&col).unwrap();
        assert!(json.contains("\"default_value\":\"now()\""));
    }

    #[test]
    fn test_facet_display_and_label() {
        assert_eq!(Facet::UniqueConstraints.to_string(), "unique constraints");
        assert_eq!(Facet::CheckConstraints.label(), "Check Constraints");
    }
}
