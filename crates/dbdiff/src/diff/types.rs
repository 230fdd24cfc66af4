//! Output types produced by the diff engine.
//!
//! Field names are the JSON contract: empty lists and absent values are
//! omitted on serialization and default to empty on deserialization.

use serde::{Deserialize, Serialize};

use crate::core::schema::Facet;

/// Drift between two schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables_only_in_source: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables_only_in_target: Vec<String>,

    /// Only tables present on both sides with at least one difference.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_diffs: Vec<TableDiff>,
}

impl SchemaDiff {
    /// Check if the schemas matched.
    pub fn is_empty(&self) -> bool {
        self.tables_only_in_source.is_empty()
            && self.tables_only_in_target.is_empty()
            && self.table_diffs.iter().all(TableDiff::is_empty)
    }

    /// Total number of reported differences across all tables.
    pub fn change_count(&self) -> usize {
        self.tables_only_in_source.len()
            + self.tables_only_in_target.len()
            + self
                .table_diffs
                .iter()
                .map(TableDiff::change_count)
                .sum::<usize>()
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Drift within one table present on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDiff {
    pub table_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns_only_in_source: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns_only_in_target: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_diffs: Vec<ColumnDiff>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_diff: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys_only_in_source: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys_only_in_target: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_key_diffs: Vec<ConstraintDiff>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uniques_only_in_source: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uniques_only_in_target: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_diffs: Vec<ConstraintDiff>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes_only_in_source: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes_only_in_target: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index_diffs: Vec<ConstraintDiff>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks_only_in_source: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks_only_in_target: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub check_diffs: Vec<ConstraintDiff>,
}

impl TableDiff {
    /// Create an empty diff for a table.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }

    /// Check if every facet matched.
    pub fn is_empty(&self) -> bool {
        self.columns_only_in_source.is_empty()
            && self.columns_only_in_target.is_empty()
            && self.column_diffs.is_empty()
            && self.primary_key_diff.is_none()
            && self.constraint_facets().iter().all(FacetView::is_empty)
    }

    /// Number of reported differences in this table.
    pub fn change_count(&self) -> usize {
        self.columns_only_in_source.len()
            + self.columns_only_in_target.len()
            + self.column_diffs.len()
            + usize::from(self.primary_key_diff.is_some())
            + self
                .constraint_facets()
                .iter()
                .map(FacetView::len)
                .sum::<usize>()
    }

    /// The four name-keyed constraint facets, in report order.
    pub fn constraint_facets(&self) -> [FacetView<'_>; 4] {
        [
            FacetView {
                facet: Facet::ForeignKeys,
                only_in_source: &self.foreign_keys_only_in_source,
                only_in_target: &self.foreign_keys_only_in_target,
                changed: &self.foreign_key_diffs,
            },
            FacetView {
                facet: Facet::UniqueConstraints,
                only_in_source: &self.uniques_only_in_source,
                only_in_target: &self.uniques_only_in_target,
                changed: &self.unique_diffs,
            },
            FacetView {
                facet: Facet::Indexes,
                only_in_source: &self.indexes_only_in_source,
                only_in_target: &self.indexes_only_in_target,
                changed: &self.index_diffs,
            },
            FacetView {
                facet: Facet::CheckConstraints,
                only_in_source: &self.checks_only_in_source,
                only_in_target: &self.checks_only_in_target,
                changed: &self.check_diffs,
            },
        ]
    }
}

/// A changed column, with its clauses joined by `"; "`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDiff {
    pub column_name: String,
    pub diff: String,
}

/// A changed foreign key, unique constraint, index or check constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintDiff {
    pub name: String,
    pub diff: String,
}

/// Result of comparing two name-keyed maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetDiff {
    pub only_in_source: Vec<String>,
    pub only_in_target: Vec<String>,
    pub changed: Vec<ConstraintDiff>,
}

/// Borrowed view of one constraint facet of a [`TableDiff`].
#[derive(Debug, Clone, Copy)]
pub struct FacetView<'a> {
    pub facet: Facet,
    pub only_in_source: &'a [String],
    pub only_in_target: &'a [String],
    pub changed: &'a [ConstraintDiff],
}

impl FacetView<'_> {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.only_in_source.len() + self.only_in_target.len() + self.changed.len()
    }
}
