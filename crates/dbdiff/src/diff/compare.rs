//! Structural comparison of two schemas.
//!
//! Everything here is pure: no I/O, no mutation of the inputs, and the
//! output order follows `BTreeMap` key order, so the same inputs always
//! produce the same diff.

use std::collections::BTreeMap;

use crate::core::schema::{
    CheckConstraint, Column, ForeignKey, Index, PrimaryKey, Schema, Table, Unique,
};

use super::filter::FilterConfig;
use super::types::{ColumnDiff, ConstraintDiff, FacetDiff, SchemaDiff, TableDiff};

/// Compute the drift from `source` to `target`.
///
/// Tables excluded by the filter are dropped from every output list.
pub fn compute_diff(source: &Schema, target: &Schema, filter: &FilterConfig) -> SchemaDiff {
    let tables = compare_maps_where(
        &source.tables,
        &target.tables,
        |name| !filter.should_ignore_table(name),
        |s, t| {
            let diff = compare_table(s, t, filter);
            (!diff.is_empty()).then_some(diff)
        },
    );

    SchemaDiff {
        tables_only_in_source: tables.only_in_source,
        tables_only_in_target: tables.only_in_target,
        table_diffs: tables.changed.into_iter().map(|(_, diff)| diff).collect(),
    }
}

/// Compare two tables with the same name across all six facets.
pub fn compare_table(source: &Table, target: &Table, filter: &FilterConfig) -> TableDiff {
    let mut diff = TableDiff::new(&source.name);

    let columns = compare_maps_where(
        &source.columns,
        &target.columns,
        |name| !filter.should_ignore_column(&source.name, name),
        compare_column,
    );
    diff.columns_only_in_source = columns.only_in_source;
    diff.columns_only_in_target = columns.only_in_target;
    diff.column_diffs = columns
        .changed
        .into_iter()
        .map(|(column_name, diff)| ColumnDiff { column_name, diff })
        .collect();

    diff.primary_key_diff =
        compare_primary_key(source.primary_key.as_ref(), target.primary_key.as_ref());

    if !filter.ignore_foreign_keys {
        let fks = compare_maps(&source.foreign_keys, &target.foreign_keys, compare_foreign_key);
        diff.foreign_keys_only_in_source = fks.only_in_source;
        diff.foreign_keys_only_in_target = fks.only_in_target;
        diff.foreign_key_diffs = fks.changed;
    }

    let uniques = compare_maps(
        &source.unique_constraints,
        &target.unique_constraints,
        compare_unique,
    );
    diff.uniques_only_in_source = uniques.only_in_source;
    diff.uniques_only_in_target = uniques.only_in_target;
    diff.unique_diffs = uniques.changed;

    if !filter.ignore_indexes {
        let indexes = compare_maps(&source.indexes, &target.indexes, compare_index);
        diff.indexes_only_in_source = indexes.only_in_source;
        diff.indexes_only_in_target = indexes.only_in_target;
        diff.index_diffs = indexes.changed;
    }

    if !filter.ignore_checks {
        let checks = compare_maps(
            &source.check_constraints,
            &target.check_constraints,
            compare_check,
        );
        diff.checks_only_in_source = checks.only_in_source;
        diff.checks_only_in_target = checks.only_in_target;
        diff.check_diffs = checks.changed;
    }

    diff
}

/// Compare two name-keyed maps: names on one side only, then a comparator
/// over the names on both sides. A comparator returning `None` means equal.
pub fn compare_maps<T>(
    source: &BTreeMap<String, T>,
    target: &BTreeMap<String, T>,
    compare: impl Fn(&T, &T) -> Option<String>,
) -> FacetDiff {
    let keyed = compare_maps_where(source, target, |_| true, compare);
    FacetDiff {
        only_in_source: keyed.only_in_source,
        only_in_target: keyed.only_in_target,
        changed: keyed
            .changed
            .into_iter()
            .map(|(name, diff)| ConstraintDiff { name, diff })
            .collect(),
    }
}

/// Keyed comparison result before the entries are given their final shape.
struct KeyedDiff<D> {
    only_in_source: Vec<String>,
    only_in_target: Vec<String>,
    changed: Vec<(String, D)>,
}

fn compare_maps_where<T, D>(
    source: &BTreeMap<String, T>,
    target: &BTreeMap<String, T>,
    keep: impl Fn(&str) -> bool,
    compare: impl Fn(&T, &T) -> Option<D>,
) -> KeyedDiff<D> {
    let mut result = KeyedDiff {
        only_in_source: Vec::new(),
        only_in_target: Vec::new(),
        changed: Vec::new(),
    };

    for (name, s) in source.iter().filter(|(name, _)| keep(name)) {
        match target.get(name) {
            None => result.only_in_source.push(name.clone()),
            Some(t) => {
                if let Some(d) = compare(s, t) {
                    result.changed.push((name.clone(), d));
                }
            }
        }
    }

    result.only_in_target = target
        .keys()
        .filter(|name| keep(name) && !source.contains_key(*name))
        .cloned()
        .collect();

    result
}

/// Render a column list as `[a, b]`.
pub fn format_list(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

fn format_default(value: Option<&String>) -> String {
    match value {
        Some(v) => format!("{:?}", v),
        None => "none".to_string(),
    }
}

fn join_clauses(clauses: Vec<String>) -> Option<String> {
    (!clauses.is_empty()).then(|| clauses.join("; "))
}

fn compare_column(source: &Column, target: &Column) -> Option<String> {
    let mut clauses = Vec::new();

    if source.data_type != target.data_type {
        clauses.push(format!("type: {} → {}", source.data_type, target.data_type));
    }
    if source.is_nullable != target.is_nullable {
        clauses.push(format!(
            "nullable: {} → {}",
            source.is_nullable, target.is_nullable
        ));
    }
    if source.default_value != target.default_value {
        clauses.push(format!(
            "default: {} → {}",
            format_default(source.default_value.as_ref()),
            format_default(target.default_value.as_ref())
        ));
    }

    join_clauses(clauses)
}

fn compare_primary_key(source: Option<&PrimaryKey>, target: Option<&PrimaryKey>) -> Option<String> {
    match (source, target) {
        (None, None) => None,
        (None, Some(t)) => Some(format!("added: {}", format_list(&t.columns))),
        (Some(s), None) => Some(format!("removed: {}", format_list(&s.columns))),
        (Some(s), Some(t)) if s.columns != t.columns => Some(format!(
            "columns: {} → {}",
            format_list(&s.columns),
            format_list(&t.columns)
        )),
        (Some(_), Some(_)) => None,
    }
}

fn compare_foreign_key(source: &ForeignKey, target: &ForeignKey) -> Option<String> {
    let mut clauses = Vec::new();

    if source.columns != target.columns {
        clauses.push(format!(
            "columns: {} → {}",
            format_list(&source.columns),
            format_list(&target.columns)
        ));
    }
    if source.ref_table != target.ref_table {
        clauses.push(format!(
            "ref_table: {} → {}",
            source.ref_table, target.ref_table
        ));
    }
    if source.ref_columns != target.ref_columns {
        clauses.push(format!(
            "ref_columns: {} → {}",
            format_list(&source.ref_columns),
            format_list(&target.ref_columns)
        ));
    }
    if source.on_delete != target.on_delete {
        clauses.push(format!(
            "on_delete: {} → {}",
            source.on_delete, target.on_delete
        ));
    }
    if source.on_update != target.on_update {
        clauses.push(format!(
            "on_update: {} → {}",
            source.on_update, target.on_update
        ));
    }

    join_clauses(clauses)
}

fn compare_unique(source: &Unique, target: &Unique) -> Option<String> {
    (source.columns != target.columns).then(|| {
        format!(
            "columns: {} → {}",
            format_list(&source.columns),
            format_list(&target.columns)
        )
    })
}

fn compare_index(source: &Index, target: &Index) -> Option<String> {
    let mut clauses = Vec::new();

    if source.columns != target.columns {
        clauses.push(format!(
            "columns: {} → {}",
            format_list(&source.columns),
            format_list(&target.columns)
        ));
    }
    if source.is_unique != target.is_unique {
        clauses.push(format!(
            "unique: {} → {}",
            source.is_unique, target.is_unique
        ));
    }

    join_clauses(clauses)
}

fn compare_check(source: &CheckConstraint, target: &CheckConstraint) -> Option<String> {
    (source.expression != target.expression)
        .then(|| format!("expression: {} → {}", source.expression, target.expression))
}
