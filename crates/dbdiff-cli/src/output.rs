//! Human-readable and JSON rendering of a schema diff.

use std::fmt::Write;

use dbdiff::diff::FacetView;
use dbdiff::{Result, SchemaDiff, TableDiff};

const RULE_WIDTH: usize = 80;

/// Render the diff as the grouped text report.
pub fn render_text(diff: &SchemaDiff) -> String {
    if diff.is_empty() {
        return "✓ No schema differences found\n".to_string();
    }

    let mut out = String::new();
    out.push_str("Schema Differences Found:\n");
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');

    if !diff.tables_only_in_source.is_empty() {
        out.push_str("\n📋 Tables only in SOURCE:\n");
        for table in &diff.tables_only_in_source {
            let _ = writeln!(out, "  - {}", table);
        }
    }

    if !diff.tables_only_in_target.is_empty() {
        out.push_str("\n📋 Tables only in TARGET:\n");
        for table in &diff.tables_only_in_target {
            let _ = writeln!(out, "  + {}", table);
        }
    }

    for table_diff in &diff.table_diffs {
        render_table(&mut out, table_diff);
    }

    out.push('\n');
    out
}

fn render_table(out: &mut String, table_diff: &TableDiff) {
    let _ = writeln!(out, "\n📊 Table: {}", table_diff.table_name);
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');

    if !table_diff.columns_only_in_source.is_empty() {
        out.push_str("  Columns only in SOURCE:\n");
        for column in &table_diff.columns_only_in_source {
            let _ = writeln!(out, "    - {}", column);
        }
    }
    if !table_diff.columns_only_in_target.is_empty() {
        out.push_str("  Columns only in TARGET:\n");
        for column in &table_diff.columns_only_in_target {
            let _ = writeln!(out, "    + {}", column);
        }
    }
    if !table_diff.column_diffs.is_empty() {
        out.push_str("  Column differences:\n");
        for change in &table_diff.column_diffs {
            let _ = writeln!(out, "    ~ {}: {}", change.column_name, change.diff);
        }
    }

    if let Some(pk) = &table_diff.primary_key_diff {
        let _ = writeln!(out, "  Primary Key: {}", pk);
    }

    for view in table_diff.constraint_facets() {
        render_facet(out, &view);
    }
}

fn render_facet(out: &mut String, view: &FacetView<'_>) {
    let label = view.facet.label();

    if !view.only_in_source.is_empty() {
        let _ = writeln!(out, "  {} only in SOURCE:", label);
        for name in view.only_in_source {
            let _ = writeln!(out, "    - {}", name);
        }
    }
    if !view.only_in_target.is_empty() {
        let _ = writeln!(out, "  {} only in TARGET:", label);
        for name in view.only_in_target {
            let _ = writeln!(out, "    + {}", name);
        }
    }
    if !view.changed.is_empty() {
        let _ = writeln!(out, "  {} differences:", label);
        for change in view.changed {
            let _ = writeln!(out, "    ~ {}: {}", change.name, change.diff);
        }
    }
}

/// Render the diff as indented JSON, newline terminated.
pub fn render_json(diff: &SchemaDiff) -> Result<String> {
    let mut json = diff.to_json()?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbdiff::diff::{ColumnDiff, ConstraintDiff};

    fn make_test_diff() -> SchemaDiff {
        let mut users = TableDiff::new("users");
        users.columns_only_in_target.push("email".to_string());
        users.column_diffs.push(ColumnDiff {
            column_name: "id".to_string(),
            diff: "type: integer → bigint".to_string(),
        });
        users.primary_key_diff = Some("columns: [id] → [id, tenant_id]".to_string());
        users.indexes_only_in_source.push("idx_users_name".to_string());
        users.index_diffs.push(ConstraintDiff {
            name: "idx_email".to_string(),
            diff: "unique: false → true".to_string(),
        });

        SchemaDiff {
            tables_only_in_source: vec!["legacy".to_string()],
            tables_only_in_target: vec!["audit_log".to_string()],
            table_diffs: vec![users],
        }
    }

    #[test]
    fn test_empty_diff_text() {
        assert_eq!(
            render_text(&SchemaDiff::default()),
            "✓ No schema differences found\n"
        );
    }

    #[test]
    fn test_text_report_sections() {
        let text = render_text(&make_test_diff());

        assert!(text.starts_with("Schema Differences Found:\n"));
        assert!(text.contains(&"=".repeat(80)));
        assert!(text.contains("\n📋 Tables only in SOURCE:\n  - legacy\n"));
        assert!(text.contains("\n📋 Tables only in TARGET:\n  + audit_log\n"));
        assert!(text.contains("\n📊 Table: users\n"));
        assert!(text.contains("  Columns only in TARGET:\n    + email\n"));
        assert!(text.contains("  Column differences:\n    ~ id: type: integer → bigint\n"));
        assert!(text.contains("  Primary Key: columns: [id] → [id, tenant_id]\n"));
        assert!(text.contains("  Indexes only in SOURCE:\n    - idx_users_name\n"));
        assert!(text.contains("  Indexes differences:\n    ~ idx_email: unique: false → true\n"));
        assert!(!text.contains("Foreign Keys"));
    }

    #[test]
    fn test_text_report_orders_sections() {
        let text = render_text(&make_test_diff());
        let source = text.find("Tables only in SOURCE").unwrap();
        let target = text.find("Tables only in TARGET").unwrap();
        let table = text.find("Table: users").unwrap();
        let pk = text.find("Primary Key").unwrap();
        let indexes = text.find("Indexes only in SOURCE").unwrap();
        assert!(source < target && target < table && table < pk && pk < indexes);
    }

    #[test]
    fn test_json_omits_empty_lists() {
        let json = render_json(&make_test_diff()).unwrap();
        assert!(json.contains("\"tables_only_in_source\""));
        assert!(json.contains("\"index_diffs\""));
        assert!(!json.contains("foreign_keys_only_in_source"));
        assert!(json.ends_with("}\n"));
    }

    #[test]
    fn test_json_of_empty_diff() {
        assert_eq!(render_json(&SchemaDiff::default()).unwrap(), "{}\n");
    }
}
