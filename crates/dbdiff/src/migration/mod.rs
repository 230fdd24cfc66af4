//! Advisory migration SQL.
//!
//! Turns a [`SchemaDiff`] into a script a human reviews before doing
//! anything with it. Only `ADD COLUMN` for target-only columns is emitted
//! uncommented, and even that has no type clause. Everything else is a
//! commented skeleton. Nothing here talks to a database.

use crate::diff::{ConstraintDiff, SchemaDiff, TableDiff};

/// Exact output for an empty diff.
pub const NO_MIGRATIONS: &str = "-- No migrations needed\n";

/// Syntax family selected by the dialect hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqlFamily {
    Postgres,
    Mysql,
}

impl SqlFamily {
    fn from_hint(hint: &str) -> Self {
        match hint.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => SqlFamily::Postgres,
            _ => SqlFamily::Mysql,
        }
    }

    fn drop_index(&self, table: &str, index: &str) -> String {
        match self {
            SqlFamily::Postgres => format!("DROP INDEX {}", index),
            SqlFamily::Mysql => format!("DROP INDEX {} ON {}", index, table),
        }
    }

    fn drop_foreign_key(&self, table: &str, name: &str) -> String {
        match self {
            SqlFamily::Postgres => format!("ALTER TABLE {} DROP CONSTRAINT {}", table, name),
            SqlFamily::Mysql => format!("ALTER TABLE {} DROP FOREIGN KEY {}", table, name),
        }
    }

    fn drop_unique(&self, table: &str, name: &str) -> String {
        match self {
            SqlFamily::Postgres => format!("ALTER TABLE {} DROP CONSTRAINT {}", table, name),
            SqlFamily::Mysql => format!("ALTER TABLE {} DROP INDEX {}", table, name),
        }
    }

    fn drop_check(&self, table: &str, name: &str) -> String {
        match self {
            SqlFamily::Postgres => format!("ALTER TABLE {} DROP CONSTRAINT {}", table, name),
            SqlFamily::Mysql => format!("ALTER TABLE {} DROP CHECK {}", table, name),
        }
    }

    fn alter_column(&self) -> &'static str {
        match self {
            SqlFamily::Postgres => "ALTER COLUMN",
            SqlFamily::Mysql => "MODIFY COLUMN",
        }
    }

    fn replace_primary_key(&self, table: &str) -> String {
        match self {
            SqlFamily::Postgres => format!(
                "ALTER TABLE {} DROP CONSTRAINT ..., ADD PRIMARY KEY (...)",
                table
            ),
            SqlFamily::Mysql => format!("ALTER TABLE {} DROP PRIMARY KEY, ADD PRIMARY KEY (...)", table),
        }
    }
}

/// Generate advisory migration SQL for `diff`.
///
/// `dialect_hint` selects the syntax family for statements whose form
/// differs between PostgreSQL (`postgres`, `postgresql`, `pg`) and MySQL
/// (anything else). The hint is echoed in the header as given.
pub fn generate_migration_sql(diff: &SchemaDiff, dialect_hint: &str) -> String {
    let family = SqlFamily::from_hint(dialect_hint);
    let mut lines: Vec<String> = Vec::new();

    for table in &diff.tables_only_in_target {
        lines.push(format!(
            "-- Table '{}' exists in target but not in source",
            table
        ));
        lines.push(format!(
            "-- CREATE TABLE {} (...);  -- Manual review required\n",
            table
        ));
    }

    for table in &diff.tables_only_in_source {
        lines.push(format!(
            "-- DROP TABLE {};  -- Table exists in source but not in target\n",
            table
        ));
    }

    for table_diff in &diff.table_diffs {
        let table_lines = table_migrations(table_diff, family);
        if !table_lines.is_empty() {
            lines.push(format!("-- Migrations for table: {}", table_diff.table_name));
            lines.extend(table_lines);
            lines.push(String::new());
        }
    }

    if lines.is_empty() {
        return NO_MIGRATIONS.to_string();
    }

    let mut out = format!("-- Migration SQL generated for {}\n", dialect_hint);
    out.push_str("-- Review and test these statements before applying to production!\n");
    out.push_str("-- Some statements may need manual adjustment.\n\n");
    out.push_str(&lines.join("\n"));
    out
}

fn table_migrations(diff: &TableDiff, family: SqlFamily) -> Vec<String> {
    let t = diff.table_name.as_str();
    let mut lines = Vec::new();

    for col in &diff.columns_only_in_target {
        lines.push(format!(
            "ALTER TABLE {} ADD COLUMN {};  -- Column exists in target",
            t, col
        ));
    }
    for col in &diff.columns_only_in_source {
        lines.push(format!(
            "-- ALTER TABLE {} DROP COLUMN {};  -- Column exists in source but not in target",
            t, col
        ));
    }
    for col in &diff.column_diffs {
        lines.push(format!(
            "-- ALTER TABLE {} {} {} ...;  -- {}",
            t,
            family.alter_column(),
            col.column_name,
            col.diff
        ));
    }

    if let Some(pk) = &diff.primary_key_diff {
        lines.push(format!(
            "-- {};  -- Primary key differs: {}",
            family.replace_primary_key(t),
            pk
        ));
    }

    for idx in &diff.indexes_only_in_target {
        lines.push(format!(
            "-- CREATE INDEX {} ON {} (...);  -- Index exists in target",
            idx, t
        ));
    }
    for idx in &diff.indexes_only_in_source {
        lines.push(format!(
            "-- {};  -- Index exists in source but not in target",
            family.drop_index(t, idx)
        ));
    }
    push_changed(&mut lines, &diff.index_diffs, "Index", |d| {
        format!(
            "{}; CREATE INDEX {} ON {} (...)",
            family.drop_index(t, &d.name),
            d.name,
            t
        )
    });

    for fk in &diff.foreign_keys_only_in_target {
        lines.push(format!(
            "-- ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY (...) REFERENCES ...;  -- FK exists in target",
            t, fk
        ));
    }
    for fk in &diff.foreign_keys_only_in_source {
        lines.push(format!(
            "-- {};  -- FK exists in source but not in target",
            family.drop_foreign_key(t, fk)
        ));
    }
    push_changed(&mut lines, &diff.foreign_key_diffs, "FK", |d| {
        format!(
            "{}; ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY (...) REFERENCES ...",
            family.drop_foreign_key(t, &d.name),
            t,
            d.name
        )
    });

    for uq in &diff.uniques_only_in_target {
        lines.push(format!(
            "-- ALTER TABLE {} ADD CONSTRAINT {} UNIQUE (...);  -- Unique constraint exists in target",
            t, uq
        ));
    }
    for uq in &diff.uniques_only_in_source {
        lines.push(format!(
            "-- {};  -- Unique constraint exists in source but not in target",
            family.drop_unique(t, uq)
        ));
    }
    push_changed(&mut lines, &diff.unique_diffs, "Unique constraint", |d| {
        format!(
            "{}; ALTER TABLE {} ADD CONSTRAINT {} UNIQUE (...)",
            family.drop_unique(t, &d.name),
            t,
            d.name
        )
    });

    for chk in &diff.checks_only_in_target {
        lines.push(format!(
            "-- ALTER TABLE {} ADD CONSTRAINT {} CHECK (...);  -- Check constraint exists in target",
            t, chk
        ));
    }
    for chk in &diff.checks_only_in_source {
        lines.push(format!(
            "-- {};  -- Check constraint exists in source but not in target",
            family.drop_check(t, chk)
        ));
    }
    push_changed(&mut lines, &diff.check_diffs, "Check constraint", |d| {
        format!(
            "{}; ALTER TABLE {} ADD CONSTRAINT {} CHECK (...)",
            family.drop_check(t, &d.name),
            t,
            d.name
        )
    });

    lines
}

/// Emit a commented drop-and-recreate note for each changed constraint.
fn push_changed(
    lines: &mut Vec<String>,
    changed: &[ConstraintDiff],
    label: &str,
    recreate: impl Fn(&ConstraintDiff) -> String,
) {
    for d in changed {
        lines.push(format!("-- {};  -- {} differs: {}", recreate(d), label, d.diff));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ColumnDiff;
    use crate::drivers::Dialect;

    fn make_test_diff() -> SchemaDiff {
        let mut users = TableDiff::new("users");
        users.columns_only_in_target.push("email".to_string());
        users.columns_only_in_source.push("legacy_flag".to_string());
        users.column_diffs.push(ColumnDiff {
            column_name: "id".to_string(),
            diff: "type: integer → bigint".to_string(),
        });
        users.indexes_only_in_source.push("idx_users_name".to_string());
        users.foreign_keys_only_in_source.push("users_org_fkey".to_string());
        users.uniques_only_in_source.push("users_email_key".to_string());
        users.checks_only_in_source.push("users_age_check".to_string());

        SchemaDiff {
            tables_only_in_source: vec!["old_audit".to_string()],
            tables_only_in_target: vec!["new_feature".to_string()],
            table_diffs: vec![users],
        }
    }

    #[test]
    fn test_empty_diff_needs_no_migrations() {
        assert_eq!(
            generate_migration_sql(&SchemaDiff::default(), "postgres"),
            "-- No migrations needed\n"
        );
    }

    #[test]
    fn test_header_and_table_sections() {
        let sql = generate_migration_sql(&make_test_diff(), "postgres");
        assert!(sql.starts_with(
            "-- Migration SQL generated for postgres\n\
             -- Review and test these statements before applying to production!\n\
             -- Some statements may need manual adjustment.\n\n"
        ));
        assert!(sql.contains("-- Table 'new_feature' exists in target but not in source"));
        assert!(sql.contains("-- DROP TABLE old_audit;  -- Table exists in source but not in target"));
        assert!(sql.contains("-- Migrations for table: users"));
    }

    #[test]
    fn test_add_column_is_the_only_live_statement() {
        let sql = generate_migration_sql(&make_test_diff(), "mysql");
        let live: Vec<&str> = sql
            .lines()
            .filter(|l| !l.is_empty() && !l.starts_with("--"))
            .collect();
        assert_eq!(
            live,
            vec!["ALTER TABLE users ADD COLUMN email;  -- Column exists in target"]
        );
    }

    #[test]
    fn test_postgres_syntax_forks() {
        let sql = generate_migration_sql(&make_test_diff(), "postgres");
        assert!(sql.contains("-- ALTER TABLE users ALTER COLUMN id ...;  -- type: integer → bigint"));
        assert!(sql.contains("-- DROP INDEX idx_users_name;  -- Index exists"));
        assert!(sql.contains("-- ALTER TABLE users DROP CONSTRAINT users_org_fkey;  -- FK exists"));
        assert!(sql.contains("-- ALTER TABLE users DROP CONSTRAINT users_email_key;  -- Unique"));
        assert!(sql.contains("-- ALTER TABLE users DROP CONSTRAINT users_age_check;  -- Check"));
    }

    #[test]
    fn test_mysql_syntax_forks() {
        let sql = generate_migration_sql(&make_test_diff(), "mysql");
        assert!(sql.contains("-- ALTER TABLE users MODIFY COLUMN id ...;  -- type: integer → bigint"));
        assert!(sql.contains("-- DROP INDEX idx_users_name ON users;  -- Index exists"));
        assert!(sql.contains("-- ALTER TABLE users DROP FOREIGN KEY users_org_fkey;"));
        assert!(sql.contains("-- ALTER TABLE users DROP INDEX users_email_key;"));
        assert!(sql.contains("-- ALTER TABLE users DROP CHECK users_age_check;"));
    }

    #[test]
    fn test_postgres_hint_aliases() {
        let sql = generate_migration_sql(&make_test_diff(), "pg");
        assert!(sql.starts_with("-- Migration SQL generated for pg\n"));
        assert!(sql.contains("ALTER COLUMN id"));
        assert!(generate_migration_sql(&make_test_diff(), "PostgreSQL").contains("ALTER COLUMN id"));
    }

    #[test]
    fn test_dialect_names_select_their_family() {
        let pg = generate_migration_sql(&make_test_diff(), Dialect::Postgres.name());
        assert!(pg.contains("ALTER COLUMN id"));
        let my = generate_migration_sql(&make_test_diff(), Dialect::Mysql.name());
        assert!(my.contains("MODIFY COLUMN id"));
    }

    #[test]
    fn test_primary_key_and_changed_constraints_get_notes() {
        let mut orders = TableDiff::new("orders");
        orders.primary_key_diff = Some("columns: [id] → [id, tenant_id]".to_string());
        orders.index_diffs.push(ConstraintDiff {
            name: "idx_email".to_string(),
            diff: "unique: false → true".to_string(),
        });
        let diff = SchemaDiff {
            table_diffs: vec![orders],
            ..Default::default()
        };

        let sql = generate_migration_sql(&diff, "mysql");
        assert!(sql.contains(
            "-- ALTER TABLE orders DROP PRIMARY KEY, ADD PRIMARY KEY (...);  -- Primary key differs: columns: [id] → [id, tenant_id]"
        ));
        assert!(sql.contains(
            "-- DROP INDEX idx_email ON orders; CREATE INDEX idx_email ON orders (...);  -- Index differs: unique: false → true"
        ));
    }
}
