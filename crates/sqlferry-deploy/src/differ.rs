//! Column set reconciliation

use serde::Serialize;
use sqlferry_core::{qualified_name, quote_ident, Column};

/// Partition of two column sets by case-insensitive name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnDiff {
    /// In source, missing from target
    pub to_add: Vec<Column>,
    /// In both with different definitions; holds the source column
    pub to_modify: Vec<Column>,
    /// In target only; reported, never dropped automatically
    pub to_drop: Vec<Column>,
}

impl ColumnDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_modify.is_empty() && self.to_drop.is_empty()
    }

    /// Whether applying the diff would issue any statement
    pub fn has_changes(&self) -> bool {
        !self.to_add.is_empty() || !self.to_modify.is_empty()
    }
}

pub fn diff(source: &[Column], target: &[Column]) -> ColumnDiff {
    let mut result = ColumnDiff::default();

    for column in source {
        match target.iter().find(|t| t.same_name(column)) {
            None => result.to_add.push(column.clone()),
            Some(existing) if !existing.definition_equals(column) => {
                result.to_modify.push(column.clone())
            }
            Some(_) => {}
        }
    }

    result.to_drop = target
        .iter()
        .filter(|t| !source.iter().any(|s| s.same_name(t)))
        .cloned()
        .collect();

    result
}

/// `ALTER TABLE [schema].[table] ADD <definition>`
pub fn add_column_statement(schema: &str, table: &str, column: &Column) -> String {
    format!(
        "ALTER TABLE {} ADD {}",
        qualified_name(schema, table),
        column.definition_sql()
    )
}

/// `ALTER TABLE [schema].[table] ALTER COLUMN <definition without default>`
pub fn alter_column_statement(schema: &str, table: &str, column: &Column) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {}",
        qualified_name(schema, table),
        column.alter_definition_sql()
    )
}

/// Human-readable script for a diff; drop candidates are emitted commented out
pub fn render_alter_script(schema: &str, table: &str, diff: &ColumnDiff) -> String {
    let mut lines = vec![
        format!("-- ALTER TABLE script for {}.{}", schema, table),
        String::new(),
    ];

    if !diff.has_changes() && diff.to_drop.is_empty() {
        lines.push("-- No changes needed - table structures are identical".to_string());
        return lines.join("\n");
    }

    for column in &diff.to_add {
        lines.push(format!("{};", add_column_statement(schema, table, column)));
    }
    for column in &diff.to_modify {
        lines.push(format!("{};", alter_column_statement(schema, table, column)));
    }

    if !diff.to_drop.is_empty() {
        lines.push(String::new());
        lines.push("-- WARNING: The following columns exist in target but not in source.".to_string());
        lines.push("-- Uncomment the lines below if you want to drop them:".to_string());
        for column in &diff.to_drop {
            lines.push(format!(
                "-- ALTER TABLE {} DROP COLUMN {};",
                qualified_name(schema, table),
                quote_ident(&column.name)
            ));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer_source() -> Vec<Column> {
        vec![
            Column::new("Id", "int").not_null().ordinal(1),
            Column::new("Name", "nvarchar").max_length(50).ordinal(2),
            Column::new("Email", "varchar").max_length(200).ordinal(3),
        ]
    }

    #[test]
    fn test_diff_of_identical_sets_is_empty() {
        let columns = customer_source();
        assert!(diff(&columns, &columns).is_empty());
    }

    #[test]
    fn test_diff_partitions_columns() {
        let source = customer_source();
        let target = vec![
            Column::new("ID", "int").not_null().ordinal(5),
            Column::new("Email", "varchar").max_length(100).ordinal(2),
            Column::new("Legacy", "bit").ordinal(3),
        ];

        let result = diff(&source, &target);
        let names = |cols: &[Column]| cols.iter().map(|c| c.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&result.to_add), vec!["Name"]);
        assert_eq!(names(&result.to_modify), vec!["Email"]);
        assert_eq!(names(&result.to_drop), vec!["Legacy"]);
        assert_eq!(result.to_modify[0].max_length, Some(200));
    }

    #[test]
    fn test_partitions_cover_union_once() {
        let source = customer_source();
        let target = vec![
            Column::new("name", "nvarchar").max_length(50),
            Column::new("Extra", "int"),
        ];
        let result = diff(&source, &target);

        let mut seen: Vec<String> = result
            .to_add
            .iter()
            .chain(&result.to_modify)
            .chain(&result.to_drop)
            .map(|c| c.name.to_lowercase())
            .collect();
        seen.sort();
        // "name" is definition-equal so it is in no partition
        assert_eq!(seen, vec!["email", "extra", "id"]);
    }

    #[test]
    fn test_render_alter_script() {
        let source = customer_source();
        let target = vec![
            Column::new("Id", "int").not_null(),
            Column::new("Email", "varchar").max_length(100),
            Column::new("Legacy", "bit"),
        ];
        let script = render_alter_script("dbo", "Customer", &diff(&source, &target));

        assert!(script.starts_with("-- ALTER TABLE script for dbo.Customer\n"));
        assert!(script.contains("ALTER TABLE [dbo].[Customer] ADD [Name] nvarchar(50) NULL;"));
        assert!(script
            .contains("ALTER TABLE [dbo].[Customer] ALTER COLUMN [Email] varchar(200) NULL;"));
        assert!(script.contains("-- ALTER TABLE [dbo].[Customer] DROP COLUMN [Legacy];"));
    }

    #[test]
    fn test_render_no_changes() {
        let columns = customer_source();
        let script = render_alter_script("dbo", "Customer", &diff(&columns, &columns));
        assert!(script.ends_with("-- No changes needed - table structures are identical"));
    }
}
