use sqlferry_core::{qualified_name, quote_ident, Column};

/// Synthesize a `CREATE TABLE` script from catalog columns
///
/// Identity columns get `IDENTITY(1,1)`; primary key columns become a clustered
/// `PK_<table>` constraint. Indexes, foreign keys and checks are not reproduced.
pub fn create_table_script(schema: &str, table: &str, columns: &[Column]) -> String {
    let mut lines: Vec<String> = columns
        .iter()
        .map(|column| format!("    {}", column_line(column)))
        .collect();

    let pk: Vec<String> = columns
        .iter()
        .filter(|c| c.is_primary_key)
        .map(|c| quote_ident(&c.name))
        .collect();
    if !pk.is_empty() {
        lines.push(format!(
            "    CONSTRAINT {} PRIMARY KEY CLUSTERED ({})",
            quote_ident(&format!("PK_{}", table)),
            pk.join(", ")
        ));
    }

    format!(
        "CREATE TABLE {} (\n{}\n);",
        qualified_name(schema, table),
        lines.join(",\n")
    )
}

fn column_line(column: &Column) -> String {
    let mut line = format!("{} {}", quote_ident(&column.name), column.type_sql());
    if column.is_identity {
        line.push_str(" IDENTITY(1,1)");
    }
    line.push_str(if column.is_nullable { " NULL" } else { " NOT NULL" });
    if let Some(default) = column.default_value.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(" DEFAULT ");
        line.push_str(default);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_script() {
        let columns = vec![
            Column::new("Id", "int").not_null().identity().primary_key().ordinal(1),
            Column::new("Name", "nvarchar").max_length(50).ordinal(2),
            Column::new("Active", "bit")
                .not_null()
                .default_value("((1))")
                .ordinal(3),
        ];

        let script = create_table_script("dbo", "Customer", &columns);
        assert_eq!(
            script,
            "CREATE TABLE [dbo].[Customer] (\n\
             \x20   [Id] int IDENTITY(1,1) NOT NULL,\n\
             \x20   [Name] nvarchar(50) NULL,\n\
             \x20   [Active] bit NOT NULL DEFAULT ((1)),\n\
             \x20   CONSTRAINT [PK_Customer] PRIMARY KEY CLUSTERED ([Id])\n\
             );"
        );
    }

    #[test]
    fn test_create_table_script_without_key() {
        let columns = vec![Column::new("Payload", "varbinary").max_length(-1)];
        let script = create_table_script("audit", "Blob", &columns);
        assert!(script.starts_with("CREATE TABLE [audit].[Blob] ("));
        assert!(script.contains("[Payload] varbinary(MAX) NULL"));
        assert!(!script.contains("CONSTRAINT"));
    }
}
