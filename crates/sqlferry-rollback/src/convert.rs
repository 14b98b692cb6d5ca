//! Turn a backup routine's definition back into an ALTER of the original

use once_cell::sync::Lazy;
use regex::{NoExpand, RegexBuilder};
use sqlferry_core::{MigrationError, MigrationResult};
use tracing::warn;

static CREATE_KEYWORD: Lazy<regex::Regex> = Lazy::new(|| {
    RegexBuilder::new(r"\bCREATE\s+(PROCEDURE|PROC)\b")
        .case_insensitive(true)
        .build()
        .expect("valid regex")
});

/// Rewrite a backup definition so that executing it alters `original_name`
///
/// The backup name is substituted first, trying `[backup]`, `dbo.[backup]`,
/// `[dbo].[backup]`, `dbo.backup` and bare `backup` in that order, then the first
/// `CREATE PROC|PROCEDURE` becomes `ALTER PROCEDURE`.
pub fn convert_to_alter_script(
    script: &str,
    backup_name: &str,
    original_name: &str,
) -> MigrationResult<String> {
    let escaped = regex::escape(backup_name);
    let substitutions = [
        (format!(r"\[{}\]", escaped), format!("[{}]", original_name)),
        (format!(r"\bdbo\.\[{}\]", escaped), format!("dbo.[{}]", original_name)),
        (format!(r"\[dbo\]\.\[{}\]", escaped), format!("[dbo].[{}]", original_name)),
        (format!(r"\bdbo\.{}\b", escaped), format!("dbo.[{}]", original_name)),
        (format!(r"\b{}\b", escaped), format!("[{}]", original_name)),
    ];

    let mut converted = script.trim().to_string();
    for (pattern, replacement) in &substitutions {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                MigrationError::InvariantViolation(format!(
                    "cannot build name pattern for {}: {}",
                    backup_name, e
                ))
            })?;
        converted = regex
            .replace_all(&converted, NoExpand(replacement))
            .into_owned();
    }

    converted = CREATE_KEYWORD
        .replacen(&converted, 1, "ALTER PROCEDURE")
        .into_owned();

    if !converted
        .trim_start()
        .to_uppercase()
        .starts_with("ALTER PROCEDURE")
    {
        warn!(
            "Restore script for {} does not start with ALTER PROCEDURE",
            original_name
        );
    }

    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracketed_backup_is_restored() {
        let script = "CREATE PROCEDURE [dbo].[GetOrders_05032024]\nAS\nSELECT 1";
        let restored = convert_to_alter_script(script, "GetOrders_05032024", "GetOrders").unwrap();
        assert_eq!(restored, "ALTER PROCEDURE [dbo].[GetOrders]\nAS\nSELECT 1");
    }

    #[test]
    fn test_unbracketed_and_short_keyword() {
        let script = "  create proc dbo.GetOrders_05032024 AS SELECT 1  ";
        let restored = convert_to_alter_script(script, "GetOrders_05032024", "GetOrders").unwrap();
        assert_eq!(restored, "ALTER PROCEDURE dbo.[GetOrders] AS SELECT 1");

        let script = "CREATE PROCEDURE GetOrders_05032024 AS SELECT 1";
        let restored = convert_to_alter_script(script, "GetOrders_05032024", "GetOrders").unwrap();
        assert_eq!(restored, "ALTER PROCEDURE [GetOrders] AS SELECT 1");
    }

    #[test]
    fn test_only_leading_create_is_rewritten() {
        let script = "CREATE PROCEDURE [dbo].[Sync_05032024] AS\nEXEC('CREATE PROCEDURE dbo.Temp AS SELECT 1')";
        let restored = convert_to_alter_script(script, "Sync_05032024", "Sync").unwrap();
        assert!(restored.starts_with("ALTER PROCEDURE [dbo].[Sync] AS"));
        assert!(restored.contains("EXEC('CREATE PROCEDURE dbo.Temp AS SELECT 1')"));
    }

    #[test]
    fn test_original_name_is_left_alone() {
        let script = "CREATE PROCEDURE [dbo].[Sync_05032024] AS EXEC dbo.SyncPart";
        let restored = convert_to_alter_script(script, "Sync_05032024", "Sync").unwrap();
        assert_eq!(restored, "ALTER PROCEDURE [dbo].[Sync] AS EXEC dbo.SyncPart");
    }
}
