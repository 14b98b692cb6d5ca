//! Text rewriting of procedure definitions
//!
//! Definitions are never parsed. The object header (`CREATE|ALTER PROC[EDURE] <name>`)
//! is located with a pattern built from the routine's schema and name, trying the
//! name spellings from most to least qualified:
//! `[schema].[name]`, `schema.[name]`, `[schema].name`, `schema.name`, `[name]`, `name`.
//! Everything outside the matched header is left byte-for-byte intact.

use regex::{Captures, Regex, RegexBuilder};
use sqlferry_core::{qualified_name, MigrationError, MigrationResult};

/// Regex fragment matching `text` as an identifier, bracketed or bare
fn identifier_variants(text: &str) -> (String, String) {
    let escaped = regex::escape(text);
    let bare = if text.chars().last().is_some_and(|c| c.is_alphanumeric() || c == '_') {
        format!(r"{}\b", escaped)
    } else {
        escaped.clone()
    };
    (format!(r"\[{}\]", escaped), bare)
}

fn name_alternatives(schema: &str, name: &str) -> String {
    let (schema_bracketed, schema_bare) = identifier_variants(schema);
    let (name_bracketed, name_bare) = identifier_variants(name);
    let dot = r"\s*\.\s*";
    [
        format!("{}{}{}", schema_bracketed, dot, name_bracketed),
        format!("{}{}{}", schema_bare, dot, name_bracketed),
        format!("{}{}{}", schema_bracketed, dot, name_bare),
        format!("{}{}{}", schema_bare, dot, name_bare),
        name_bracketed,
        name_bare,
    ]
    .join("|")
}

/// `(keyword)(ws)(PROC|PROCEDURE)(ws)(name)` for the given routine
fn header_regex(schema: &str, name: &str) -> MigrationResult<Regex> {
    let pattern = format!(
        r"\b(CREATE|ALTER)(\s+)(PROCEDURE|PROC)(\s+)({})",
        name_alternatives(schema, name)
    );
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            MigrationError::InvariantViolation(format!(
                "cannot build header pattern for {}.{}: {}",
                schema, name, e
            ))
        })
}

/// Rewrite a routine definition for deployment
///
/// When the routine already exists every `CREATE PROC[EDURE] <name>` header becomes
/// `ALTER`; otherwise every `ALTER` header becomes `CREATE`. The keyword spelling
/// (`PROC`/`PROCEDURE`) and the name form are preserved.
pub fn prepare_routine_script(
    definition: &str,
    schema: &str,
    name: &str,
    exists: bool,
) -> MigrationResult<String> {
    let header = header_regex(schema, name)?;
    let (from, to) = if exists {
        ("CREATE", "ALTER")
    } else {
        ("ALTER", "CREATE")
    };

    let rewritten = header.replace_all(definition, |caps: &Captures| {
        if caps[1].eq_ignore_ascii_case(from) {
            format!("{}{}{}{}{}", to, &caps[2], &caps[3], &caps[4], &caps[5])
        } else {
            caps[0].to_string()
        }
    });
    Ok(rewritten.into_owned())
}

/// Turn a routine's current definition into the script that creates its backup
///
/// The first header naming the routine is replaced by
/// `CREATE PROCEDURE [schema].[backup_name]`, or `ALTER PROCEDURE` when a backup with
/// that name already exists (same-day re-run overwrites the day's backup).
/// Returns `None` when the definition has no recognisable header.
pub fn backup_routine_script(
    current_definition: &str,
    schema: &str,
    name: &str,
    backup_name: &str,
    backup_exists: bool,
) -> MigrationResult<Option<String>> {
    let header = header_regex(schema, name)?;
    if !header.is_match(current_definition) {
        return Ok(None);
    }

    let keyword = if backup_exists { "ALTER" } else { "CREATE" };
    let replacement = format!("{} PROCEDURE {}", keyword, qualified_name(schema, backup_name));
    Ok(Some(
        header
            .replacen(current_definition, 1, regex::NoExpand(&replacement))
            .into_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "\nAS\nBEGIN\n    SELECT * FROM dbo.Orders\nEND";

    #[test]
    fn test_existing_routine_becomes_alter() {
        let definition = format!("CREATE PROCEDURE [dbo].[GetOrders]{}", BODY);
        let script = prepare_routine_script(&definition, "dbo", "GetOrders", true).unwrap();
        assert_eq!(script, format!("ALTER PROCEDURE [dbo].[GetOrders]{}", BODY));
    }

    #[test]
    fn test_missing_routine_becomes_create() {
        let definition = format!("alter proc dbo.GetOrders{}", BODY);
        let script = prepare_routine_script(&definition, "dbo", "GetOrders", false).unwrap();
        assert_eq!(script, format!("CREATE proc dbo.GetOrders{}", BODY));
        assert!(!script.to_uppercase().contains("ALTER"));
    }

    #[test]
    fn test_round_trip_restores_definition() {
        let definition = format!("CREATE PROCEDURE [dbo].[Foo]{}", BODY);
        let altered = prepare_routine_script(&definition, "dbo", "Foo", true).unwrap();
        let restored = prepare_routine_script(&altered, "dbo", "Foo", false).unwrap();
        assert_eq!(restored, definition);
    }

    #[test]
    fn test_name_variants_are_recognised() {
        for header in [
            "CREATE PROCEDURE [dbo].[Foo]",
            "CREATE PROCEDURE dbo.[Foo]",
            "CREATE PROCEDURE [dbo].Foo",
            "CREATE PROCEDURE dbo.Foo",
            "CREATE PROCEDURE [Foo]",
            "CREATE PROCEDURE Foo",
            "create   proc   DBO . FOO",
        ] {
            let script = prepare_routine_script(&format!("{}{}", header, BODY), "dbo", "Foo", true)
                .unwrap();
            assert!(
                script.to_uppercase().starts_with("ALTER"),
                "header not rewritten: {}",
                header
            );
        }
    }

    #[test]
    fn test_similar_names_are_left_alone() {
        let definition = format!("CREATE PROCEDURE [dbo].[Foo_Archive]{}", BODY);
        let script = prepare_routine_script(&definition, "dbo", "Foo", true).unwrap();
        assert_eq!(script, definition);

        let definition = format!("CREATE PROCEDURE dbo.FooBar{}", BODY);
        let script = prepare_routine_script(&definition, "dbo", "Foo", true).unwrap();
        assert_eq!(script, definition);
    }

    #[test]
    fn test_backup_script_always_creates_qualified_name() {
        let current = format!("ALTER PROC dbo.GetOrders{}", BODY);
        let script = backup_routine_script(&current, "dbo", "GetOrders", "GetOrders_05032024", false)
            .unwrap()
            .unwrap();
        assert_eq!(
            script,
            format!("CREATE PROCEDURE [dbo].[GetOrders_05032024]{}", BODY)
        );

        let script = backup_routine_script(&current, "dbo", "GetOrders", "GetOrders_05032024", true)
            .unwrap()
            .unwrap();
        assert!(script.starts_with("ALTER PROCEDURE [dbo].[GetOrders_05032024]"));
    }

    #[test]
    fn test_backup_script_without_header() {
        let result =
            backup_routine_script("SELECT 1", "dbo", "GetOrders", "GetOrders_05032024", false)
                .unwrap();
        assert!(result.is_none());
    }
}
