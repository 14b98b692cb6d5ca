//! Pre-change backups of routines

use sqlferry_catalog::CatalogSession;
use sqlferry_core::{BackupInfo, BackupKind, LocalDateTime, MigrationError, MigrationResult, Routine};
use tracing::info;

use crate::script::backup_routine_script;

/// Copy the routine's current target definition to `<name>_<ddMMyyyy>`
///
/// Runs on the caller's session so the backup shares the deployment transaction.
/// Returns `None` when the target has no definition text to preserve.
/// A backup already taken today under the same name is overwritten with `ALTER`.
pub async fn backup_routine(
    session: &mut dyn CatalogSession,
    target_database: &str,
    routine: &Routine,
    timestamp: LocalDateTime,
) -> MigrationResult<Option<BackupInfo>> {
    let full_name = routine.full_name();
    let current = session
        .routine_definition(Some(&routine.schema), &routine.name)
        .await?
        .unwrap_or_default();

    if current.trim().is_empty() {
        info!(
            "No current definition for {} in {}; backup skipped",
            full_name, target_database
        );
        return Ok(None);
    }

    let backup = BackupInfo::new(&routine.name, target_database, timestamp, BackupKind::Routine);
    let already_backed_up = session
        .routine_exists(&routine.schema, &backup.backup_name)
        .await?;

    let script = backup_routine_script(
        &current,
        &routine.schema,
        &routine.name,
        &backup.backup_name,
        already_backed_up,
    )?
    .ok_or_else(|| {
        MigrationError::deployment(
            &full_name,
            "current definition has no recognisable procedure header to back up",
        )
    })?;

    session
        .execute(&script)
        .await
        .map_err(|e| MigrationError::deployment(&full_name, e))?;

    if already_backed_up {
        info!(
            "Overwrote today's backup {} of {} in {}",
            backup.backup_name, full_name, target_database
        );
    } else {
        info!(
            "Backed up {} as {} in {}",
            full_name, backup.backup_name, target_database
        );
    }
    Ok(Some(backup))
}
