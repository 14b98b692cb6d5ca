//! Recording migrations and restoring their backups

use std::time::Instant;

use chrono::Duration;
use sqlferry_catalog::CatalogReader;
use sqlferry_core::{
    percent, BackupInfo, BackupKind, ConnectionDescriptor, EventSink, LocalDateTime,
    MigrationError, MigrationResult, RollbackRecord, RollbackResult, Routine, Table,
};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::convert::convert_to_alter_script;
use crate::ledger::RollbackLedger;

/// Default retention for [`RollbackService::cleanup_older_than`]
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// What a migration run deployed, as handed to [`RollbackService::record_migration`]
#[derive(Debug, Clone, Copy)]
pub struct MigrationScope<'a> {
    pub source_database: &'a str,
    pub target_databases: &'a [String],
    pub routines: &'a [Routine],
    pub tables: &'a [Table],
    pub settings: &'a str,
}

pub struct RollbackService {
    reader: CatalogReader,
    ledger: RwLock<RollbackLedger>,
    events: EventSink,
    clock: fn() -> LocalDateTime,
}

impl RollbackService {
    pub fn new(reader: CatalogReader, ledger: RollbackLedger, events: EventSink) -> Self {
        Self {
            reader,
            ledger: RwLock::new(ledger),
            events,
            clock: sqlferry_core::now,
        }
    }

    /// Replace the time source used for record timestamps and backup names
    pub fn with_clock(mut self, clock: fn() -> LocalDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Record a run, keeping only the backups the target catalogs confirm
    ///
    /// `connection` is a template: its database is replaced by each target database.
    pub async fn record_migration(
        &self,
        scope: MigrationScope<'_>,
        connection: &ConnectionDescriptor,
    ) -> MigrationResult<RollbackRecord> {
        self.events
            .log("Recording migration information for rollback...");

        let timestamp = (self.clock)();
        let mut record = RollbackRecord::new(
            scope.source_database,
            scope.target_databases.to_vec(),
            timestamp,
        );
        record.migration_settings = scope.settings.to_string();

        for target_db in scope.target_databases {
            let target = connection.for_database(target_db);
            for routine in scope.routines {
                let backup = BackupInfo::new(&routine.name, target_db, timestamp, BackupKind::Routine);
                if self.reader.object_exists(&target, &backup.backup_name).await {
                    record.backup_routines.push(backup);
                } else {
                    debug!(
                        "No backup {} found in {}; not recorded",
                        backup.backup_name, target_db
                    );
                }
            }
            for table in scope.tables {
                let backup = BackupInfo::new(&table.name, target_db, timestamp, BackupKind::Table);
                if self.reader.object_exists(&target, &backup.backup_name).await {
                    record.backup_tables.push(backup);
                }
            }
        }

        {
            let mut ledger = self.ledger.write().await;
            ledger.append(record.clone());
            if let Err(e) = ledger.save().await {
                self.events.log(format!("Error saving rollback history: {}", e));
                error!("Error saving rollback history: {}", e);
            }
        }

        self.events
            .log(format!("Migration recorded for rollback. ID: {}", record.id));
        info!(
            "Recorded migration {} with {} backups",
            record.id,
            record.backup_count()
        );
        Ok(record)
    }

    /// Restore every backup of `record`, item by item
    ///
    /// Individual failures are collected and do not stop the run. `can_rollback` is
    /// cleared, and the ledger saved, only when no item failed.
    pub async fn rollback(
        &self,
        record: &mut RollbackRecord,
        connection: &ConnectionDescriptor,
    ) -> RollbackResult {
        let started = Instant::now();

        if !record.can_rollback {
            return RollbackResult {
                duration: started.elapsed(),
                ..RollbackResult::unavailable("This migration cannot be rolled back")
            };
        }

        self.events
            .log(format!("Starting rollback for migration: {}", record.id));
        self.events.log(format!(
            "Migration date: {}",
            record.migration_timestamp.format("%Y-%m-%d %H:%M:%S")
        ));

        let mut result = RollbackResult::default();
        let total = record.backup_count();
        let mut processed = 0;

        for target_db in &record.target_databases {
            let routines: Vec<&BackupInfo> = record
                .backup_routines
                .iter()
                .filter(|b| &b.target_database == target_db)
                .collect();
            if !routines.is_empty() {
                self.events
                    .log(format!("Rolling back procedures in database: {}", target_db));
            }

            let target = connection.for_database(target_db);
            for backup in routines {
                match self.restore_routine(&target, backup).await {
                    Ok(()) => {
                        result.restored_count += 1;
                        self.events.log(format!(
                            "Restored procedure: {} from backup {} using ALTER",
                            backup.original_name, backup.backup_name
                        ));
                    }
                    Err(e) => {
                        result.failed_count += 1;
                        let message = format!(
                            "Failed to restore procedure {}: {}",
                            backup.original_name, e
                        );
                        warn!("{}", message);
                        self.events.log(message.clone());
                        result.errors.push(message);
                    }
                }
                processed += 1;
                self.events.progress(percent(processed, total));
            }

            let tables: Vec<&BackupInfo> = record
                .backup_tables
                .iter()
                .filter(|b| &b.target_database == target_db)
                .collect();
            if !tables.is_empty() {
                self.events
                    .log(format!("Rolling back tables in database: {}", target_db));
            }
            for backup in tables {
                // Table backups are tracked but there is no restore path for them yet
                self.events.log(format!(
                    "Table backup found: {} -> {}",
                    backup.original_name, backup.backup_name
                ));
                self.events
                    .log("   Note: Table restoration not implemented yet; no changes made");
                result.restored_count += 1;
                result.skipped_tables += 1;
                processed += 1;
                self.events.progress(percent(processed, total));
            }
        }

        result.duration = started.elapsed();
        if result.failed_count == 0 {
            result.success = true;
            result.message = format!(
                "Rollback completed successfully. Restored {} items.",
                result.restored_count
            );
            record.can_rollback = false;

            let mut ledger = self.ledger.write().await;
            ledger.update(record);
            if let Err(e) = ledger.save().await {
                self.events.log(format!("Error saving rollback history: {}", e));
                error!("Error saving rollback history: {}", e);
            }
        } else {
            result.message = format!(
                "Rollback completed with errors. Restored: {}, Failed: {}",
                result.restored_count, result.failed_count
            );
        }

        self.events.log(format!(
            "Rollback duration: {:.1} seconds",
            result.duration.as_secs_f64()
        ));
        result
    }

    /// Roll back the stored record with this id
    pub async fn rollback_by_id(
        &self,
        id: &str,
        connection: &ConnectionDescriptor,
    ) -> MigrationResult<RollbackResult> {
        let mut record = self.find(id).await.ok_or_else(|| {
            MigrationError::RollbackUnavailable(format!("No rollback record with id {}", id))
        })?;
        Ok(self.rollback(&mut record, connection).await)
    }

    async fn restore_routine(
        &self,
        target: &ConnectionDescriptor,
        backup: &BackupInfo,
    ) -> MigrationResult<()> {
        let definition = self
            .reader
            .routine_definition(target, None, &backup.backup_name)
            .await?
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| {
                MigrationError::Catalog(format!(
                    "Backup procedure {} not found",
                    backup.backup_name
                ))
            })?;

        let script =
            convert_to_alter_script(&definition, &backup.backup_name, &backup.original_name)?;
        if script.is_empty() {
            return Err(MigrationError::deployment(
                &backup.original_name,
                "could not generate ALTER script from backup definition",
            ));
        }

        let mut session = self.reader.open(target).await?;
        session
            .execute(&script)
            .await
            .map_err(|e| MigrationError::deployment(&backup.original_name, e))
    }

    /// All records, newest first
    pub async fn history(&self) -> Vec<RollbackRecord> {
        self.ledger.read().await.history()
    }

    pub async fn find(&self, id: &str) -> Option<RollbackRecord> {
        self.ledger.read().await.find(id).cloned()
    }

    /// Remove records older than `days` and persist; returns the number removed
    pub async fn cleanup_older_than(&self, days: i64) -> MigrationResult<usize> {
        let cutoff = (self.clock)() - Duration::days(days);
        let mut ledger = self.ledger.write().await;
        let removed = ledger.remove_older_than(cutoff);
        if removed > 0 {
            ledger.save().await?;
            self.events.log(format!(
                "Cleaned up {} old rollback records (older than {} days)",
                removed, days
            ));
        }
        Ok(removed)
    }
}
