//! Rollback records and restore results

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::backup::BackupInfo;
use crate::types::LocalDateTime;

/// One migration run and the backups it left behind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRecord {
    pub id: String,
    pub migration_timestamp: LocalDateTime,
    pub source_database: String,
    pub target_databases: Vec<String>,
    #[serde(default)]
    pub backup_routines: Vec<BackupInfo>,
    #[serde(default)]
    pub backup_tables: Vec<BackupInfo>,
    /// Cleared after the first successful restore
    pub can_rollback: bool,
    /// Opaque snapshot of the options the run used
    #[serde(default)]
    pub migration_settings: String,
}

impl RollbackRecord {
    pub fn new(
        source_database: impl Into<String>,
        target_databases: Vec<String>,
        migration_timestamp: LocalDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            migration_timestamp,
            source_database: source_database.into(),
            target_databases,
            backup_routines: Vec::new(),
            backup_tables: Vec::new(),
            can_rollback: true,
            migration_settings: String::new(),
        }
    }

    /// Number of restorable items; drives rollback progress
    pub fn backup_count(&self) -> usize {
        self.backup_routines.len() + self.backup_tables.len()
    }

    pub fn display_name(&self) -> String {
        format!(
            "{} - {} -> {}",
            self.migration_timestamp.format("%d/%m/%Y %H:%M:%S"),
            self.source_database,
            self.target_databases.join(", ")
        )
    }

    pub fn status_text(&self) -> &'static str {
        if self.can_rollback {
            "Available"
        } else {
            "Already rolled back"
        }
    }
}

/// Outcome of restoring one rollback record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackResult {
    pub success: bool,
    pub message: String,
    pub restored_count: usize,
    pub failed_count: usize,
    /// Table backups counted as restored although no DDL ran
    pub skipped_tables: usize,
    pub errors: Vec<String>,
    pub duration: Duration,
}

impl RollbackResult {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Default::default()
        }
    }
}
