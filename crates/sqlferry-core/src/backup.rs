//! Backup naming and metadata
//!
//! A backup is a renamed copy of an object's pre-migration definition. There is one
//! backup slot per object per calendar day: the name embeds the local date as
//! `ddMMyyyy`, so a second migration on the same day reuses the same name.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::LocalDateTime;

/// `<original>_<ddMMyyyy>`
pub fn backup_name(original: &str, date: NaiveDate) -> String {
    format!("{}_{}", original, date.format("%d%m%Y"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupKind {
    Routine,
    Table,
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupKind::Routine => write!(f, "Routine"),
            BackupKind::Table => write!(f, "Table"),
        }
    }
}

/// Reference to one backup object living in a target database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub original_name: String,
    pub backup_name: String,
    pub target_database: String,
    pub backup_timestamp: LocalDateTime,
    pub kind: BackupKind,
}

impl BackupInfo {
    /// Build the reference for `original_name` using the naming formula for `timestamp`'s day
    pub fn new(
        original_name: impl Into<String>,
        target_database: impl Into<String>,
        timestamp: LocalDateTime,
        kind: BackupKind,
    ) -> Self {
        let original_name = original_name.into();
        Self {
            backup_name: backup_name(&original_name, timestamp.date_naive()),
            original_name,
            target_database: target_database.into(),
            backup_timestamp: timestamp,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};

    #[test]
    fn test_backup_name_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(backup_name("Orders", date), "Orders_05032024");

        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(backup_name("usp_Sync", date), "usp_Sync_31122023");
    }

    #[test]
    fn test_same_day_shares_backup_name() {
        let morning = Local.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();
        let evening = Local.with_ymd_and_hms(2024, 3, 5, 22, 30, 0).unwrap();

        let first = BackupInfo::new("Orders", "Sales", morning, BackupKind::Routine);
        let second = BackupInfo::new("Orders", "Sales", evening, BackupKind::Routine);
        assert_eq!(first.backup_name, second.backup_name);
        assert_eq!(first.backup_name, "Orders_05032024");
    }
}
