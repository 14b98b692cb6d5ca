//! Durable list of rollback records
//!
//! The whole history lives in memory and is rewritten to a single JSON file on every
//! mutation. A missing or unreadable file loads as an empty history.

use std::path::{Path, PathBuf};

use sqlferry_core::{LocalDateTime, MigrationResult, RollbackRecord};
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct RollbackLedger {
    path: Option<PathBuf>,
    records: Vec<RollbackRecord>,
}

impl RollbackLedger {
    /// Ledger that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the ledger stored at `path`
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match fs::read_to_string(&path).await {
            Ok(text) => match serde_json::from_str::<Vec<RollbackRecord>>(&text) {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        "Error loading rollback history from {}: {}; starting empty",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(
                    "Error reading rollback history {}: {}; starting empty",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };

        debug!("Loaded {} rollback records", records.len());
        Self {
            path: Some(path),
            records,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Rewrite the backing file with the current records
    pub async fn save(&self) -> MigrationResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&self.records)?;
        fs::write(path, json).await?;
        Ok(())
    }

    pub fn records(&self) -> &[RollbackRecord] {
        &self.records
    }

    pub fn append(&mut self, record: RollbackRecord) {
        self.records.push(record);
    }

    /// Replace the stored record with the same id; `false` if there is none
    pub fn update(&mut self, record: &RollbackRecord) -> bool {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(stored) => {
                *stored = record.clone();
                true
            }
            None => false,
        }
    }

    pub fn find(&self, id: &str) -> Option<&RollbackRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Records ordered newest first
    pub fn history(&self) -> Vec<RollbackRecord> {
        let mut records = self.records.clone();
        records.sort_by(|a, b| b.migration_timestamp.cmp(&a.migration_timestamp));
        records
    }

    /// Drop records older than `cutoff`; returns how many were removed
    pub fn remove_older_than(&mut self, cutoff: LocalDateTime) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.migration_timestamp >= cutoff);
        before - self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};
    use tempfile::TempDir;

    fn record_at(ts: LocalDateTime) -> RollbackRecord {
        RollbackRecord::new("Dev", vec!["QA".to_string()], ts)
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = RollbackLedger::load(dir.path().join("rollback_history.json")).await;
        assert!(ledger.records().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rollback_history.json");
        std::fs::write(&path, "{ not json").unwrap();

        let ledger = RollbackLedger::load(&path).await;
        assert!(ledger.records().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("rollback_history.json");

        let mut ledger = RollbackLedger::load(&path).await;
        let record = record_at(Local::now());
        ledger.append(record.clone());
        ledger.save().await.unwrap();

        let reloaded = RollbackLedger::load(&path).await;
        assert_eq!(reloaded.records(), &[record]);
    }

    #[test]
    fn test_history_newest_first_and_cleanup() {
        let now = Local::now();
        let mut ledger = RollbackLedger::in_memory();
        ledger.append(record_at(now - Duration::days(40)));
        ledger.append(record_at(now));
        ledger.append(record_at(now - Duration::days(2)));

        let history = ledger.history();
        assert_eq!(history[0].migration_timestamp, now);
        assert_eq!(history[2].migration_timestamp, now - Duration::days(40));

        let removed = ledger.remove_older_than(now - Duration::days(30));
        assert_eq!(removed, 1);
        assert_eq!(ledger.records().len(), 2);
    }

    #[test]
    fn test_update_replaces_by_id() {
        let mut ledger = RollbackLedger::in_memory();
        let mut record = record_at(Local::now());
        ledger.append(record.clone());

        record.can_rollback = false;
        assert!(ledger.update(&record));
        assert!(!ledger.find(&record.id).unwrap().can_rollback);

        let stranger = record_at(Local::now());
        assert!(!ledger.update(&stranger));
    }
}
