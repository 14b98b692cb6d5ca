//! Recently used connections, persisted as `connections.json`
//!
//! Entries are kept most recently used first. The file is rewritten whole after every
//! change; a write failure is logged and the in-memory list stays authoritative.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sqlferry_core::ConnectionDescriptor;
use tracing::{debug, error, warn};

use crate::paths::ConfigResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConnection {
    pub descriptor: ConnectionDescriptor,
    pub last_used: DateTime<Local>,
}

#[derive(Debug)]
pub struct ConnectionStore {
    path: PathBuf,
    entries: Vec<StoredConnection>,
}

fn same_key(a: &ConnectionDescriptor, b: &ConnectionDescriptor) -> bool {
    a.unique_key().eq_ignore_ascii_case(&b.unique_key())
}

impl ConnectionStore {
    /// Load the store at `path`; a missing or corrupt file gives an empty store
    ///
    /// Entries that fail [`ConnectionDescriptor::validate`] are dropped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<Vec<StoredConnection>>(&text).unwrap_or_else(|e| {
                warn!(
                    "Error loading saved connections from {}: {}",
                    path.display(),
                    e
                );
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Error reading {}: {}", path.display(), e);
                Vec::new()
            }
        };

        let entries = entries
            .into_iter()
            .filter(|entry| match entry.descriptor.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        "Ignoring saved connection {} from {}: {}",
                        entry.descriptor.server_label(),
                        path.display(),
                        e
                    );
                    false
                }
            })
            .collect();

        let mut store = Self { path, entries };
        store.sort();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved connections, most recently used first
    pub fn list(&self) -> &[StoredConnection] {
        &self.entries
    }

    /// Remember `descriptor`, replacing any entry for the same server, auth mode and user
    pub fn save(&mut self, descriptor: &ConnectionDescriptor) {
        self.entries.retain(|e| !same_key(&e.descriptor, descriptor));
        self.entries.insert(
            0,
            StoredConnection {
                descriptor: descriptor.clone(),
                last_used: Local::now(),
            },
        );
        self.persist();
    }

    /// Remember the server-level form of `descriptor` (no database)
    pub fn save_server(&mut self, descriptor: &ConnectionDescriptor) {
        self.save(&descriptor.for_server());
    }

    /// Forget `descriptor`; returns whether an entry was removed
    pub fn remove(&mut self, descriptor: &ConnectionDescriptor) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !same_key(&e.descriptor, descriptor));
        let removed = self.entries.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Mark a saved connection as just used; `false` if it is not saved
    pub fn touch(&mut self, descriptor: &ConnectionDescriptor) -> bool {
        let Some(index) = self
            .entries
            .iter()
            .position(|e| same_key(&e.descriptor, descriptor))
        else {
            return false;
        };
        let mut entry = self.entries.remove(index);
        entry.last_used = Local::now();
        self.entries.insert(0, entry);
        self.persist();
        true
    }

    /// Saved connections reduced to their server-level descriptors
    pub fn server_connections(&self) -> Vec<ConnectionDescriptor> {
        self.entries
            .iter()
            .map(|e| e.descriptor.for_server())
            .collect()
    }

    fn sort(&mut self) {
        self.entries.sort_by(|a, b| b.last_used.cmp(&a.last_used));
    }

    fn persist(&self) {
        if let Err(e) = self.write() {
            error!(
                "Error saving connections to {}: {}",
                self.path.display(),
                e
            );
        }
    }

    fn write(&self) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        debug!("Saved {} connections", self.entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sql_login(server: &str, user: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::credentialed(server, user, "pw").unwrap()
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("connections.json");
        fs::write(&path, "[{").unwrap();

        assert!(ConnectionStore::load(&path).list().is_empty());
    }

    #[test]
    fn test_invalid_entries_are_dropped_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("connections.json");
        let mut valid = serde_json::to_value(StoredConnection {
            descriptor: sql_login("db01", "sa"),
            last_used: Local::now(),
        })
        .unwrap();
        let mut blank_user = valid.clone();
        blank_user["descriptor"]["server"] = serde_json::json!("db02");
        blank_user["descriptor"]["username"] = serde_json::json!("");
        fs::write(
            &path,
            serde_json::to_string(&vec![blank_user, valid.take()]).unwrap(),
        )
        .unwrap();

        let store = ConnectionStore::load(&path);

        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].descriptor.server(), "db01");
        assert!(store.list()[0].descriptor.validate().is_ok());
    }

    #[test]
    fn test_same_key_replaces_entry() {
        let dir = TempDir::new().unwrap();
        let mut store = ConnectionStore::load(dir.path().join("connections.json"));

        store.save(&sql_login("DB01", "sa").for_database("Sales"));
        store.save(&sql_login("db01", "SA").for_database("Billing"));

        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].descriptor.database(), "Billing");
    }

    #[test]
    fn test_most_recent_first_and_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("connections.json");
        let mut store = ConnectionStore::load(&path);

        let first = sql_login("db01", "sa");
        let second = ConnectionDescriptor::integrated("db02");
        store.save(&first);
        store.save(&second);
        assert_eq!(store.list()[0].descriptor, second);

        assert!(store.touch(&first));
        assert_eq!(store.list()[0].descriptor, first);

        let reloaded = ConnectionStore::load(&path);
        assert_eq!(reloaded.list().len(), 2);
        assert_eq!(reloaded.list()[0].descriptor, first);
    }

    #[test]
    fn test_remove_and_server_entries() {
        let dir = TempDir::new().unwrap();
        let mut store = ConnectionStore::load(dir.path().join("connections.json"));

        store.save_server(&sql_login("db01", "sa").for_database("Sales"));
        assert_eq!(store.list()[0].descriptor.database(), "");
        assert_eq!(store.server_connections()[0].server(), "db01");

        assert!(!store.remove(&sql_login("db01", "other")));
        assert!(store.remove(&sql_login("db01", "sa")));
        assert!(store.list().is_empty());
        assert!(!store.touch(&sql_login("db01", "sa")));
    }
}
