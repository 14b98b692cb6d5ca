//! Shared type aliases

use chrono::{DateTime, Local};

/// Wall-clock timestamp used for migration runs and backup naming
///
/// Backup names embed the local calendar day (`ddMMyyyy`), so every timestamp that
/// feeds a backup name has to be local time rather than UTC.
pub type LocalDateTime = DateTime<Local>;

/// Current local time
pub fn now() -> LocalDateTime {
    Local::now()
}
