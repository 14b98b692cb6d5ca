//! Rollback ledger for sqlferry
//!
//! Every migration run can be recorded together with the backups it produced. A
//! record can later be replayed once: each routine backup is renamed back to its
//! original name and applied with `ALTER PROCEDURE`.

pub mod convert;
pub mod ledger;
pub mod service;

pub use convert::convert_to_alter_script;
pub use ledger::RollbackLedger;
pub use service::{MigrationScope, RollbackService, DEFAULT_RETENTION_DAYS};
