/// Application folder name under the platform data directory
pub const APP_DIR_NAME: &str = "sqlferry";
/// Recently used connections
pub const CONNECTIONS_FILE: &str = "connections.json";
/// Rollback ledger
pub const ROLLBACK_HISTORY_FILE: &str = "rollback_history.json";
/// Database used for server-level catalog queries
pub const MASTER_DATABASE: &str = "master";
/// Databases never offered as migration sources or targets
pub const SYSTEM_DATABASES: [&str; 4] = ["master", "tempdb", "model", "msdb"];
/// Schema used when a definition does not qualify the object name
pub const DEFAULT_SCHEMA: &str = "dbo";
