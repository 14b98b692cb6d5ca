mod paths;
mod store;

pub use paths::{AppPaths, ConfigError, ConfigResult, DATA_DIR_ENV};
pub use store::{ConnectionStore, StoredConnection};
