//! Core models and types shared across all sqlferry crates

pub mod backup;
pub mod connection;
pub mod error;
pub mod events;
pub mod models;
pub mod rollback;
pub mod types;
pub mod utils;
mod constants;

// Re-export commonly used types
pub use backup::*;
pub use connection::*;
pub use constants::*;
pub use error::*;
pub use events::*;
pub use models::*;
pub use rollback::*;
pub use types::*;
pub use utils::*;

// Re-export external dependencies
pub use chrono;
pub use serde;
pub use serde_json;
pub use tracing;
