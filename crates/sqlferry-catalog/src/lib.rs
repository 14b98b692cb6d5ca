//! Catalog access for sqlferry
//!
//! The [`Connector`]/[`CatalogSession`] traits abstract one server connection; the
//! tiberius-backed [`MssqlConnector`] talks to SQL Server and `test_utils::MemoryServer`
//! (behind the `test-utils` feature) stands in for it in tests. [`CatalogReader`] is the
//! descriptor-based façade the rest of the workspace uses.

pub mod ddl;
pub mod error;
pub mod mssql;
pub mod reader;
pub mod sql;
pub mod traits;

// Export test utilities for use by other crates in their tests
#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use ddl::create_table_script;
pub use error::{CatalogError, CatalogResult};
pub use mssql::{MssqlConnector, MssqlSession};
pub use reader::CatalogReader;
pub use traits::{CatalogSession, Connector};
