use sqlferry_core::MigrationError;
use thiserror::Error;

/// Errors raised while talking to a server's catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Connection could not be opened (network, login, unknown database)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A query or batch failed on an open connection
    #[error("Query failed: {0}")]
    Query(String),

    /// A catalog row did not have the expected shape
    #[error("Unexpected catalog value: {0}")]
    Decode(String),
}

impl CatalogError {
    pub fn connection(msg: impl Into<String>) -> Self {
        CatalogError::Connection(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        CatalogError::Query(msg.into())
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, CatalogError::Connection(_))
    }
}

impl From<CatalogError> for MigrationError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Connection(msg) => MigrationError::Connectivity(msg),
            CatalogError::Query(msg) => MigrationError::Catalog(msg),
            CatalogError::Decode(msg) => MigrationError::Catalog(msg),
        }
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
