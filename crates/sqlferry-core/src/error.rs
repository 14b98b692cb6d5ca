//! Error taxonomy shared by every sqlferry component

use thiserror::Error;

/// Migration error types
#[derive(Error, Debug)]
pub enum MigrationError {
    /// The server could not be reached or refused the credentials
    #[error("Connection failed: {0}")]
    Connectivity(String),

    /// A catalog query failed after the connection was established
    #[error("Catalog query failed: {0}")]
    Catalog(String),

    /// A DDL statement failed; the object's transaction was rolled back
    #[error("Failed to deploy '{object_name}': {cause}")]
    Deployment { object_name: String, cause: String },

    /// An object marked for creation has no definition text
    #[error("No definition available for {0}")]
    MissingDefinition(String),

    /// Post-change verification disagreed with what was just executed
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The rollback record is no longer eligible for restore
    #[error("{0}")]
    RollbackUnavailable(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrationError {
    pub fn deployment(object_name: impl Into<String>, cause: impl ToString) -> Self {
        MigrationError::Deployment {
            object_name: object_name.into(),
            cause: cause.to_string(),
        }
    }

    /// Short machine-friendly name of the error kind, used in run summaries
    pub fn kind(&self) -> &'static str {
        match self {
            MigrationError::Connectivity(_) => "ConnectivityError",
            MigrationError::Catalog(_) => "CatalogError",
            MigrationError::Deployment { .. } => "DeploymentError",
            MigrationError::MissingDefinition(_) => "MissingDefinitionError",
            MigrationError::InvariantViolation(_) => "InvariantViolation",
            MigrationError::RollbackUnavailable(_) => "RollbackUnavailable",
            MigrationError::Configuration(_) => "ConfigurationError",
            MigrationError::Io(_) => "IoError",
            MigrationError::Serialization(_) => "SerializationError",
        }
    }
}

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;
