//! Connection descriptors
//!
//! A descriptor names one server/database pair and how to authenticate against it.
//! Descriptors are immutable: per-target copies are derived with [`ConnectionDescriptor::for_database`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::MASTER_DATABASE;
use crate::error::{MigrationError, MigrationResult};
use crate::utils::mask_sensitive;

/// How the client authenticates against the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Operating-system (Windows) authentication
    Integrated,
    /// SQL login with username and password
    Credentialed,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Integrated => write!(f, "integrated"),
            AuthMode::Credentialed => write!(f, "credentialed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    server: String,
    auth: AuthMode,
    #[serde(default)]
    username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    password: String,
    #[serde(default)]
    database: String,
    #[serde(default)]
    display_label: String,
}

impl ConnectionDescriptor {
    /// Descriptor using integrated authentication
    pub fn integrated(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            auth: AuthMode::Integrated,
            username: String::new(),
            password: String::new(),
            database: String::new(),
            display_label: String::new(),
        }
    }

    /// Descriptor using a SQL login; the username must not be empty
    pub fn credentialed(
        server: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> MigrationResult<Self> {
        let descriptor = Self {
            server: server.into(),
            auth: AuthMode::Credentialed,
            username: username.into(),
            password: password.into(),
            database: String::new(),
            display_label: String::new(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check the descriptor invariants; used after deserialization
    pub fn validate(&self) -> MigrationResult<()> {
        if self.server.trim().is_empty() {
            return Err(MigrationError::Configuration(
                "server name must not be empty".to_string(),
            ));
        }
        if self.auth == AuthMode::Credentialed && self.username.trim().is_empty() {
            return Err(MigrationError::Configuration(
                "credentialed authentication requires a username".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy of this descriptor pointing at another database; nothing else changes
    pub fn for_database(&self, database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..self.clone()
        }
    }

    /// Server-level copy with no database selected
    pub fn for_server(&self) -> Self {
        Self {
            database: String::new(),
            display_label: self.server_label(),
            ..self.clone()
        }
    }

    pub fn with_display_label(self, label: impl Into<String>) -> Self {
        Self {
            display_label: label.into(),
            ..self
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn auth(&self) -> AuthMode {
        self.auth
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Database to open; server-level descriptors open `master`
    pub fn effective_database(&self) -> &str {
        if self.database.is_empty() {
            MASTER_DATABASE
        } else {
            &self.database
        }
    }

    pub fn display_label(&self) -> &str {
        if self.display_label.is_empty() {
            &self.server
        } else {
            &self.display_label
        }
    }

    /// Key identifying "the same saved connection": server, auth mode and username
    pub fn unique_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.server,
            self.auth == AuthMode::Integrated,
            self.username
        )
    }

    /// `"<server> (Windows Authentication)"` or `"<server> (SQL Auth: <user>)"`
    pub fn server_label(&self) -> String {
        match self.auth {
            AuthMode::Integrated => format!("{} (Windows Authentication)", self.server),
            AuthMode::Credentialed => format!("{} (SQL Auth: {})", self.server, self.username),
        }
    }

    /// ADO-style connection string
    pub fn connection_string(&self) -> String {
        self.render_connection_string(&self.password)
    }

    /// Connection string safe for logs
    pub fn redacted_connection_string(&self) -> String {
        self.render_connection_string(&mask_sensitive(&self.password))
    }

    fn render_connection_string(&self, password: &str) -> String {
        let mut parts = vec![format!("Server={}", self.server)];
        if !self.database.is_empty() {
            parts.push(format!("Database={}", self.database));
        }
        match self.auth {
            AuthMode::Integrated => parts.push("Integrated Security=true".to_string()),
            AuthMode::Credentialed => {
                parts.push(format!("User Id={}", self.username));
                parts.push(format!("Password={}", password));
            }
        }
        parts.push("TrustServerCertificate=true".to_string());
        format!("{};", parts.join(";"))
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.server_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentialed_requires_username() {
        assert!(ConnectionDescriptor::credentialed("db01", "", "pw").is_err());
        assert!(ConnectionDescriptor::credentialed("db01", "  ", "pw").is_err());
        assert!(ConnectionDescriptor::credentialed("db01", "sa", "pw").is_ok());
    }

    #[test]
    fn test_for_database_only_changes_database() {
        let template = ConnectionDescriptor::credentialed("db01", "sa", "pw")
            .unwrap()
            .for_database("Source");
        let target = template.for_database("Target");

        assert_eq!(target.database(), "Target");
        assert_eq!(target.server(), template.server());
        assert_eq!(target.username(), template.username());
        assert_eq!(target.password(), template.password());
        assert_eq!(template.database(), "Source");
    }

    #[test]
    fn test_server_level_descriptor_opens_master() {
        let desc = ConnectionDescriptor::integrated("db01").for_database("Sales");
        let server = desc.for_server();
        assert_eq!(server.database(), "");
        assert_eq!(server.effective_database(), "master");
        assert_eq!(server.display_label(), "db01 (Windows Authentication)");
    }

    #[test]
    fn test_connection_string_and_redaction() {
        let desc = ConnectionDescriptor::credentialed("db01", "sa", "VerySecret123")
            .unwrap()
            .for_database("Sales");
        assert_eq!(
            desc.connection_string(),
            "Server=db01;Database=Sales;User Id=sa;Password=VerySecret123;TrustServerCertificate=true;"
        );
        assert!(!desc.redacted_connection_string().contains("VerySecret123"));

        let integrated = ConnectionDescriptor::integrated("db01");
        assert_eq!(
            integrated.connection_string(),
            "Server=db01;Integrated Security=true;TrustServerCertificate=true;"
        );
    }

    #[test]
    fn test_unique_key_ignores_database() {
        let a = ConnectionDescriptor::credentialed("db01", "sa", "a")
            .unwrap()
            .for_database("One");
        let b = ConnectionDescriptor::credentialed("db01", "sa", "b")
            .unwrap()
            .for_database("Two");
        assert_eq!(a.unique_key(), b.unique_key());
        assert_ne!(
            a.unique_key(),
            ConnectionDescriptor::integrated("db01").unique_key()
        );
    }
}
