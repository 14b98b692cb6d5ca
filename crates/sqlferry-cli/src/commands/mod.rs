pub mod connections;
pub mod explore;
pub mod history;
pub mod migrate;

pub use connections::ConnectionsCommand;
pub use explore::{DatabasesCommand, ObjectsCommand, TestConnectionCommand};
pub use history::{CleanupCommand, HistoryCommand, RollbackCommand};
pub use migrate::{MigrateCommand, PreviewTableCommand};

use clap::Args;
use colored::Colorize;
use sqlferry_config::{AppPaths, ConnectionStore};
use sqlferry_core::{ConnectionDescriptor, EventReceiver, MigrationEvent, DEFAULT_SCHEMA};
use tracing::debug;

/// Server and credentials shared by every database command
///
/// Without `--server` the most recently used saved connection is reused.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Server host, optionally `host,port`
    #[arg(long, env = "SQLFERRY_SERVER")]
    pub server: Option<String>,

    /// SQL login name
    #[arg(long, env = "SQLFERRY_USER")]
    pub user: Option<String>,

    /// SQL login password
    #[arg(long, env = "SQLFERRY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Use Windows authentication instead of a SQL login; `--user` is ignored
    #[arg(long)]
    pub integrated: bool,
}

impl ConnectionArgs {
    /// Server-level descriptor from the flags, or from the saved connections
    pub fn resolve(&self, store: &ConnectionStore) -> anyhow::Result<ConnectionDescriptor> {
        let Some(server) = self.server.as_deref() else {
            let saved = store.list().first().ok_or_else(|| {
                anyhow::anyhow!("No --server given and no saved connection to reuse")
            })?;
            debug!("Reusing saved connection {}", saved.descriptor);
            return Ok(saved.descriptor.for_server());
        };

        if self.integrated {
            return Ok(ConnectionDescriptor::integrated(server));
        }
        let user = self
            .user
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--user is required unless --integrated is set"))?;
        Ok(ConnectionDescriptor::credentialed(
            server,
            user,
            self.password.as_deref().unwrap_or_default(),
        )?)
    }
}

/// Data directory, saved connections and the resolved server descriptor
pub struct Session {
    pub paths: AppPaths,
    pub store: ConnectionStore,
    pub server: ConnectionDescriptor,
}

impl Session {
    pub fn open(args: &ConnectionArgs) -> anyhow::Result<Self> {
        let paths = AppPaths::resolve()?;
        let store = ConnectionStore::load(paths.connections_file());
        let server = args.resolve(&store)?;
        Ok(Self {
            paths,
            store,
            server,
        })
    }

    /// Remember the server after it was used successfully
    pub fn remember(&mut self) {
        self.store.save_server(&self.server);
    }
}

/// `schema.name`, or `name` in the default schema
pub fn split_object_name(text: &str) -> (String, String) {
    match text.split_once('.') {
        Some((schema, name)) => (
            schema.trim_matches(|c| c == '[' || c == ']').to_string(),
            name.trim_matches(|c| c == '[' || c == ']').to_string(),
        ),
        None => (
            DEFAULT_SCHEMA.to_string(),
            text.trim_matches(|c| c == '[' || c == ']').to_string(),
        ),
    }
}

/// Print migration events until every sender is dropped
pub async fn print_events(mut events: EventReceiver) {
    while let Some(event) = events.recv().await {
        match event {
            MigrationEvent::Log(text) => {
                if text.starts_with("Failed") || text.contains("error") {
                    println!("{}", text.bright_red());
                } else {
                    println!("{}", text);
                }
            }
            MigrationEvent::Progress(percent) => {
                println!("{}", format!("[{:>3}%]", percent).dimmed());
            }
        }
    }
}

pub fn print_banner(title: &str) {
    println!();
    println!("{}", "━".repeat(60).bright_green());
    println!("{}", format!("   {}", title).bright_white().bold());
    println!("{}", "━".repeat(60).bright_green());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_object_name() {
        assert_eq!(
            split_object_name("audit.Purge"),
            ("audit".to_string(), "Purge".to_string())
        );
        assert_eq!(
            split_object_name("[dbo].[Customer]"),
            ("dbo".to_string(), "Customer".to_string())
        );
        assert_eq!(
            split_object_name("GetOrders"),
            ("dbo".to_string(), "GetOrders".to_string())
        );
    }

    #[test]
    fn test_integrated_flag_builds_integrated_descriptor() {
        let dir = std::env::temp_dir().join("sqlferry-cli-args-test.json");
        let store = ConnectionStore::load(dir);
        let args = ConnectionArgs {
            server: Some("db01".to_string()),
            user: None,
            password: None,
            integrated: true,
        };
        let descriptor = args.resolve(&store).unwrap();
        assert_eq!(descriptor.server_label(), "db01 (Windows Authentication)");

        let missing_user = ConnectionArgs {
            integrated: false,
            ..args
        };
        assert!(missing_user.resolve(&store).is_err());
    }
}
