use clap::{Args, Subcommand};
use colored::Colorize;
use sqlferry_config::{AppPaths, ConnectionStore};

use super::{print_banner, ConnectionArgs};

#[derive(Args)]
pub struct ConnectionsCommand {
    #[command(subcommand)]
    command: ConnectionsCommands,
}

#[derive(Subcommand)]
enum ConnectionsCommands {
    /// List saved connections, most recently used first
    List,
    /// Forget a saved connection
    Remove(RemoveConnectionArgs),
}

#[derive(Args)]
struct RemoveConnectionArgs {
    #[command(flatten)]
    connection: ConnectionArgs,
}

impl ConnectionsCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let paths = AppPaths::resolve()?;
        let mut store = ConnectionStore::load(paths.connections_file());

        match self.command {
            ConnectionsCommands::List => {
                if store.list().is_empty() {
                    println!("{}", "No saved connections.".bright_yellow());
                    return Ok(());
                }
                print_banner("Saved connections");
                for entry in store.list() {
                    println!(
                        "  {} {}",
                        entry.descriptor.server_label().bright_cyan(),
                        entry
                            .last_used
                            .format("last used %Y-%m-%d %H:%M")
                            .to_string()
                            .dimmed()
                    );
                }
                println!();
                Ok(())
            }
            ConnectionsCommands::Remove(args) => {
                if args.connection.server.is_none() {
                    return Err(anyhow::anyhow!("--server is required to remove a connection"));
                }
                let descriptor = args.connection.resolve(&store)?;
                if store.remove(&descriptor) {
                    println!(
                        "{} {}",
                        "Removed:".bright_green().bold(),
                        descriptor.server_label()
                    );
                    Ok(())
                } else {
                    Err(anyhow::anyhow!(
                        "No saved connection for {}",
                        descriptor.server_label()
                    ))
                }
            }
        }
    }
}
