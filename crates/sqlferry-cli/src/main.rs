//! sqlferry - migrate SQL Server procedures and tables between databases

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    CleanupCommand, ConnectionsCommand, DatabasesCommand, HistoryCommand, MigrateCommand,
    ObjectsCommand, PreviewTableCommand, RollbackCommand, TestConnectionCommand,
};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SQLFERRY_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "SQLFERRY_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the server accepts the given credentials
    TestConnection(TestConnectionCommand),
    /// List user databases on the server
    Databases(DatabasesCommand),
    /// List procedures and tables in a database
    Objects(ObjectsCommand),
    /// Deploy procedures and tables from a source database to targets
    Migrate(MigrateCommand),
    /// Show the ALTER script that would reconcile a table
    PreviewTable(PreviewTableCommand),
    /// List recorded migrations
    History(HistoryCommand),
    /// Restore the backups taken by a recorded migration
    Rollback(RollbackCommand),
    /// Remove old rollback records
    Cleanup(CleanupCommand),
    /// Manage saved connections
    Connections(ConnectionsCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_level = cli.log_level.clone();

    // RUST_LOG takes full control when set
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG environment variable: {}", e))?
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "sqlferry={level},\
             sqlferry_cli={level},\
             sqlferry_core={level},\
             sqlferry_catalog={level},\
             sqlferry_deploy={level},\
             sqlferry_rollback={level},\
             sqlferry_config={level},\
             tiberius=warn,\
             rustls=warn",
            level = log_level
        ))
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global default subscriber: {}", e))?;

    match cli.command {
        Commands::TestConnection(cmd) => cmd.execute(),
        Commands::Databases(cmd) => cmd.execute(),
        Commands::Objects(cmd) => cmd.execute(),
        Commands::Migrate(cmd) => cmd.execute(),
        Commands::PreviewTable(cmd) => cmd.execute(),
        Commands::History(cmd) => cmd.execute(),
        Commands::Rollback(cmd) => cmd.execute(),
        Commands::Cleanup(cmd) => cmd.execute(),
        Commands::Connections(cmd) => cmd.execute(),
    }
}
