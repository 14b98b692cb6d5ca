use clap::Args;
use colored::Colorize;
use sqlferry_catalog::CatalogReader;
use sqlferry_config::AppPaths;
use sqlferry_core::EventSink;
use sqlferry_rollback::{RollbackLedger, RollbackService, DEFAULT_RETENTION_DAYS};

use super::{print_banner, print_events, ConnectionArgs, Session};

async fn open_service(paths: &AppPaths, events: EventSink) -> RollbackService {
    let ledger = RollbackLedger::load(paths.rollback_history_file()).await;
    RollbackService::new(CatalogReader::sql_server(), ledger, events)
}

#[derive(Args)]
pub struct HistoryCommand {}

impl HistoryCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let paths = AppPaths::resolve()?;
        let rt = tokio::runtime::Runtime::new()?;
        let records = rt.block_on(async {
            open_service(&paths, EventSink::disabled())
                .await
                .history()
                .await
        });

        if records.is_empty() {
            println!();
            println!("{}", "No recorded migrations.".bright_yellow());
            println!();
            return Ok(());
        }

        print_banner("Recorded migrations");
        for record in &records {
            let status = if record.can_rollback {
                record.status_text().bright_green()
            } else {
                record.status_text().dimmed()
            };
            println!("{} {}", record.display_name().bright_white().bold(), status);
            println!("  {} {}", "ID:".bright_white(), record.id.bright_cyan());
            println!(
                "  {} {} procedure(s), {} table(s)",
                "Backups:".bright_white(),
                record.backup_routines.len(),
                record.backup_tables.len()
            );
            println!();
        }
        println!(
            "{} {}",
            "Total records:".bright_white().bold(),
            records.len().to_string().bright_cyan()
        );
        Ok(())
    }
}

#[derive(Args)]
pub struct RollbackCommand {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Id of the recorded migration, as shown by `history`
    #[arg(long)]
    id: String,
}

impl RollbackCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let session = Session::open(&self.connection)?;
        let rt = tokio::runtime::Runtime::new()?;

        let result = rt.block_on(async {
            let (events, receiver) = EventSink::channel();
            let printer = tokio::spawn(print_events(receiver));
            let service = open_service(&session.paths, events).await;
            let result = service.rollback_by_id(&self.id, &session.server).await;
            drop(service);
            printer.await?;
            Ok::<_, anyhow::Error>(result?)
        })?;

        println!();
        if result.success {
            println!("{}", result.message.bright_green().bold());
        } else {
            println!("{}", result.message.bright_red().bold());
            for error in &result.errors {
                println!("  {} {}", "✗".bright_red(), error);
            }
        }
        if result.skipped_tables > 0 {
            println!(
                "{}",
                format!(
                    "{} table backup(s) were counted but not restored",
                    result.skipped_tables
                )
                .bright_yellow()
            );
        }
        println!();

        if result.success {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Rollback did not complete"))
        }
    }
}

#[derive(Args)]
pub struct CleanupCommand {
    /// Remove records older than this many days
    #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS)]
    days: i64,
}

impl CleanupCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let paths = AppPaths::resolve()?;
        let rt = tokio::runtime::Runtime::new()?;
        let removed = rt.block_on(async {
            open_service(&paths, EventSink::disabled())
                .await
                .cleanup_older_than(self.days)
                .await
        })?;

        println!(
            "{} {}",
            "Removed rollback records:".bright_white().bold(),
            removed.to_string().bright_cyan()
        );
        Ok(())
    }
}
