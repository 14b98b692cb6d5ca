use std::sync::Arc;

use clap::Args;
use colored::Colorize;
use sqlferry_catalog::CatalogReader;
use sqlferry_core::{ConnectionDescriptor, EventSink, Routine, Table};
use sqlferry_deploy::{
    DeploymentEngine, MigrationOptions, MigrationOrchestrator, MigrationRequest,
};
use sqlferry_rollback::{RollbackLedger, RollbackService};

use super::{print_banner, print_events, split_object_name, ConnectionArgs, Session};

#[derive(Args)]
pub struct MigrateCommand {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Database to read objects from
    #[arg(long)]
    source: String,

    /// Database to deploy into; repeat for several targets
    #[arg(long = "target", required = true)]
    targets: Vec<String>,

    /// Procedure to migrate as `schema.name`; repeatable
    #[arg(long = "routine")]
    routines: Vec<String>,

    /// Table to migrate as `schema.name`; repeatable
    #[arg(long = "table")]
    tables: Vec<String>,

    /// Migrate every procedure in the source database
    #[arg(long)]
    all_routines: bool,

    /// Migrate every table in the source database
    #[arg(long)]
    all_tables: bool,

    /// Back up existing procedures before altering them
    #[arg(long)]
    backup: bool,

    /// Drop and recreate tables that already exist instead of reconciling columns
    #[arg(long)]
    replace_tables: bool,

    /// Record the run so it can be rolled back
    #[arg(long)]
    record: bool,
}

fn select<T>(
    available: Vec<T>,
    all: bool,
    wanted: &[String],
    kind: &str,
    key: impl Fn(&T) -> (&str, &str),
) -> anyhow::Result<Vec<T>> {
    if all {
        return Ok(available);
    }
    let mut available = available;
    let mut selected = Vec::with_capacity(wanted.len());
    for text in wanted {
        let (schema, name) = split_object_name(text);
        let index = available
            .iter()
            .position(|item| {
                let (s, n) = key(item);
                s.eq_ignore_ascii_case(&schema) && n.eq_ignore_ascii_case(&name)
            })
            .ok_or_else(|| anyhow::anyhow!("{} {}.{} not found in source", kind, schema, name))?;
        selected.push(available.swap_remove(index));
    }
    Ok(selected)
}

impl MigrateCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        if !self.all_routines && !self.all_tables && self.routines.is_empty() && self.tables.is_empty()
        {
            return Err(anyhow::anyhow!(
                "Nothing to migrate: pass --routine, --table, --all-routines or --all-tables"
            ));
        }

        let mut session = Session::open(&self.connection)?;
        let reader = CatalogReader::sql_server();
        let source = session.server.for_database(&self.source);
        let options = MigrationOptions {
            create_backup: self.backup,
            replace_tables: self.replace_tables,
            record_rollback: self.record,
        };

        print_banner(&format!(
            "Migrating {} -> {}",
            self.source,
            self.targets.join(", ")
        ));

        let rt = tokio::runtime::Runtime::new()?;
        let summary = rt.block_on(async {
            let routines: Vec<Routine> = if self.all_routines || !self.routines.is_empty() {
                select(
                    reader.list_routines(&source).await?,
                    self.all_routines,
                    &self.routines,
                    "Procedure",
                    |r: &Routine| (r.schema.as_str(), r.name.as_str()),
                )?
            } else {
                Vec::new()
            };
            let tables: Vec<Table> = if self.all_tables || !self.tables.is_empty() {
                select(
                    reader.list_tables(&source).await?,
                    self.all_tables,
                    &self.tables,
                    "Table",
                    |t: &Table| (t.schema.as_str(), t.name.as_str()),
                )?
            } else {
                Vec::new()
            };

            let (events, receiver) = EventSink::channel();
            let printer = tokio::spawn(print_events(receiver));

            let ledger = RollbackLedger::load(session.paths.rollback_history_file()).await;
            let rollback = Arc::new(RollbackService::new(reader.clone(), ledger, events.clone()));
            let orchestrator = MigrationOrchestrator::new(DeploymentEngine::new(reader), events)
                .with_rollback(rollback);

            let request = MigrationRequest {
                source: source.clone(),
                target: session.server.clone(),
                target_databases: self.targets.clone(),
                routines,
                tables,
                options,
            };
            let summary = orchestrator.run(&request).await;

            drop(orchestrator);
            printer.await?;
            Ok::<_, anyhow::Error>(summary)
        })?;
        session.remember();

        println!();
        println!(
            "{} {} succeeded, {} failed ({:.1}%)",
            "Result:".bright_white().bold(),
            summary.succeeded.to_string().bright_green(),
            summary.failed.to_string().bright_red(),
            summary.success_rate()
        );
        for failure in summary.failures() {
            println!(
                "  {} {} in {}: {}",
                "✗".bright_red(),
                failure.object,
                failure.target_database,
                failure.error.as_deref().unwrap_or_default()
            );
        }
        if let Some(id) = &summary.rollback_id {
            println!("{} {}", "Rollback id:".bright_white(), id.bright_cyan());
        }
        println!();

        if summary.is_success() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("{} object(s) failed to migrate", summary.failed))
        }
    }
}

#[derive(Args)]
pub struct PreviewTableCommand {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Database holding the reference table
    #[arg(long)]
    source: String,

    /// Database holding the table to reconcile
    #[arg(long)]
    target: String,

    /// Table as `schema.name`
    #[arg(long)]
    table: String,
}

impl PreviewTableCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let session = Session::open(&self.connection)?;
        let (schema, table) = split_object_name(&self.table);
        let source: ConnectionDescriptor = session.server.for_database(&self.source);
        let target = session.server.for_database(&self.target);
        let engine = DeploymentEngine::new(CatalogReader::sql_server());

        let rt = tokio::runtime::Runtime::new()?;
        let script =
            rt.block_on(engine.preview_table_changes(&source, &target, &schema, &table))?;

        println!("{}", script);
        Ok(())
    }
}
