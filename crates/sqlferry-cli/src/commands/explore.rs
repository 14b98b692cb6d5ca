use clap::Args;
use colored::Colorize;
use sqlferry_catalog::CatalogReader;
use tracing::info;

use super::{print_banner, ConnectionArgs, Session};

#[derive(Args)]
pub struct TestConnectionCommand {
    #[command(flatten)]
    connection: ConnectionArgs,
}

impl TestConnectionCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let mut session = Session::open(&self.connection)?;
        let reader = CatalogReader::sql_server();

        let rt = tokio::runtime::Runtime::new()?;
        let ok = rt.block_on(reader.test_connection(&session.server));

        if ok {
            session.remember();
            println!(
                "{} {}",
                "Connection succeeded:".bright_green().bold(),
                session.server.server_label().bright_white()
            );
            Ok(())
        } else {
            println!(
                "{} {}",
                "Connection failed:".bright_red().bold(),
                session.server.redacted_connection_string()
            );
            Err(anyhow::anyhow!("Could not connect to {}", session.server.server()))
        }
    }
}

#[derive(Args)]
pub struct DatabasesCommand {
    #[command(flatten)]
    connection: ConnectionArgs,
}

impl DatabasesCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let mut session = Session::open(&self.connection)?;
        let reader = CatalogReader::sql_server();

        let rt = tokio::runtime::Runtime::new()?;
        let databases = rt.block_on(reader.list_databases(&session.server))?;
        session.remember();

        print_banner(&format!("Databases on {}", session.server.server_label()));
        for name in &databases {
            println!("  {}", name.bright_cyan());
        }
        println!();
        println!(
            "{} {}",
            "Total databases:".bright_white().bold(),
            databases.len().to_string().bright_cyan()
        );
        Ok(())
    }
}

#[derive(Args)]
pub struct ObjectsCommand {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Database to inspect
    #[arg(long)]
    database: String,

    /// Print the definition of every procedure
    #[arg(long)]
    definitions: bool,
}

impl ObjectsCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let mut session = Session::open(&self.connection)?;
        let descriptor = session.server.for_database(&self.database);
        let reader = CatalogReader::sql_server();

        let rt = tokio::runtime::Runtime::new()?;
        let (routines, tables) = rt.block_on(async {
            let routines = reader.list_routines(&descriptor).await?;
            let tables = reader.list_tables(&descriptor).await?;
            Ok::<_, anyhow::Error>((routines, tables))
        })?;
        session.remember();
        info!(
            "{} has {} procedures and {} tables",
            self.database,
            routines.len(),
            tables.len()
        );

        print_banner(&format!("Objects in {}", self.database));
        println!("{}", "Stored procedures".bright_white().bold());
        for routine in &routines {
            println!("  {}", routine.full_name().bright_cyan());
            if self.definitions {
                println!("{}", routine.definition.dimmed());
                println!();
            }
        }
        println!();
        println!("{}", "Tables".bright_white().bold());
        for table in &tables {
            println!(
                "  {} {}",
                table.full_name().bright_cyan(),
                format!("({} columns)", table.columns.len()).dimmed()
            );
        }
        println!();
        Ok(())
    }
}
