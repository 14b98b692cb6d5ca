//! Read-only catalog access by connection descriptor
//!
//! Every call opens its own session. Existence checks here are best-effort and degrade
//! to `false`; callers that must not guess open a session with [`CatalogReader::open`]
//! and use the fallible [`CatalogSession`] methods inside their transaction.

use std::sync::Arc;

use sqlferry_core::{
    quote_ident, Column, ConnectionDescriptor, MigrationResult, Routine, Table, SYSTEM_DATABASES,
};
use tracing::{debug, warn};

use crate::ddl::create_table_script;
use crate::mssql::MssqlConnector;
use crate::traits::{CatalogSession, Connector};

#[derive(Clone)]
pub struct CatalogReader {
    connector: Arc<dyn Connector>,
}

impl CatalogReader {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Reader backed by the SQL Server driver
    pub fn sql_server() -> Self {
        Self::new(Arc::new(MssqlConnector::new()))
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        self.connector.clone()
    }

    /// Open a session on the descriptor's database
    pub async fn open(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> MigrationResult<Box<dyn CatalogSession>> {
        Ok(self.connector.connect(descriptor).await?)
    }

    /// `true` when a connection can be opened and answers a catalog query
    pub async fn test_connection(&self, descriptor: &ConnectionDescriptor) -> bool {
        let result = async {
            let mut session = self.connector.connect(descriptor).await?;
            session.database_exists(descriptor.effective_database()).await
        }
        .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                debug!("Connection test to {} failed: {}", descriptor.server(), e);
                false
            }
        }
    }

    pub async fn list_databases(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> MigrationResult<Vec<String>> {
        let mut session = self.open(&descriptor.for_server()).await?;
        let mut names = session.list_databases().await?;
        names.retain(|name| {
            !SYSTEM_DATABASES
                .iter()
                .any(|system| system.eq_ignore_ascii_case(name))
        });
        Ok(names)
    }

    pub async fn list_routines(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> MigrationResult<Vec<Routine>> {
        let mut session = self.open(descriptor).await?;
        Ok(session.list_routines().await?)
    }

    /// Tables with their columns and a synthesized `CREATE TABLE` definition
    pub async fn list_tables(&self, descriptor: &ConnectionDescriptor) -> MigrationResult<Vec<Table>> {
        let mut session = self.open(descriptor).await?;
        let names = session.list_table_names().await?;

        let mut tables = Vec::with_capacity(names.len());
        for (schema, name) in names {
            let columns = session.list_columns(&schema, &name).await?;
            let definition = create_table_script(&schema, &name, &columns);
            tables.push(
                Table::new(schema, name)
                    .with_definition(definition)
                    .with_columns(columns),
            );
        }
        Ok(tables)
    }

    pub async fn list_columns(
        &self,
        descriptor: &ConnectionDescriptor,
        schema: &str,
        table: &str,
    ) -> MigrationResult<Vec<Column>> {
        let mut session = self.open(descriptor).await?;
        Ok(session.list_columns(schema, table).await?)
    }

    pub async fn table_script(
        &self,
        descriptor: &ConnectionDescriptor,
        schema: &str,
        table: &str,
    ) -> MigrationResult<String> {
        let columns = self.list_columns(descriptor, schema, table).await?;
        Ok(create_table_script(schema, table, &columns))
    }

    pub async fn routine_definition(
        &self,
        descriptor: &ConnectionDescriptor,
        schema: Option<&str>,
        name: &str,
    ) -> MigrationResult<Option<String>> {
        let mut session = self.open(descriptor).await?;
        Ok(session.routine_definition(schema, name).await?)
    }

    pub async fn routine_exists(
        &self,
        descriptor: &ConnectionDescriptor,
        schema: &str,
        name: &str,
    ) -> bool {
        let result = async {
            let mut session = self.connector.connect(descriptor).await?;
            session.routine_exists(schema, name).await
        }
        .await;
        self.best_effort("routine", name, descriptor, result)
    }

    pub async fn table_exists(
        &self,
        descriptor: &ConnectionDescriptor,
        schema: &str,
        name: &str,
    ) -> bool {
        let result = async {
            let mut session = self.connector.connect(descriptor).await?;
            session.table_exists(schema, name).await
        }
        .await;
        self.best_effort("table", name, descriptor, result)
    }

    /// Whether a routine or table with this name exists in the descriptor's database
    pub async fn object_exists(&self, descriptor: &ConnectionDescriptor, name: &str) -> bool {
        let result = async {
            let mut session = self.connector.connect(descriptor).await?;
            session.object_exists(name).await
        }
        .await;
        self.best_effort("object", name, descriptor, result)
    }

    pub async fn database_exists(&self, descriptor: &ConnectionDescriptor, name: &str) -> bool {
        let server = descriptor.for_server();
        let result = async {
            let mut session = self.connector.connect(&server).await?;
            session.database_exists(name).await
        }
        .await;
        self.best_effort("database", name, descriptor, result)
    }

    pub async fn create_database(
        &self,
        descriptor: &ConnectionDescriptor,
        name: &str,
    ) -> MigrationResult<()> {
        let mut session = self.open(&descriptor.for_server()).await?;
        session
            .execute(&format!("CREATE DATABASE {}", quote_ident(name)))
            .await?;
        debug!("Created database {} on {}", name, descriptor.server());
        Ok(())
    }

    fn best_effort(
        &self,
        what: &str,
        name: &str,
        descriptor: &ConnectionDescriptor,
        result: crate::error::CatalogResult<bool>,
    ) -> bool {
        match result {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    "Could not check {} {} in {}: {}; assuming it does not exist",
                    what,
                    name,
                    descriptor.effective_database(),
                    e
                );
                false
            }
        }
    }
}
