use async_trait::async_trait;
use sqlferry_core::{Column, ConnectionDescriptor, Routine};

use crate::error::CatalogResult;

/// Opens sessions against a server described by a [`ConnectionDescriptor`]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Short name of the backend, used in logs
    fn backend_name(&self) -> &'static str;

    /// Open a session on the descriptor's database (`master` when none is set)
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> CatalogResult<Box<dyn CatalogSession>>;
}

/// One open connection to one database
///
/// All calls run on the same underlying connection, so statements issued between
/// [`begin`](CatalogSession::begin) and [`commit`](CatalogSession::commit) share a
/// transaction, including catalog lookups.
#[async_trait]
pub trait CatalogSession: Send {
    /// User databases, system databases excluded, ordered by name
    async fn list_databases(&mut self) -> CatalogResult<Vec<String>>;

    async fn database_exists(&mut self, name: &str) -> CatalogResult<bool>;

    /// Stored procedures with their definitions, ordered by (schema, name)
    async fn list_routines(&mut self) -> CatalogResult<Vec<Routine>>;

    /// Base tables as (schema, name), ordered, system schemas excluded
    async fn list_table_names(&mut self) -> CatalogResult<Vec<(String, String)>>;

    async fn routine_exists(&mut self, schema: &str, name: &str) -> CatalogResult<bool>;

    async fn table_exists(&mut self, schema: &str, name: &str) -> CatalogResult<bool>;

    /// Whether a procedure or a table with this name exists in any schema
    async fn object_exists(&mut self, name: &str) -> CatalogResult<bool>;

    /// Current definition text of a procedure; `None` schema matches any schema
    async fn routine_definition(
        &mut self,
        schema: Option<&str>,
        name: &str,
    ) -> CatalogResult<Option<String>>;

    /// Columns ordered by ordinal position, flagged with primary key and identity
    async fn list_columns(&mut self, schema: &str, table: &str) -> CatalogResult<Vec<Column>>;

    /// Execute a literal batch and discard any results
    async fn execute(&mut self, sql: &str) -> CatalogResult<()>;

    async fn begin(&mut self) -> CatalogResult<()>;

    async fn commit(&mut self) -> CatalogResult<()>;

    async fn rollback(&mut self) -> CatalogResult<()>;
}
