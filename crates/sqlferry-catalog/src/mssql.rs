//! SQL Server backend built on tiberius

use async_trait::async_trait;
use sqlferry_core::{AuthMode, Column, ConnectionDescriptor, Routine};
use tiberius::{AuthMethod, Client, Config, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::sql;
use crate::traits::{CatalogSession, Connector};

const DEFAULT_PORT: u16 = 1433;

/// Connects to SQL Server over TDS
#[derive(Debug, Clone)]
pub struct MssqlConnector {
    default_port: u16,
}

impl Default for MssqlConnector {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT,
        }
    }
}

impl MssqlConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Port used when the server name does not carry one (`host,port`)
    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    fn build_config(&self, descriptor: &ConnectionDescriptor) -> CatalogResult<Config> {
        let (host, port) = split_server(descriptor.server(), self.default_port)?;

        let mut config = Config::new();
        config.host(host);
        config.port(port);
        config.database(descriptor.effective_database());
        config.application_name("sqlferry");
        config.trust_cert();

        match descriptor.auth() {
            AuthMode::Credentialed => {
                config.authentication(AuthMethod::sql_server(
                    descriptor.username(),
                    descriptor.password(),
                ));
            }
            AuthMode::Integrated => {
                #[cfg(windows)]
                config.authentication(AuthMethod::Integrated);

                #[cfg(not(windows))]
                return Err(CatalogError::connection(
                    "integrated authentication is only available on Windows",
                ));
            }
        }

        Ok(config)
    }
}

/// `host` or `host,port`
fn split_server(server: &str, default_port: u16) -> CatalogResult<(&str, u16)> {
    match server.split_once(',') {
        Some((host, port)) => {
            let port = port.trim().parse::<u16>().map_err(|_| {
                CatalogError::connection(format!("invalid port in server name '{}'", server))
            })?;
            Ok((host.trim(), port))
        }
        None => Ok((server.trim(), default_port)),
    }
}

#[async_trait]
impl Connector for MssqlConnector {
    fn backend_name(&self) -> &'static str {
        "mssql"
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> CatalogResult<Box<dyn CatalogSession>> {
        let config = self.build_config(descriptor)?;

        debug!(
            "Connecting to SQL Server {} (database {})",
            descriptor.server(),
            descriptor.effective_database()
        );

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| CatalogError::connection(format!("{}: {}", descriptor.server(), e)))?;
        tcp.set_nodelay(true)
            .map_err(|e| CatalogError::connection(e.to_string()))?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| CatalogError::connection(format!("{}: {}", descriptor.server(), e)))?;

        Ok(Box::new(MssqlSession { client }))
    }
}

/// Open TDS connection
pub struct MssqlSession {
    client: Client<Compat<TcpStream>>,
}

fn query_error(err: tiberius::error::Error) -> CatalogError {
    CatalogError::Query(err.to_string())
}

fn decode_error(err: tiberius::error::Error) -> CatalogError {
    CatalogError::Decode(err.to_string())
}

fn text(row: &Row, idx: usize) -> CatalogResult<String> {
    row.try_get::<&str, _>(idx)
        .map_err(decode_error)?
        .map(str::to_string)
        .ok_or_else(|| CatalogError::Decode(format!("column {} is NULL", idx)))
}

fn optional_text(row: &Row, idx: usize) -> CatalogResult<Option<String>> {
    Ok(row
        .try_get::<&str, _>(idx)
        .map_err(decode_error)?
        .map(str::to_string))
}

fn optional_int(row: &Row, idx: usize) -> CatalogResult<Option<i32>> {
    row.try_get::<i32, _>(idx).map_err(decode_error)
}

fn int(row: &Row, idx: usize) -> CatalogResult<i32> {
    optional_int(row, idx)?.ok_or_else(|| CatalogError::Decode(format!("column {} is NULL", idx)))
}

fn column_from_row(row: &Row) -> CatalogResult<Column> {
    let precision = optional_int(row, 3)?
        .map(|p| {
            u8::try_from(p).map_err(|_| CatalogError::Decode(format!("precision {} out of range", p)))
        })
        .transpose()?;

    Ok(Column {
        name: text(row, 0)?,
        data_type: text(row, 1)?,
        max_length: optional_int(row, 2)?,
        precision,
        scale: optional_int(row, 4)?,
        is_nullable: text(row, 5)?.eq_ignore_ascii_case("YES"),
        default_value: optional_text(row, 6)?,
        ordinal_position: int(row, 7)?,
        is_primary_key: int(row, 8)? == 1,
        is_identity: int(row, 9)? == 1,
    })
}

impl MssqlSession {
    async fn rows(
        &mut self,
        query: &'static str,
        params: &[&dyn tiberius::ToSql],
    ) -> CatalogResult<Vec<Row>> {
        self.client
            .query(query, params)
            .await
            .map_err(query_error)?
            .into_first_result()
            .await
            .map_err(query_error)
    }

    async fn count(
        &mut self,
        query: &'static str,
        params: &[&dyn tiberius::ToSql],
    ) -> CatalogResult<i32> {
        let rows = self.rows(query, params).await?;
        match rows.first() {
            Some(row) => int(row, 0),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl CatalogSession for MssqlSession {
    async fn list_databases(&mut self) -> CatalogResult<Vec<String>> {
        let rows = self.rows(sql::LIST_DATABASES, &[]).await?;
        rows.iter().map(|row| text(row, 0)).collect()
    }

    async fn database_exists(&mut self, name: &str) -> CatalogResult<bool> {
        Ok(self.count(sql::DATABASE_EXISTS, &[&name]).await? > 0)
    }

    async fn list_routines(&mut self) -> CatalogResult<Vec<Routine>> {
        let rows = self.rows(sql::LIST_ROUTINES, &[]).await?;
        rows.iter()
            .map(|row| {
                Ok(Routine {
                    schema: text(row, 0)?,
                    name: text(row, 1)?,
                    definition: optional_text(row, 2)?.unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn list_table_names(&mut self) -> CatalogResult<Vec<(String, String)>> {
        let rows = self.rows(sql::LIST_TABLES, &[]).await?;
        rows.iter()
            .map(|row| Ok((text(row, 0)?, text(row, 1)?)))
            .collect()
    }

    async fn routine_exists(&mut self, schema: &str, name: &str) -> CatalogResult<bool> {
        Ok(self.count(sql::ROUTINE_EXISTS, &[&schema, &name]).await? > 0)
    }

    async fn table_exists(&mut self, schema: &str, name: &str) -> CatalogResult<bool> {
        Ok(self.count(sql::TABLE_EXISTS, &[&schema, &name]).await? > 0)
    }

    async fn object_exists(&mut self, name: &str) -> CatalogResult<bool> {
        Ok(self.count(sql::OBJECT_EXISTS, &[&name]).await? > 0)
    }

    async fn routine_definition(
        &mut self,
        schema: Option<&str>,
        name: &str,
    ) -> CatalogResult<Option<String>> {
        let rows = match schema {
            Some(schema) => self.rows(sql::ROUTINE_DEFINITION, &[&schema, &name]).await?,
            None => self.rows(sql::ROUTINE_DEFINITION_ANY_SCHEMA, &[&name]).await?,
        };
        match rows.first() {
            Some(row) => optional_text(row, 0),
            None => Ok(None),
        }
    }

    async fn list_columns(&mut self, schema: &str, table: &str) -> CatalogResult<Vec<Column>> {
        let rows = self.rows(sql::LIST_COLUMNS, &[&schema, &table]).await?;
        rows.iter().map(column_from_row).collect()
    }

    async fn execute(&mut self, sql: &str) -> CatalogResult<()> {
        self.client
            .simple_query(sql)
            .await
            .map_err(query_error)?
            .into_results()
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn begin(&mut self) -> CatalogResult<()> {
        self.execute(sql::BEGIN_TRANSACTION).await
    }

    async fn commit(&mut self) -> CatalogResult<()> {
        self.execute(sql::COMMIT_TRANSACTION).await
    }

    async fn rollback(&mut self) -> CatalogResult<()> {
        self.execute(sql::ROLLBACK_TRANSACTION).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_server() {
        assert_eq!(split_server("db01", 1433).unwrap(), ("db01", 1433));
        assert_eq!(split_server("db01,14330", 1433).unwrap(), ("db01", 14330));
        assert!(split_server("db01,abc", 1433).is_err());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_integrated_auth_rejected_off_windows() {
        let connector = MssqlConnector::new();
        let result = connector.build_config(&ConnectionDescriptor::integrated("db01"));
        assert!(matches!(result, Err(CatalogError::Connection(_))));
    }

    #[test]
    fn test_credentialed_config_targets_descriptor_database() {
        let descriptor = ConnectionDescriptor::credentialed("db01,1500", "sa", "pw")
            .unwrap()
            .for_database("Sales");
        let config = MssqlConnector::new().build_config(&descriptor).unwrap();
        assert_eq!(config.get_addr(), "db01:1500");
    }
}
