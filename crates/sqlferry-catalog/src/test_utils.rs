//! In-memory catalog double for tests
//!
//! `MemoryServer` implements [`Connector`] over a shared in-memory state holding
//! routines and tables per database. It records every statement it receives,
//! snapshots state on `begin` so `rollback` (or dropping an uncommitted session)
//! restores it, and interprets the DDL forms sqlferry emits:
//! `CREATE|ALTER PROC[EDURE]`, `CREATE TABLE`, `DROP TABLE`,
//! `ALTER TABLE .. ADD`, `ALTER TABLE .. ALTER COLUMN` and `CREATE DATABASE`.
//! Statements it does not recognise are accepted and only logged.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlferry_core::{
    Column, ConnectionDescriptor, Routine, Table, DEFAULT_SCHEMA, MASTER_DATABASE,
    SYSTEM_DATABASES,
};

use crate::error::{CatalogError, CatalogResult};
use crate::traits::{CatalogSession, Connector};

const NAME: &str = r"((?:\[[^\]]+\]|[\w@#$]+)(?:\s*\.\s*(?:\[[^\]]+\]|[\w@#$]+))?)";

static NAME_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]|([\w@#$]+)").expect("valid regex"));
static PROCEDURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?is)\b(CREATE|ALTER)\s+(?:PROCEDURE|PROC)\s+{}", NAME))
        .expect("valid regex")
});
static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?is)^\s*CREATE\s+TABLE\s+{}\s*\((.*)\)\s*;?\s*$", NAME))
        .expect("valid regex")
});
static DROP_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*DROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?{}\s*;?\s*$",
        NAME
    ))
    .expect("valid regex")
});
static ADD_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?is)^\s*ALTER\s+TABLE\s+{}\s+ADD\s+(.+?)\s*;?\s*$", NAME))
        .expect("valid regex")
});
static ALTER_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is)^\s*ALTER\s+TABLE\s+{}\s+ALTER\s+COLUMN\s+(.+?)\s*;?\s*$",
        NAME
    ))
    .expect("valid regex")
});
static CREATE_DATABASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*CREATE\s+DATABASE\s+(\[[^\]]+\]|[\w@#$]+)").expect("valid regex")
});
static COLUMN_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(\[[^\]]+\]|\w+)\s+(\w+)\s*(?:\(\s*(MAX|\d+)\s*(?:,\s*(\d+)\s*)?\))?(.*)$")
        .expect("valid regex")
});
static PRIMARY_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*CONSTRAINT\s+\S+\s+PRIMARY\s+KEY(?:\s+\w+)?\s*\((.*)\)\s*$")
        .expect("valid regex")
});
static NOT_NULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b").expect("valid regex"));
static IDENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bIDENTITY\b").expect("valid regex"));
static DEFAULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bDEFAULT\s+(.+?)\s*$").expect("valid regex"));

/// One statement received by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedStatement {
    pub database: String,
    pub sql: String,
}

#[derive(Debug, Clone, Default)]
struct DatabaseState {
    routines: Vec<Routine>,
    tables: Vec<Table>,
}

impl DatabaseState {
    fn routine_mut(&mut self, schema: &str, name: &str) -> Option<&mut Routine> {
        self.routines.iter_mut().find(|r| {
            r.schema.eq_ignore_ascii_case(schema) && r.name.eq_ignore_ascii_case(name)
        })
    }

    fn table_mut(&mut self, schema: &str, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| {
            t.schema.eq_ignore_ascii_case(schema) && t.name.eq_ignore_ascii_case(name)
        })
    }
}

#[derive(Debug, Default)]
struct ServerState {
    databases: BTreeMap<String, DatabaseState>,
    executed: Vec<ExecutedStatement>,
    connections: usize,
    failure_fragments: Vec<String>,
    unreachable: bool,
    failing_lookups: bool,
    suppress_column_adds: bool,
}

impl ServerState {
    fn database_key(&self, name: &str) -> Option<String> {
        self.databases
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn database_mut(&mut self, name: &str) -> &mut DatabaseState {
        let key = self.database_key(name).unwrap_or_else(|| name.to_string());
        self.databases.entry(key).or_default()
    }

    fn database(&self, name: &str) -> Option<&DatabaseState> {
        self.database_key(name).and_then(|key| self.databases.get(&key))
    }
}

/// Shared in-memory server; clones observe the same state
#[derive(Debug, Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(self, name: &str) -> Self {
        self.lock().database_mut(name);
        self
    }

    /// A credentialed descriptor for this server, pointing at `database`
    pub fn descriptor(&self, database: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::credentialed("memory", "tester", "secret")
            .map(|d| d.for_database(database))
            .unwrap_or_else(|_| ConnectionDescriptor::integrated("memory").for_database(database))
    }

    pub fn add_routine(&self, database: &str, routine: Routine) {
        self.lock().database_mut(database).routines.push(routine);
    }

    pub fn add_table(&self, database: &str, table: Table) {
        self.lock().database_mut(database).tables.push(table);
    }

    pub fn routine(&self, database: &str, schema: &str, name: &str) -> Option<Routine> {
        self.lock().database(database).and_then(|db| {
            db.routines
                .iter()
                .find(|r| {
                    r.schema.eq_ignore_ascii_case(schema) && r.name.eq_ignore_ascii_case(name)
                })
                .cloned()
        })
    }

    pub fn routine_names(&self, database: &str) -> Vec<String> {
        self.lock()
            .database(database)
            .map(|db| db.routines.iter().map(|r| r.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn table(&self, database: &str, schema: &str, name: &str) -> Option<Table> {
        self.lock().database(database).and_then(|db| {
            db.tables
                .iter()
                .find(|t| {
                    t.schema.eq_ignore_ascii_case(schema) && t.name.eq_ignore_ascii_case(name)
                })
                .cloned()
        })
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.lock().database_key(name).is_some()
    }

    /// Every statement received so far, across all databases
    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.lock().executed.clone()
    }

    /// SQL text of the statements received by sessions on `database`
    pub fn executed_in(&self, database: &str) -> Vec<String> {
        self.lock()
            .executed
            .iter()
            .filter(|s| s.database.eq_ignore_ascii_case(database))
            .map(|s| s.sql.clone())
            .collect()
    }

    pub fn clear_executed(&self) {
        self.lock().executed.clear();
    }

    /// Number of sessions opened (or attempted) so far
    pub fn connection_count(&self) -> usize {
        self.lock().connections
    }

    /// Make every executed statement containing `fragment` (case-insensitive) fail
    pub fn fail_when_contains(&self, fragment: &str) {
        self.lock().failure_fragments.push(fragment.to_lowercase());
    }

    /// Refuse every connection attempt
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Make catalog lookups (existence checks, column and definition queries) fail
    pub fn set_failing_lookups(&self, failing: bool) {
        self.lock().failing_lookups = failing;
    }

    /// Accept `ALTER TABLE .. ADD` without adding the column
    pub fn suppress_column_adds(&self, suppress: bool) {
        self.lock().suppress_column_adds = suppress;
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Connector for MemoryServer {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> CatalogResult<Box<dyn CatalogSession>> {
        let database = descriptor.effective_database().to_string();
        {
            let mut state = self.lock();
            state.connections += 1;
            if state.unreachable {
                return Err(CatalogError::connection(format!(
                    "server {} is unreachable",
                    descriptor.server()
                )));
            }
            if !database.eq_ignore_ascii_case(MASTER_DATABASE)
                && state.database_key(&database).is_none()
            {
                return Err(CatalogError::connection(format!(
                    "Cannot open database \"{}\" requested by the login",
                    database
                )));
            }
        }

        Ok(Box::new(MemorySession {
            server: self.clone(),
            database,
            snapshot: None,
        }))
    }
}

struct MemorySession {
    server: MemoryServer,
    database: String,
    snapshot: Option<BTreeMap<String, DatabaseState>>,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.server.lock().databases = snapshot;
        }
    }
}

fn split_name(text: &str) -> (String, String) {
    let parts: Vec<String> = NAME_PART
        .captures_iter(text)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).map(|m| m.as_str().to_string()))
        .collect();
    match parts.as_slice() {
        [schema, name] => (schema.clone(), name.clone()),
        [name] => (DEFAULT_SCHEMA.to_string(), name.clone()),
        _ => (DEFAULT_SCHEMA.to_string(), text.to_string()),
    }
}

fn strip_brackets(text: &str) -> String {
    text.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string()
}

/// Split on commas that are not nested inside parentheses
fn split_top_level(body: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in body.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                items.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        items.push(current);
    }
    items
}

fn parse_column(text: &str) -> CatalogResult<Column> {
    let caps = COLUMN_DEF
        .captures(text)
        .ok_or_else(|| CatalogError::query(format!("Incorrect syntax near '{}'", text.trim())))?;

    let name = strip_brackets(&caps[1]);
    let data_type = caps[2].to_lowercase();
    let size = caps.get(3).map(|m| m.as_str().to_string());
    let second = caps.get(4).and_then(|m| m.as_str().parse::<i32>().ok());
    let rest = caps.get(5).map(|m| m.as_str()).unwrap_or_default();

    let mut column = Column::new(name, data_type.clone());
    match data_type.as_str() {
        "char" | "nchar" | "varchar" | "nvarchar" | "binary" | "varbinary" => {
            column.max_length = size.map(|s| {
                if s.eq_ignore_ascii_case("MAX") {
                    -1
                } else {
                    s.parse().unwrap_or(1)
                }
            });
        }
        "decimal" | "numeric" | "float" => {
            column.precision = size.and_then(|s| s.parse().ok());
            column.scale = second;
        }
        _ => {}
    }

    column.is_identity = IDENTITY.is_match(rest);
    column.is_nullable = !column.is_identity && !NOT_NULL.is_match(rest);
    column.default_value = DEFAULT
        .captures(rest)
        .map(|c| c[1].to_string())
        .filter(|d| !d.is_empty());
    Ok(column)
}

impl MemorySession {
    fn lookup(&self) -> CatalogResult<MutexGuard<'_, ServerState>> {
        let state = self.server.lock();
        if state.failing_lookups {
            return Err(CatalogError::query("catalog lookup failed"));
        }
        Ok(state)
    }

    fn apply(&self, state: &mut ServerState, sql: &str) -> CatalogResult<()> {
        let lowered = sql.to_lowercase();
        if state
            .failure_fragments
            .iter()
            .any(|fragment| lowered.contains(fragment))
        {
            return Err(CatalogError::query(format!(
                "statement rejected by test server: {}",
                sql.trim()
            )));
        }

        if let Some(caps) = CREATE_DATABASE.captures(sql) {
            let name = strip_brackets(&caps[1]);
            if state.database_key(&name).is_some() {
                return Err(CatalogError::query(format!(
                    "Database '{}' already exists",
                    name
                )));
            }
            state.database_mut(&name);
            return Ok(());
        }

        let suppress_adds = state.suppress_column_adds;
        let db = state.database_mut(&self.database);

        if let Some(caps) = CREATE_TABLE.captures(sql) {
            let (schema, name) = split_name(&caps[1]);
            if db.table_mut(&schema, &name).is_some() {
                return Err(CatalogError::query(format!(
                    "There is already an object named '{}' in the database",
                    name
                )));
            }
            let mut columns = Vec::new();
            let mut pk = Vec::new();
            for item in split_top_level(&caps[2]) {
                if let Some(key) = PRIMARY_KEY.captures(&item) {
                    pk.extend(key[1].split(',').map(strip_brackets));
                    continue;
                }
                let mut column = parse_column(&item)?;
                column.ordinal_position = columns.len() as i32 + 1;
                columns.push(column);
            }
            for column in columns.iter_mut() {
                column.is_primary_key = pk.iter().any(|k| k.eq_ignore_ascii_case(&column.name));
            }
            db.tables.push(
                Table::new(schema, name)
                    .with_definition(sql.to_string())
                    .with_columns(columns),
            );
            return Ok(());
        }

        if let Some(caps) = DROP_TABLE.captures(sql) {
            let (schema, name) = split_name(&caps[1]);
            let before = db.tables.len();
            db.tables.retain(|t| {
                !(t.schema.eq_ignore_ascii_case(&schema) && t.name.eq_ignore_ascii_case(&name))
            });
            if db.tables.len() == before {
                return Err(CatalogError::query(format!(
                    "Cannot drop the table '{}', because it does not exist",
                    name
                )));
            }
            return Ok(());
        }

        if let Some(caps) = ALTER_COLUMN.captures(sql) {
            let (schema, name) = split_name(&caps[1]);
            let parsed = parse_column(&caps[2])?;
            let table = db.table_mut(&schema, &name).ok_or_else(|| {
                CatalogError::query(format!("Cannot find the object \"{}\"", name))
            })?;
            let column = table
                .columns
                .iter_mut()
                .find(|c| c.same_name(&parsed))
                .ok_or_else(|| {
                    CatalogError::query(format!("Invalid column name '{}'", parsed.name))
                })?;
            column.data_type = parsed.data_type;
            column.max_length = parsed.max_length;
            column.precision = parsed.precision;
            column.scale = parsed.scale;
            column.is_nullable = parsed.is_nullable;
            return Ok(());
        }

        if let Some(caps) = ADD_COLUMN.captures(sql) {
            let (schema, name) = split_name(&caps[1]);
            let mut parsed = parse_column(&caps[2])?;
            let table = db.table_mut(&schema, &name).ok_or_else(|| {
                CatalogError::query(format!("Cannot find the object \"{}\"", name))
            })?;
            if table.columns.iter().any(|c| c.same_name(&parsed)) {
                return Err(CatalogError::query(format!(
                    "Column names in each table must be unique. Column name '{}' is specified more than once",
                    parsed.name
                )));
            }
            if !suppress_adds {
                parsed.ordinal_position = table.columns.len() as i32 + 1;
                table.columns.push(parsed);
            }
            return Ok(());
        }

        if let Some(caps) = PROCEDURE.captures(sql) {
            let (schema, name) = split_name(&caps[2]);
            let keyword = &caps[1];
            let exists = db.routine_mut(&schema, &name).is_some();

            // Stored module text always starts with CREATE, whatever was submitted
            let keyword_range = caps.get(1).map(|m| m.range()).unwrap_or(0..0);
            let mut stored = sql.to_string();
            stored.replace_range(keyword_range, "CREATE");

            if keyword.eq_ignore_ascii_case("CREATE") {
                if exists {
                    return Err(CatalogError::query(format!(
                        "There is already an object named '{}' in the database",
                        name
                    )));
                }
                db.routines.push(Routine::new(schema, name, stored));
            } else {
                match db.routine_mut(&schema, &name) {
                    Some(routine) => routine.definition = stored,
                    None => {
                        return Err(CatalogError::query(format!(
                            "Could not find stored procedure '{}'",
                            name
                        )))
                    }
                }
            }
            return Ok(());
        }

        Ok(())
    }
}

#[async_trait]
impl CatalogSession for MemorySession {
    async fn list_databases(&mut self) -> CatalogResult<Vec<String>> {
        let state = self.lookup()?;
        Ok(state
            .databases
            .keys()
            .filter(|name| {
                !SYSTEM_DATABASES
                    .iter()
                    .any(|system| system.eq_ignore_ascii_case(name))
            })
            .cloned()
            .collect())
    }

    async fn database_exists(&mut self, name: &str) -> CatalogResult<bool> {
        let state = self.lookup()?;
        Ok(name.eq_ignore_ascii_case(MASTER_DATABASE) || state.database_key(name).is_some())
    }

    async fn list_routines(&mut self) -> CatalogResult<Vec<Routine>> {
        let state = self.lookup()?;
        let mut routines = state
            .database(&self.database)
            .map(|db| db.routines.clone())
            .unwrap_or_default();
        routines.sort_by_key(|r| (r.schema.to_lowercase(), r.name.to_lowercase()));
        Ok(routines)
    }

    async fn list_table_names(&mut self) -> CatalogResult<Vec<(String, String)>> {
        let state = self.lookup()?;
        let mut names: Vec<(String, String)> = state
            .database(&self.database)
            .map(|db| {
                db.tables
                    .iter()
                    .map(|t| (t.schema.clone(), t.name.clone()))
                    .collect()
            })
            .unwrap_or_default();
        names.sort_by_key(|(schema, name)| (schema.to_lowercase(), name.to_lowercase()));
        Ok(names)
    }

    async fn routine_exists(&mut self, schema: &str, name: &str) -> CatalogResult<bool> {
        let state = self.lookup()?;
        Ok(state.database(&self.database).is_some_and(|db| {
            db.routines.iter().any(|r| {
                r.schema.eq_ignore_ascii_case(schema) && r.name.eq_ignore_ascii_case(name)
            })
        }))
    }

    async fn table_exists(&mut self, schema: &str, name: &str) -> CatalogResult<bool> {
        let state = self.lookup()?;
        Ok(state.database(&self.database).is_some_and(|db| {
            db.tables.iter().any(|t| {
                t.schema.eq_ignore_ascii_case(schema) && t.name.eq_ignore_ascii_case(name)
            })
        }))
    }

    async fn object_exists(&mut self, name: &str) -> CatalogResult<bool> {
        let state = self.lookup()?;
        Ok(state.database(&self.database).is_some_and(|db| {
            db.routines.iter().any(|r| r.name.eq_ignore_ascii_case(name))
                || db.tables.iter().any(|t| t.name.eq_ignore_ascii_case(name))
        }))
    }

    async fn routine_definition(
        &mut self,
        schema: Option<&str>,
        name: &str,
    ) -> CatalogResult<Option<String>> {
        let state = self.lookup()?;
        Ok(state.database(&self.database).and_then(|db| {
            db.routines
                .iter()
                .find(|r| {
                    r.name.eq_ignore_ascii_case(name)
                        && schema.map_or(true, |s| r.schema.eq_ignore_ascii_case(s))
                })
                .map(|r| r.definition.clone())
        }))
    }

    async fn list_columns(&mut self, schema: &str, table: &str) -> CatalogResult<Vec<Column>> {
        let state = self.lookup()?;
        let mut columns = state
            .database(&self.database)
            .and_then(|db| {
                db.tables.iter().find(|t| {
                    t.schema.eq_ignore_ascii_case(schema) && t.name.eq_ignore_ascii_case(table)
                })
            })
            .map(|t| t.columns.clone())
            .unwrap_or_default();
        columns.sort_by_key(|c| c.ordinal_position);
        Ok(columns)
    }

    async fn execute(&mut self, sql: &str) -> CatalogResult<()> {
        let mut state = self.server.lock();
        state.executed.push(ExecutedStatement {
            database: self.database.clone(),
            sql: sql.to_string(),
        });
        self.apply(&mut state, sql)
    }

    async fn begin(&mut self) -> CatalogResult<()> {
        let mut state = self.server.lock();
        state.executed.push(ExecutedStatement {
            database: self.database.clone(),
            sql: "BEGIN TRANSACTION".to_string(),
        });
        self.snapshot = Some(state.databases.clone());
        Ok(())
    }

    async fn commit(&mut self) -> CatalogResult<()> {
        let mut state = self.server.lock();
        state.executed.push(ExecutedStatement {
            database: self.database.clone(),
            sql: "COMMIT TRANSACTION".to_string(),
        });
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(&mut self) -> CatalogResult<()> {
        let mut state = self.server.lock();
        state.executed.push(ExecutedStatement {
            database: self.database.clone(),
            sql: "ROLLBACK TRANSACTION".to_string(),
        });
        if let Some(snapshot) = self.snapshot.take() {
            state.databases = snapshot;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_definitions() {
        let column = parse_column("[Name] nvarchar(50) NULL").unwrap();
        assert_eq!(column.name, "Name");
        assert_eq!(column.data_type, "nvarchar");
        assert_eq!(column.max_length, Some(50));
        assert!(column.is_nullable);

        let column = parse_column("[Total] decimal(18,2) NOT NULL DEFAULT ((0))").unwrap();
        assert_eq!(column.precision, Some(18));
        assert_eq!(column.scale, Some(2));
        assert!(!column.is_nullable);
        assert_eq!(column.default_value.as_deref(), Some("((0))"));

        let column = parse_column("[Notes] varchar(MAX) NULL").unwrap();
        assert_eq!(column.max_length, Some(-1));
    }

    #[tokio::test]
    async fn test_procedure_lifecycle_and_rollback() {
        let server = MemoryServer::new().with_database("Sales");
        let descriptor = server.descriptor("Sales");

        let mut session = server.connect(&descriptor).await.unwrap();
        session.begin().await.unwrap();
        session
            .execute("CREATE PROCEDURE [dbo].[GetOrders] AS SELECT 1")
            .await
            .unwrap();
        assert!(session.routine_exists("dbo", "GetOrders").await.unwrap());
        session.rollback().await.unwrap();
        assert!(!session.routine_exists("dbo", "GetOrders").await.unwrap());

        session
            .execute("CREATE PROC dbo.GetOrders AS SELECT 1")
            .await
            .unwrap();
        assert!(session
            .execute("CREATE PROCEDURE dbo.GetOrders AS SELECT 2")
            .await
            .is_err());
        session
            .execute("ALTER PROCEDURE [dbo].[GetOrders] AS SELECT 2")
            .await
            .unwrap();

        let definition = server.routine("Sales", "dbo", "GetOrders").unwrap().definition;
        assert_eq!(definition, "CREATE PROCEDURE [dbo].[GetOrders] AS SELECT 2");
    }

    #[tokio::test]
    async fn test_table_ddl_interpretation() {
        let server = MemoryServer::new().with_database("Sales");
        let mut session = server.connect(&server.descriptor("Sales")).await.unwrap();

        session
            .execute(
                "CREATE TABLE [dbo].[Customer] (\n    [Id] int IDENTITY(1,1) NOT NULL,\n    \
                 CONSTRAINT [PK_Customer] PRIMARY KEY CLUSTERED ([Id])\n);",
            )
            .await
            .unwrap();
        session
            .execute("ALTER TABLE [dbo].[Customer] ADD [Name] nvarchar(50) NULL")
            .await
            .unwrap();
        session
            .execute("ALTER TABLE [dbo].[Customer] ALTER COLUMN [Name] nvarchar(100) NOT NULL")
            .await
            .unwrap();

        let columns = session.list_columns("dbo", "Customer").await.unwrap();
        assert_eq!(columns.len(), 2);
        assert!(columns[0].is_primary_key);
        assert!(columns[0].is_identity);
        assert_eq!(columns[1].max_length, Some(100));
        assert!(!columns[1].is_nullable);

        session.execute("DROP TABLE [dbo].[Customer]").await.unwrap();
        assert!(!session.table_exists("dbo", "Customer").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_database_is_a_connection_error() {
        let server = MemoryServer::new();
        let result = server.connect(&server.descriptor("Missing")).await;
        assert!(matches!(result, Err(CatalogError::Connection(_))));
        assert_eq!(server.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_dropping_uncommitted_session_restores_state() {
        let server = MemoryServer::new().with_database("Sales");
        {
            let mut session = server.connect(&server.descriptor("Sales")).await.unwrap();
            session.begin().await.unwrap();
            session
                .execute("CREATE PROCEDURE dbo.Temp AS SELECT 1")
                .await
                .unwrap();
        }
        assert!(server.routine("Sales", "dbo", "Temp").is_none());
    }
}
