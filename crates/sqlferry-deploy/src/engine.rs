//! Create-or-alter deployment of routines and tables
//!
//! Each object is deployed on its own session inside one transaction: the existence
//! check, the optional backup and the DDL all run on that transaction, and any failure
//! rolls the whole object back. Existence checks here propagate catalog errors instead
//! of degrading to "absent", because a wrong guess would overwrite or duplicate objects.

use std::fmt;

use serde::Serialize;
use sqlferry_catalog::{CatalogReader, CatalogSession};
use sqlferry_core::{
    BackupInfo, ConnectionDescriptor, LocalDateTime, MigrationError, MigrationResult, Routine,
    Table,
};
use tracing::{debug, info, warn};

use crate::backup::backup_routine;
use crate::differ::{add_column_statement, alter_column_statement, diff, render_alter_script, ColumnDiff};
use crate::script::prepare_routine_script;

/// Lifecycle of one object during deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectState {
    Unchecked,
    NotFound,
    Found,
    BackedUp,
    Created,
    Altered,
    Failed,
}

impl ObjectState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ObjectState::Created | ObjectState::Altered | ObjectState::Failed
        )
    }
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ObjectState::Unchecked => "unchecked",
            ObjectState::NotFound => "not found",
            ObjectState::Found => "found",
            ObjectState::BackedUp => "backed up",
            ObjectState::Created => "created",
            ObjectState::Altered => "altered",
            ObjectState::Failed => "failed",
        };
        write!(f, "{}", text)
    }
}

/// Successful routine deployment
#[derive(Debug, Clone)]
pub struct RoutineDeployment {
    pub state: ObjectState,
    pub backup: Option<BackupInfo>,
    /// Script that was executed
    pub script: String,
}

/// Successful table deployment
#[derive(Debug, Clone)]
pub struct TableDeployment {
    pub state: ObjectState,
    /// Column changes applied when the table was reconciled in place
    pub changes: Option<ColumnDiff>,
    /// Statements executed, in order
    pub statements: Vec<String>,
}

#[derive(Clone)]
pub struct DeploymentEngine {
    reader: CatalogReader,
    clock: fn() -> LocalDateTime,
}

fn trace_state(object: &str, database: &str, from: ObjectState, to: ObjectState) -> ObjectState {
    debug!("{} in {}: {} -> {}", object, database, from, to);
    to
}

impl DeploymentEngine {
    pub fn new(reader: CatalogReader) -> Self {
        Self {
            reader,
            clock: sqlferry_core::now,
        }
    }

    /// Replace the time source used for backup names
    pub fn with_clock(mut self, clock: fn() -> LocalDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn reader(&self) -> &CatalogReader {
        &self.reader
    }

    /// Create or alter a routine in the target database
    pub async fn deploy_routine(
        &self,
        target: &ConnectionDescriptor,
        routine: &Routine,
        create_backup: bool,
    ) -> MigrationResult<RoutineDeployment> {
        let full_name = routine.full_name();
        if routine.definition.trim().is_empty() {
            return Err(MigrationError::MissingDefinition(full_name));
        }

        let mut session = self.reader.open(target).await?;
        session
            .begin()
            .await
            .map_err(|e| MigrationError::deployment(&full_name, e))?;

        let result = self
            .apply_routine(session.as_mut(), target.database(), routine, create_backup)
            .await;
        finish(session.as_mut(), &full_name, target.database(), result).await
    }

    async fn apply_routine(
        &self,
        session: &mut dyn CatalogSession,
        database: &str,
        routine: &Routine,
        create_backup: bool,
    ) -> MigrationResult<RoutineDeployment> {
        let full_name = routine.full_name();
        let mut state = ObjectState::Unchecked;

        let exists = session.routine_exists(&routine.schema, &routine.name).await?;
        let checked = if exists {
            ObjectState::Found
        } else {
            ObjectState::NotFound
        };
        state = trace_state(&full_name, database, state, checked);

        let mut backup = None;
        if exists && create_backup {
            backup = backup_routine(session, database, routine, (self.clock)()).await?;
            if backup.is_some() {
                state = trace_state(&full_name, database, state, ObjectState::BackedUp);
            }
        }

        let script = prepare_routine_script(
            &routine.definition,
            &routine.schema,
            &routine.name,
            exists,
        )?;
        session
            .execute(&script)
            .await
            .map_err(|e| MigrationError::deployment(&full_name, e))?;

        let done = if exists {
            ObjectState::Altered
        } else {
            ObjectState::Created
        };
        state = trace_state(&full_name, database, state, done);

        Ok(RoutineDeployment {
            state,
            backup,
            script,
        })
    }

    /// Create, replace or reconcile a table in the target database
    ///
    /// An existing table is dropped and recreated only when `replace_if_exists` is set;
    /// otherwise missing columns are added and differing columns altered. Columns that
    /// only exist in the target are never dropped.
    pub async fn deploy_table(
        &self,
        source: &ConnectionDescriptor,
        target: &ConnectionDescriptor,
        table: &Table,
        replace_if_exists: bool,
    ) -> MigrationResult<TableDeployment> {
        let full_name = table.full_name();

        let mut session = self.reader.open(target).await?;
        session
            .begin()
            .await
            .map_err(|e| MigrationError::deployment(&full_name, e))?;

        let result = self
            .apply_table(session.as_mut(), source, target.database(), table, replace_if_exists)
            .await;
        finish(session.as_mut(), &full_name, target.database(), result).await
    }

    async fn apply_table(
        &self,
        session: &mut dyn CatalogSession,
        source: &ConnectionDescriptor,
        database: &str,
        table: &Table,
        replace_if_exists: bool,
    ) -> MigrationResult<TableDeployment> {
        let full_name = table.full_name();
        let mut state = ObjectState::Unchecked;
        let mut statements = Vec::new();

        let exists = session.table_exists(&table.schema, &table.name).await?;
        let checked = if exists {
            ObjectState::Found
        } else {
            ObjectState::NotFound
        };
        state = trace_state(&full_name, database, state, checked);

        if !exists || replace_if_exists {
            if table.definition.trim().is_empty() {
                return Err(MigrationError::MissingDefinition(full_name));
            }
            if exists {
                statements.push(format!("DROP TABLE {}", table.quoted_name()));
            }
            statements.push(table.definition.clone());
            execute_all(session, &full_name, &statements).await?;

            let done = if exists {
                ObjectState::Altered
            } else {
                ObjectState::Created
            };
            return Ok(TableDeployment {
                state: trace_state(&full_name, database, state, done),
                changes: None,
                statements,
            });
        }

        let source_columns = self
            .reader
            .list_columns(source, &table.schema, &table.name)
            .await?;
        let target_columns = session.list_columns(&table.schema, &table.name).await?;
        let changes = diff(&source_columns, &target_columns);

        for column in &changes.to_drop {
            info!(
                "Column {} exists only in {}.{}; it is left in place",
                column.name, database, full_name
            );
        }

        let additions: Vec<String> = changes
            .to_add
            .iter()
            .map(|c| add_column_statement(&table.schema, &table.name, c))
            .collect();
        execute_all(session, &full_name, &additions).await?;
        statements.extend(additions);

        if !changes.to_add.is_empty() {
            let present = session.list_columns(&table.schema, &table.name).await?;
            for added in &changes.to_add {
                if !present.iter().any(|c| c.same_name(added)) {
                    return Err(MigrationError::InvariantViolation(format!(
                        "Column {} was not found in table {} after ADD operation",
                        added.name, full_name
                    )));
                }
            }
        }

        let modifications: Vec<String> = changes
            .to_modify
            .iter()
            .map(|c| alter_column_statement(&table.schema, &table.name, c))
            .collect();
        execute_all(session, &full_name, &modifications).await?;
        statements.extend(modifications);

        if statements.is_empty() {
            info!("{} in {} already matches the source", full_name, database);
        }

        Ok(TableDeployment {
            state: trace_state(&full_name, database, state, ObjectState::Altered),
            changes: Some(changes),
            statements,
        })
    }

    /// Render the ALTER script that reconciling `schema.table` would run, without running it
    pub async fn preview_table_changes(
        &self,
        source: &ConnectionDescriptor,
        target: &ConnectionDescriptor,
        schema: &str,
        table: &str,
    ) -> MigrationResult<String> {
        let source_columns = self.reader.list_columns(source, schema, table).await?;
        let target_columns = self.reader.list_columns(target, schema, table).await?;
        Ok(render_alter_script(
            schema,
            table,
            &diff(&source_columns, &target_columns),
        ))
    }
}

async fn execute_all(
    session: &mut dyn CatalogSession,
    object_name: &str,
    statements: &[String],
) -> MigrationResult<()> {
    for statement in statements {
        debug!("Executing: {}", statement);
        session
            .execute(statement)
            .await
            .map_err(|e| MigrationError::deployment(object_name, e))?;
    }
    Ok(())
}

/// Commit on success, roll back on failure
async fn finish<T>(
    session: &mut dyn CatalogSession,
    object_name: &str,
    database: &str,
    result: MigrationResult<T>,
) -> MigrationResult<T> {
    match result {
        Ok(value) => {
            session
                .commit()
                .await
                .map_err(|e| MigrationError::deployment(object_name, e))?;
            Ok(value)
        }
        Err(err) => {
            warn!(
                "Deployment of {} to {} failed, rolling back: {}",
                object_name, database, err
            );
            if let Err(rollback_err) = session.rollback().await {
                warn!(
                    "Rollback of {} in {} failed: {}",
                    object_name, database, rollback_err
                );
            }
            Err(err)
        }
    }
}
