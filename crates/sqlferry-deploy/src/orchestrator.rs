//! Runs a migration across every selected target database

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use sqlferry_core::{
    percent, BackupInfo, ConnectionDescriptor, EventSink, MigrationError, ObjectKind, Routine,
    Table,
};
use sqlferry_rollback::{MigrationScope, RollbackService};
use tracing::{error, info, warn};

use crate::engine::{DeploymentEngine, ObjectState};

/// Flags captured in the rollback record's settings snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationOptions {
    pub create_backup: bool,
    pub replace_tables: bool,
    pub record_rollback: bool,
}

#[derive(Debug, Clone)]
pub struct MigrationRequest {
    /// Points at the source database
    pub source: ConnectionDescriptor,
    /// Template for the targets; only the database name is replaced per target
    pub target: ConnectionDescriptor,
    pub target_databases: Vec<String>,
    pub routines: Vec<Routine>,
    pub tables: Vec<Table>,
    pub options: MigrationOptions,
}

impl MigrationRequest {
    pub fn object_count(&self) -> usize {
        self.target_databases.len() * (self.routines.len() + self.tables.len())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectOutcome {
    pub target_database: String,
    pub object: String,
    pub kind: ObjectKind,
    pub state: ObjectState,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupInfo>,
}

impl ObjectOutcome {
    pub fn succeeded(&self) -> bool {
        self.state != ObjectState::Failed
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<ObjectOutcome>,
    /// Id of the rollback record, when the run was recorded
    pub rollback_id: Option<String>,
}

impl MigrationSummary {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.succeeded as f64 * 100.0 / self.total as f64
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ObjectOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    fn push(&mut self, outcome: ObjectOutcome) {
        if outcome.succeeded() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(outcome);
    }
}

pub struct MigrationOrchestrator {
    engine: DeploymentEngine,
    rollback: Option<Arc<RollbackService>>,
    events: EventSink,
}

impl MigrationOrchestrator {
    pub fn new(engine: DeploymentEngine, events: EventSink) -> Self {
        Self {
            engine,
            rollback: None,
            events,
        }
    }

    /// Record runs in this rollback service when `record_rollback` is requested
    pub fn with_rollback(mut self, rollback: Arc<RollbackService>) -> Self {
        self.rollback = Some(rollback);
        self
    }

    pub fn engine(&self) -> &DeploymentEngine {
        &self.engine
    }

    /// Deploy every object to every target, one at a time
    ///
    /// A failed object is reported in the summary and the run moves on to the next one.
    pub async fn run(&self, request: &MigrationRequest) -> MigrationSummary {
        let started = Instant::now();
        let mut summary = MigrationSummary {
            total: request.object_count(),
            ..Default::default()
        };
        let mut processed = 0;

        self.events.log(format!(
            "Starting migration from {} to {} database(s)",
            request.source.database(),
            request.target_databases.len()
        ));
        self.events.progress(0);

        for target_db in &request.target_databases {
            self.events
                .log(format!("Migrating to database: {}", target_db));
            let target = request.target.for_database(target_db);

            for routine in &request.routines {
                let outcome = match self
                    .engine
                    .deploy_routine(&target, routine, request.options.create_backup)
                    .await
                {
                    Ok(deployment) => {
                        if let Some(backup) = &deployment.backup {
                            self.events.log(format!(
                                "Backed up {} as {}",
                                routine.full_name(),
                                backup.backup_name
                            ));
                        }
                        self.events.log(format!(
                            "Procedure {} {} in {}",
                            routine.full_name(),
                            deployment.state,
                            target_db
                        ));
                        ObjectOutcome {
                            target_database: target_db.clone(),
                            object: routine.full_name(),
                            kind: ObjectKind::Routine,
                            state: deployment.state,
                            error: None,
                            backup: deployment.backup,
                        }
                    }
                    Err(e) => self.failed(target_db, routine.full_name(), ObjectKind::Routine, e),
                };
                summary.push(outcome);
                processed += 1;
                self.events.progress(percent(processed, summary.total));
            }

            for table in &request.tables {
                let outcome = match self
                    .engine
                    .deploy_table(&request.source, &target, table, request.options.replace_tables)
                    .await
                {
                    Ok(deployment) => {
                        if let Some(changes) = &deployment.changes {
                            for column in &changes.to_drop {
                                self.events.log(format!(
                                    "Column {} exists only in {}.{} and was kept",
                                    column.name,
                                    target_db,
                                    table.full_name()
                                ));
                            }
                        }
                        self.events.log(format!(
                            "Table {} {} in {} ({} statement(s))",
                            table.full_name(),
                            deployment.state,
                            target_db,
                            deployment.statements.len()
                        ));
                        ObjectOutcome {
                            target_database: target_db.clone(),
                            object: table.full_name(),
                            kind: ObjectKind::Table,
                            state: deployment.state,
                            error: None,
                            backup: None,
                        }
                    }
                    Err(e) => self.failed(target_db, table.full_name(), ObjectKind::Table, e),
                };
                summary.push(outcome);
                processed += 1;
                self.events.progress(percent(processed, summary.total));
            }
        }

        if request.options.record_rollback {
            summary.rollback_id = self.record(request).await;
        }

        self.events.log(format!(
            "Migration finished: {} succeeded, {} failed ({:.1}%) in {:.1}s",
            summary.succeeded,
            summary.failed,
            summary.success_rate(),
            started.elapsed().as_secs_f64()
        ));
        info!(
            "Migration from {} finished: {}/{} objects deployed",
            request.source.database(),
            summary.succeeded,
            summary.total
        );
        self.events.progress(100);
        summary
    }

    fn failed(
        &self,
        target_db: &str,
        object: String,
        kind: ObjectKind,
        err: MigrationError,
    ) -> ObjectOutcome {
        let message = format!("Failed to migrate {} to {}: {}", object, target_db, err);
        error!("{}", message);
        self.events.log(message);
        ObjectOutcome {
            target_database: target_db.to_string(),
            object,
            kind,
            state: ObjectState::Failed,
            error: Some(err.to_string()),
            backup: None,
        }
    }

    async fn record(&self, request: &MigrationRequest) -> Option<String> {
        let Some(rollback) = &self.rollback else {
            warn!("Rollback recording requested but no rollback service is configured");
            return None;
        };

        let settings = match serde_json::to_string(&request.options) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Could not serialize migration settings: {}", e);
                String::new()
            }
        };
        let scope = MigrationScope {
            source_database: request.source.database(),
            target_databases: &request.target_databases,
            routines: &request.routines,
            tables: &request.tables,
            settings: &settings,
        };

        match rollback.record_migration(scope, &request.target).await {
            Ok(record) => Some(record.id),
            Err(e) => {
                error!("Failed to record migration for rollback: {}", e);
                self.events
                    .log(format!("Failed to record migration for rollback: {}", e));
                None
            }
        }
    }
}
