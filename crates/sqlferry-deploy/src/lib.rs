//! Deployment of routines and tables into target databases
//!
//! The engine decides CREATE or ALTER per object and runs each deployment in its own
//! transaction; the orchestrator drives it across targets and reports progress.

pub mod backup;
pub mod differ;
pub mod engine;
pub mod orchestrator;
pub mod script;

pub use backup::backup_routine;
pub use differ::{diff, render_alter_script, ColumnDiff};
pub use engine::{DeploymentEngine, ObjectState, RoutineDeployment, TableDeployment};
pub use orchestrator::{
    MigrationOptions, MigrationOrchestrator, MigrationRequest, MigrationSummary, ObjectOutcome,
};
pub use script::{backup_routine_script, prepare_routine_script};
