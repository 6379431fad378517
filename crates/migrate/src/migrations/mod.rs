//! Migration System
//!
//! Loads versioned entries from disk, tracks applied state in the target
//! database and runs entries up or down.

pub mod definitions;
pub mod rollback;
pub mod runner;
pub mod state;
pub mod store;

pub use definitions::{
    display_version, AppliedState, MigrationAction, MigrationDirection, MigrationEntry,
    NamespaceOutcome, NamespaceReport,
};
pub use runner::{MigrationRunner, RunnerState};
pub use state::StateTracker;
pub use store::MigrationStore;
