//! Migration Definitions - Core types shared by the store, tracker and runner

use dbshift_core::{MigrationVersion, Namespace};
use std::fmt;
use std::path::PathBuf;

/// One versioned up/down body pair loaded from a namespace directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationEntry {
    pub version: MigrationVersion,
    /// Normalized identifier following the version in the file name
    pub slug: String,
    pub up: String,
    /// Empty when the entry ships without a down file
    pub down: String,
    pub up_path: PathBuf,
    pub down_path: Option<PathBuf>,
}

impl MigrationEntry {
    /// `<version>_<slug>`
    pub fn name(&self) -> String {
        format!("{}_{}", self.version, self.slug)
    }

    pub fn body(&self, direction: MigrationDirection) -> &str {
        match direction {
            MigrationDirection::Up => &self.up,
            MigrationDirection::Down => &self.down,
        }
    }
}

/// Persisted migration progress of one namespace in one target database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppliedState {
    /// `None` until the first entry is applied, and again after a full revert
    pub version: Option<MigrationVersion>,
    /// Set when the last step may not have completed
    pub dirty: bool,
}

impl AppliedState {
    pub fn clean(version: Option<MigrationVersion>) -> Self {
        Self {
            version,
            dirty: false,
        }
    }

    pub fn dirty(version: Option<MigrationVersion>) -> Self {
        Self {
            version,
            dirty: true,
        }
    }
}

impl fmt::Display for AppliedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (dirty: {})", display_version(self.version), self.dirty)
    }
}

/// Render an optional version, `none` before the first entry
pub fn display_version(version: Option<MigrationVersion>) -> String {
    version
        .map(|v| v.to_string())
        .unwrap_or_else(|| "none".to_string())
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (run UP bodies)
    Up,
    /// Rollback the migration (run DOWN bodies)
    Down,
}

/// Action requested for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationAction {
    /// Apply every pending entry
    Up,
    /// Revert `steps` entries; 0 reverts everything
    Down { steps: u32 },
    /// Report the applied state without changing it
    Version,
    /// Set the applied state to a version and clear dirty without running any body
    Force { version: MigrationVersion },
}

impl fmt::Display for MigrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationAction::Up => write!(f, "up"),
            MigrationAction::Down { steps: 0 } => write!(f, "down (all)"),
            MigrationAction::Down { steps } => write!(f, "down ({} steps)", steps),
            MigrationAction::Version => write!(f, "version"),
            MigrationAction::Force { version } => write!(f, "force {}", version),
        }
    }
}

/// What happened to one namespace during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceOutcome {
    /// Namespace directory does not exist; skipped
    PathMissing,
    /// Namespace directory holds no entries; skipped
    Empty,
    /// Nothing to apply or revert
    NoChange { state: AppliedState },
    Applied {
        from: Option<MigrationVersion>,
        to: MigrationVersion,
        versions: Vec<MigrationVersion>,
    },
    Reverted {
        from: MigrationVersion,
        to: Option<MigrationVersion>,
        versions: Vec<MigrationVersion>,
    },
    Inspected { state: AppliedState },
    Forced { state: AppliedState },
}

impl NamespaceOutcome {
    /// Whether the run changed the database
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            NamespaceOutcome::Applied { .. }
                | NamespaceOutcome::Reverted { .. }
                | NamespaceOutcome::Forced { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceReport {
    pub namespace: Namespace,
    pub outcome: NamespaceOutcome,
}
