//! Migration Runner - applies entries of one namespace against a connection
//!
//! The runner moves through `Connected -> {Applying, Reverting, Inspecting}
//! -> Connected` for every namespace it is handed. Opening and closing the
//! connection belongs to the session that owns the driver.

use dbshift_core::{MigrationVersion, Namespace};
use std::fmt;
use std::path::Path;

use super::definitions::{
    display_version, AppliedState, MigrationAction, MigrationDirection, MigrationEntry,
    NamespaceOutcome, NamespaceReport,
};
use super::state::StateTracker;
use super::store::MigrationStore;
use crate::backends::MigrationDriver;
use crate::error::{MigrateError, MigrateResult};

/// Phase of the runner state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Connected,
    Applying,
    Reverting,
    Inspecting,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunnerState::Connected => "connected",
            RunnerState::Applying => "applying",
            RunnerState::Reverting => "reverting",
            RunnerState::Inspecting => "inspecting",
        };
        f.write_str(name)
    }
}

/// Runs migration actions over a live driver
pub struct MigrationRunner<'d> {
    pub(super) driver: &'d mut dyn MigrationDriver,
    state: RunnerState,
}

impl<'d> MigrationRunner<'d> {
    pub fn new(driver: &'d mut dyn MigrationDriver) -> Self {
        Self {
            driver,
            state: RunnerState::Connected,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Run `action` on the namespace stored under `migrations_root`.
    ///
    /// The runner is back in [`RunnerState::Connected`] when this returns,
    /// whether or not the action succeeded.
    pub async fn run(
        &mut self,
        namespace: &Namespace,
        migrations_root: &Path,
        action: MigrationAction,
    ) -> MigrateResult<NamespaceReport> {
        let dir = namespace.dir(migrations_root);
        if !dir.is_dir() {
            tracing::warn!(namespace = %namespace, path = %dir.display(), "migration path not found, skipping");
            return Ok(NamespaceReport {
                namespace: namespace.clone(),
                outcome: NamespaceOutcome::PathMissing,
            });
        }

        let store = MigrationStore::load(&dir)?;
        let tracker = StateTracker::new(namespace);
        tracing::info!(namespace = %namespace, action = %action, entries = store.len(), "running migrations");

        self.state = match action {
            MigrationAction::Up => RunnerState::Applying,
            MigrationAction::Down { .. } => RunnerState::Reverting,
            MigrationAction::Version | MigrationAction::Force { .. } => RunnerState::Inspecting,
        };

        let result = match action {
            MigrationAction::Up => self.apply_pending(&tracker, &store).await,
            MigrationAction::Down { steps } => self.revert(&tracker, &store, steps).await,
            MigrationAction::Version => self.inspect(&tracker).await,
            MigrationAction::Force { version } => self.force(&tracker, &store, version).await,
        };
        self.state = RunnerState::Connected;

        Ok(NamespaceReport {
            namespace: namespace.clone(),
            outcome: result?,
        })
    }

    async fn apply_pending(
        &mut self,
        tracker: &StateTracker,
        store: &MigrationStore,
    ) -> MigrateResult<NamespaceOutcome> {
        if store.is_empty() {
            tracing::debug!(namespace = tracker.key(), "no migration entries, skipping");
            return Ok(NamespaceOutcome::Empty);
        }

        let current = tracker.load(&mut *self.driver).await?;
        refuse_dirty(tracker, current)?;

        let pending = store.pending(current.version);
        if pending.is_empty() {
            tracing::info!(namespace = tracker.key(), version = %display_version(current.version), "no change");
            return Ok(NamespaceOutcome::NoChange { state: current });
        }

        let mut applied = Vec::with_capacity(pending.len());
        for entry in pending {
            tracing::info!(namespace = tracker.key(), "Applying migration: {}", entry.name());
            self.step(tracker, entry, MigrationDirection::Up, Some(entry.version))
                .await?;
            applied.push(entry.version);
        }

        let to = *applied.last().unwrap_or(&MigrationVersion::FIRST);
        tracing::info!(namespace = tracker.key(), count = applied.len(), "migrated to version {}", to);

        Ok(NamespaceOutcome::Applied {
            from: current.version,
            to,
            versions: applied,
        })
    }

    async fn inspect(&mut self, tracker: &StateTracker) -> MigrateResult<NamespaceOutcome> {
        let state = tracker.load(&mut *self.driver).await?;
        tracing::info!(namespace = tracker.key(), "Current version: {}", state);
        Ok(NamespaceOutcome::Inspected { state })
    }

    async fn force(
        &mut self,
        tracker: &StateTracker,
        store: &MigrationStore,
        version: MigrationVersion,
    ) -> MigrateResult<NamespaceOutcome> {
        let target = match version.get() {
            0 => None,
            _ => {
                if store.get(version).is_none() {
                    return Err(MigrateError::MissingEntry {
                        namespace: tracker.key().to_string(),
                        version: version.to_string(),
                    });
                }
                Some(version)
            }
        };

        let previous = tracker.load(&mut *self.driver).await?;
        let state = tracker.force(&mut *self.driver, target).await?;
        tracing::warn!(
            namespace = tracker.key(),
            previous = %previous,
            "forced version to {}",
            display_version(target)
        );
        Ok(NamespaceOutcome::Forced { state })
    }

    /// Run one entry body and record `target` as the new version.
    ///
    /// Transactional drivers commit body and state together. Otherwise the
    /// entry is marked dirty first and the flag is cleared only once the new
    /// state is stored, so an interrupted step stays visible.
    pub(super) async fn step(
        &mut self,
        tracker: &StateTracker,
        entry: &MigrationEntry,
        direction: MigrationDirection,
        target: Option<MigrationVersion>,
    ) -> MigrateResult<()> {
        let body = entry.body(direction);
        let failed = |e: MigrateError| MigrateError::Execution {
            namespace: tracker.key().to_string(),
            version: entry.version.to_string(),
            message: e.to_string(),
        };

        if self.driver.is_transactional() {
            tracker
                .commit_step(&mut *self.driver, body, AppliedState::clean(target))
                .await
                .map_err(failed)?;
            return Ok(());
        }

        tracker.mark_dirty(&mut *self.driver, entry.version).await?;
        if let Err(e) = self.driver.execute(body).await {
            tracing::error!(
                namespace = tracker.key(),
                version = %entry.version,
                "migration failed, state left dirty"
            );
            return Err(failed(e));
        }
        match direction {
            MigrationDirection::Up => tracker.advance(&mut *self.driver, entry.version).await?,
            MigrationDirection::Down => tracker.retreat(&mut *self.driver, target).await?,
        };
        Ok(())
    }
}

/// Fail when the last step did not complete
pub(super) fn refuse_dirty(tracker: &StateTracker, state: AppliedState) -> MigrateResult<()> {
    if state.dirty {
        tracing::error!(
            namespace = tracker.key(),
            version = %display_version(state.version),
            "database is dirty, refusing to continue"
        );
        return Err(MigrateError::Dirty {
            namespace: tracker.key().to_string(),
            version: display_version(state.version),
        });
    }
    Ok(())
}
