//! Migration Rollback - reverts applied entries newest first
//!
//! Each reverted entry runs its DOWN body and moves the recorded version to
//! the entry before it.

use super::definitions::{display_version, MigrationDirection, NamespaceOutcome};
use super::runner::{refuse_dirty, MigrationRunner};
use super::state::StateTracker;
use super::store::MigrationStore;
use crate::error::{MigrateError, MigrateResult};

impl<'d> MigrationRunner<'d> {
    /// Revert `steps` entries from the current version downward; 0 reverts all
    pub(super) async fn revert(
        &mut self,
        tracker: &StateTracker,
        store: &MigrationStore,
        steps: u32,
    ) -> MigrateResult<NamespaceOutcome> {
        if store.is_empty() {
            tracing::debug!(namespace = tracker.key(), "no migration entries, skipping");
            return Ok(NamespaceOutcome::Empty);
        }

        let current = tracker.load(&mut *self.driver).await?;
        refuse_dirty(tracker, current)?;

        let from = match current.version {
            Some(version) => version,
            None => {
                tracing::info!(namespace = tracker.key(), "nothing applied, no change");
                return Ok(NamespaceOutcome::NoChange { state: current });
            }
        };
        if store.get(from).is_none() {
            return Err(MigrateError::MissingEntry {
                namespace: tracker.key().to_string(),
                version: from.to_string(),
            });
        }

        let applied: Vec<_> = store.applied_desc(from).collect();
        let count = match steps {
            0 => applied.len(),
            n if n as usize > applied.len() => {
                tracing::warn!(
                    namespace = tracker.key(),
                    requested = n,
                    available = applied.len(),
                    "fewer applied migrations than requested steps, reverting all"
                );
                applied.len()
            }
            n => n as usize,
        };

        let mut reverted = Vec::with_capacity(count);
        let mut to = Some(from);
        for entry in applied.into_iter().take(count) {
            let target = store.previous_version(entry.version);
            tracing::info!(namespace = tracker.key(), "Rolling back migration: {}", entry.name());
            if entry.down_path.is_none() {
                tracing::warn!(namespace = tracker.key(), version = %entry.version, "no down body, only moving the version");
            }
            self.step(tracker, entry, MigrationDirection::Down, target)
                .await?;
            reverted.push(entry.version);
            to = target;
        }

        tracing::info!(
            namespace = tracker.key(),
            count = reverted.len(),
            "rolled back to version {}",
            display_version(to)
        );

        Ok(NamespaceOutcome::Reverted {
            from,
            to,
            versions: reverted,
        })
    }
}
