//! State Tracker - persisted version and dirty flag of one namespace
//!
//! State lives in the target database itself, so each connection tracks its
//! own progress independently of the files on disk.

use dbshift_core::{MigrationVersion, Namespace};

use super::definitions::AppliedState;
use crate::backends::MigrationDriver;
use crate::error::MigrateResult;

/// Reads and writes the [`AppliedState`] record of one namespace
#[derive(Debug, Clone)]
pub struct StateTracker {
    key: String,
}

impl StateTracker {
    pub fn new(namespace: &Namespace) -> Self {
        Self {
            key: namespace.key(),
        }
    }

    /// Key of the persisted record
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current state; a fresh `{none, clean}` record is created on first use
    pub async fn load<D>(&self, driver: &mut D) -> MigrateResult<AppliedState>
    where
        D: MigrationDriver + ?Sized,
    {
        driver.load_state(&self.key).await
    }

    /// Persist `version` as applied and clear dirty
    pub async fn advance<D>(&self, driver: &mut D, version: MigrationVersion) -> MigrateResult<AppliedState>
    where
        D: MigrationDriver + ?Sized,
    {
        let state = AppliedState::clean(Some(version));
        driver.store_state(&self.key, state).await?;
        Ok(state)
    }

    /// Persist the version left after a revert and clear dirty
    pub async fn retreat<D>(
        &self,
        driver: &mut D,
        version: Option<MigrationVersion>,
    ) -> MigrateResult<AppliedState>
    where
        D: MigrationDriver + ?Sized,
    {
        let state = AppliedState::clean(version);
        driver.store_state(&self.key, state).await?;
        Ok(state)
    }

    /// Persist dirty before a step that cannot run in a transaction.
    ///
    /// `version` is the entry in flight; it stays recorded if the step never
    /// completes.
    pub async fn mark_dirty<D>(&self, driver: &mut D, version: MigrationVersion) -> MigrateResult<()>
    where
        D: MigrationDriver + ?Sized,
    {
        driver
            .store_state(&self.key, AppliedState::dirty(Some(version)))
            .await
    }

    /// Run `body` and persist `next` as one transaction
    pub async fn commit_step<D>(&self, driver: &mut D, body: &str, next: AppliedState) -> MigrateResult<()>
    where
        D: MigrationDriver + ?Sized,
    {
        driver.execute_and_store(&self.key, body, next).await
    }

    /// Overwrite the state with a clean record at `version`
    pub async fn force<D>(
        &self,
        driver: &mut D,
        version: Option<MigrationVersion>,
    ) -> MigrateResult<AppliedState>
    where
        D: MigrationDriver + ?Sized,
    {
        let state = AppliedState::clean(version);
        driver.store_state(&self.key, state).await?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MemoryDatabase, MemoryDriver};
    use dbshift_core::{Engine, MigrationCategory};

    fn tracker() -> StateTracker {
        StateTracker::new(&Namespace::new(Engine::Mongo, "app", MigrationCategory::Schema))
    }

    #[tokio::test]
    async fn test_advance_and_retreat_clear_dirty() {
        let db = MemoryDatabase::new();
        let mut driver = MemoryDriver::non_transactional(db.clone(), "app");
        let tracker = tracker();

        assert_eq!(tracker.load(&mut driver).await.unwrap(), AppliedState::default());

        tracker.mark_dirty(&mut driver, MigrationVersion::new(1)).await.unwrap();
        assert!(db.state("mongo-app/schema").await.unwrap().dirty);

        let state = tracker.advance(&mut driver, MigrationVersion::new(1)).await.unwrap();
        assert_eq!(state, AppliedState::clean(Some(MigrationVersion::new(1))));

        let state = tracker.retreat(&mut driver, None).await.unwrap();
        assert_eq!(db.state("mongo-app/schema").await, Some(state));
        assert_eq!(state.version, None);
    }

    #[tokio::test]
    async fn test_states_are_scoped_per_connection() {
        let first = MemoryDatabase::new();
        let second = MemoryDatabase::new();
        let tracker = tracker();

        let mut driver = MemoryDriver::non_transactional(first.clone(), "app");
        tracker.advance(&mut driver, MigrationVersion::new(3)).await.unwrap();

        let mut other = MemoryDriver::non_transactional(second, "app");
        assert_eq!(tracker.load(&mut other).await.unwrap(), AppliedState::default());
    }
}
