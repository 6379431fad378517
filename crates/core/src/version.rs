//! Migration versions and the version allocator
//!
//! Versions are plain unsigned integers rendered zero-padded to six digits so
//! that lexical order of file names matches numeric order.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Width of the zero-padded textual form
pub const VERSION_WIDTH: usize = 6;

/// Separator between the version prefix and the rest of an entry file name
pub const VERSION_SEPARATOR: char = '_';

/// A globally ordered migration version within one namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationVersion(u64);

impl MigrationVersion {
    /// The version allocated for an empty namespace
    pub const FIRST: MigrationVersion = MigrationVersion(1);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The following version; `None` at `u64::MAX`
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// Parse the leading numeric prefix of an entry file name.
    ///
    /// Returns `None` when the name has no separator or the prefix is not a
    /// number, e.g. `README.md` or `notes_draft.sql`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (prefix, _) = name.split_once(VERSION_SEPARATOR)?;
        prefix.parse::<u64>().ok().map(Self)
    }
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = VERSION_WIDTH)
    }
}

impl FromStr for MigrationVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| CoreError::InvalidVersion {
                value: s.to_string(),
            })
    }
}

impl From<u64> for MigrationVersion {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Compute the next version for a namespace directory.
///
/// An unreadable or missing directory is a valid starting state and yields
/// [`MigrationVersion::FIRST`]; this never fails.
pub fn next_version(dir: &Path) -> MigrationVersion {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "namespace not readable, starting at version 1");
            return MigrationVersion::FIRST;
        }
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(MigrationVersion::from_file_name)
        })
        .filter_map(|version| {
            let next = version.next();
            if next.is_none() {
                tracing::warn!(dir = %dir.display(), version = %version, "version prefix has no successor, ignoring");
            }
            next
        })
        .max()
        .unwrap_or(MigrationVersion::FIRST)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "").unwrap();
    }

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(MigrationVersion::new(1).to_string(), "000001");
        assert_eq!(MigrationVersion::new(42).to_string(), "000042");
        assert_eq!(MigrationVersion::new(1234567).to_string(), "1234567");
    }

    #[test]
    fn test_from_file_name() {
        assert_eq!(
            MigrationVersion::from_file_name("000003_reviews.up.sql"),
            Some(MigrationVersion::new(3))
        );
        assert_eq!(MigrationVersion::from_file_name("README.md"), None);
        assert_eq!(MigrationVersion::from_file_name("draft_users.up.sql"), None);
    }

    #[test]
    fn test_next_version_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("postgres-app").join("schema");
        assert_eq!(next_version(&missing), MigrationVersion::FIRST);
    }

    #[test]
    fn test_next_version_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(next_version(temp_dir.path()), MigrationVersion::FIRST);
    }

    #[test]
    fn test_next_version_is_max_plus_one() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "000001_users.up.sql");
        touch(temp_dir.path(), "000001_users.down.sql");
        touch(temp_dir.path(), "000007_orders.up.sql");
        touch(temp_dir.path(), "000003_items.up.sql");

        assert_eq!(next_version(temp_dir.path()), MigrationVersion::new(8));
    }

    #[test]
    fn test_next_version_ignores_unparseable_names() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "notes.txt");
        touch(temp_dir.path(), "draft_users.up.sql");
        touch(temp_dir.path(), "000002_users.up.sql");

        assert_eq!(next_version(temp_dir.path()), MigrationVersion::new(3));
    }

    #[test]
    fn test_next_version_ignores_prefix_without_successor() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "18446744073709551615_x.up.sql");
        assert_eq!(next_version(temp_dir.path()), MigrationVersion::FIRST);

        touch(temp_dir.path(), "000002_users.up.sql");
        assert_eq!(next_version(temp_dir.path()), MigrationVersion::new(3));
        assert_eq!(MigrationVersion::new(u64::MAX).next(), None);
    }

    #[test]
    fn test_parse_version() {
        assert_eq!("12".parse::<MigrationVersion>().unwrap(), MigrationVersion::new(12));
        assert!("twelve".parse::<MigrationVersion>().is_err());
    }
}
