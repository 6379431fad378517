//! Migration Store - loads versioned up/down file pairs from a namespace directory
//!
//! Entry files are named `<version>_<slug>.<up|down>.<ext>`. Anything else in
//! the directory is ignored.

use dbshift_core::MigrationVersion;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::definitions::{MigrationDirection, MigrationEntry};
use crate::error::{MigrateError, MigrateResult};

static ENTRY_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)_(.+)\.(up|down)\.([A-Za-z0-9]+)$").expect("entry file pattern is valid")
});

#[derive(Default)]
struct PartialEntry {
    slug: String,
    up: Option<(PathBuf, String)>,
    down: Option<(PathBuf, String)>,
}

/// Ordered entries of one namespace
#[derive(Debug, Clone)]
pub struct MigrationStore {
    dir: PathBuf,
    entries: Vec<MigrationEntry>,
}

impl MigrationStore {
    /// Load every entry in `dir`, ascending by version
    pub fn load(dir: &Path) -> MigrateResult<Self> {
        let mut partials: BTreeMap<MigrationVersion, PartialEntry> = BTreeMap::new();

        for dir_entry in fs::read_dir(dir)? {
            let path = dir_entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((version, slug, direction)) = parse_entry_file_name(file_name) else {
                tracing::debug!(file = %path.display(), "ignoring non-migration file");
                continue;
            };

            let partial = partials.entry(version).or_default();
            if partial.slug.is_empty() {
                partial.slug = slug.clone();
            } else if partial.slug != slug {
                return Err(MigrateError::store(
                    dir,
                    format!(
                        "version {} is used by both '{}' and '{}'",
                        version, partial.slug, slug
                    ),
                ));
            }

            let body = fs::read_to_string(&path)?;
            let slot = match direction {
                MigrationDirection::Up => &mut partial.up,
                MigrationDirection::Down => &mut partial.down,
            };
            if slot.is_some() {
                return Err(duplicate_file(dir, version, direction));
            }
            *slot = Some((path, body));
        }

        let mut entries = Vec::with_capacity(partials.len());
        for (version, partial) in partials {
            let Some((up_path, up)) = partial.up else {
                return Err(MigrateError::store(
                    dir,
                    format!("version {} has a down file but no up file", version),
                ));
            };
            let (down_path, down) = match partial.down {
                Some((path, body)) => (Some(path), body),
                None => (None, String::new()),
            };
            entries.push(MigrationEntry {
                version,
                slug: partial.slug,
                up,
                down,
                up_path,
                down_path,
            });
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            entries,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[MigrationEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn latest(&self) -> Option<MigrationVersion> {
        self.entries.last().map(|e| e.version)
    }

    pub fn get(&self, version: MigrationVersion) -> Option<&MigrationEntry> {
        self.entries
            .binary_search_by_key(&version, |e| e.version)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    /// Entries newer than `current`, ascending
    pub fn pending(&self, current: Option<MigrationVersion>) -> &[MigrationEntry] {
        let start = match current {
            Some(current) => self.entries.partition_point(|e| e.version <= current),
            None => 0,
        };
        &self.entries[start..]
    }

    /// Entries at or below `current`, descending
    pub fn applied_desc(
        &self,
        current: MigrationVersion,
    ) -> impl Iterator<Item = &MigrationEntry> + '_ {
        let end = self.entries.partition_point(|e| e.version <= current);
        self.entries[..end].iter().rev()
    }

    /// Version of the entry just before `version`, `None` for the first entry
    pub fn previous_version(&self, version: MigrationVersion) -> Option<MigrationVersion> {
        let idx = self.entries.partition_point(|e| e.version < version);
        idx.checked_sub(1).map(|i| self.entries[i].version)
    }
}

fn duplicate_file(dir: &Path, version: MigrationVersion, direction: MigrationDirection) -> MigrateError {
    let which = match direction {
        MigrationDirection::Up => "up",
        MigrationDirection::Down => "down",
    };
    MigrateError::store(
        dir,
        format!("version {} has more than one {} file", version, which),
    )
}

/// Split an entry file name into version, slug and direction
pub fn parse_entry_file_name(
    file_name: &str,
) -> Option<(MigrationVersion, String, MigrationDirection)> {
    let caps = ENTRY_FILE.captures(file_name)?;
    let version = caps[1].parse::<u64>().ok().map(MigrationVersion::new)?;
    let direction = match &caps[3] {
        "up" => MigrationDirection::Up,
        _ => MigrationDirection::Down,
    };
    Some((version, caps[2].to_string(), direction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_parse_entry_file_name() {
        let (version, slug, direction) =
            parse_entry_file_name("000012_create_orders.down.sql").unwrap();
        assert_eq!(version, MigrationVersion::new(12));
        assert_eq!(slug, "create_orders");
        assert_eq!(direction, MigrationDirection::Down);

        assert!(parse_entry_file_name("000001_users.sql").is_none());
        assert!(parse_entry_file_name("README.md").is_none());
        assert!(parse_entry_file_name("v1_users.up.sql").is_none());
    }

    #[test]
    fn test_load_orders_entries_and_pairs_bodies() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "000002_orders.up.sql", "CREATE TABLE orders();");
        write(temp_dir.path(), "000002_orders.down.sql", "DROP TABLE orders;");
        write(temp_dir.path(), "000001_users.up.sql", "CREATE TABLE users();");
        write(temp_dir.path(), "000001_users.down.sql", "DROP TABLE users;");
        write(temp_dir.path(), "notes.md", "ignored");

        let store = MigrationStore::load(temp_dir.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.entries()[0].name(), "000001_users");
        assert_eq!(store.entries()[1].down, "DROP TABLE orders;");
        assert_eq!(store.latest(), Some(MigrationVersion::new(2)));
    }

    #[test]
    fn test_missing_down_file_yields_empty_body() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "000001_profiles.up.js", "- create: profiles\n");

        let store = MigrationStore::load(temp_dir.path()).unwrap();
        let entry = store.get(MigrationVersion::new(1)).unwrap();
        assert!(entry.down.is_empty());
        assert!(entry.down_path.is_none());
    }

    #[test]
    fn test_conflicting_slugs_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "000001_users.up.sql", "");
        write(temp_dir.path(), "000001_accounts.up.sql", "");

        assert!(matches!(
            MigrationStore::load(temp_dir.path()),
            Err(MigrateError::Store { .. })
        ));
    }

    #[test]
    fn test_down_without_up_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "000001_users.down.sql", "DROP TABLE users;");

        assert!(MigrationStore::load(temp_dir.path()).is_err());
    }

    #[test]
    fn test_pending_and_applied_windows() {
        let temp_dir = TempDir::new().unwrap();
        for (version, slug) in [(1, "a"), (2, "b"), (5, "c")] {
            write(
                temp_dir.path(),
                &format!("{:06}_{}.up.sql", version, slug),
                "SELECT 1;",
            );
        }
        let store = MigrationStore::load(temp_dir.path()).unwrap();

        let pending: Vec<u64> = store.pending(None).iter().map(|e| e.version.get()).collect();
        assert_eq!(pending, vec![1, 2, 5]);
        let pending: Vec<u64> = store
            .pending(Some(MigrationVersion::new(2)))
            .iter()
            .map(|e| e.version.get())
            .collect();
        assert_eq!(pending, vec![5]);
        assert!(store.pending(Some(MigrationVersion::new(5))).is_empty());

        let applied: Vec<u64> = store
            .applied_desc(MigrationVersion::new(5))
            .map(|e| e.version.get())
            .collect();
        assert_eq!(applied, vec![5, 2, 1]);

        assert_eq!(
            store.previous_version(MigrationVersion::new(5)),
            Some(MigrationVersion::new(2))
        );
        assert_eq!(store.previous_version(MigrationVersion::new(1)), None);
    }
}
