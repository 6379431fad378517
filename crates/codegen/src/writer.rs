use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::{CodegenError, CodegenResult};

/// Writes generated migration bodies; entries are immutable once written
pub struct MigrationWriter;

impl MigrationWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write `content` to a file that must not exist yet, creating parent
    /// directories as needed
    pub fn write_new(&self, path: &Path, content: &str) -> CodegenResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => CodegenError::AlreadyExists {
                    path: path.to_path_buf(),
                },
                _ => CodegenError::Io(e),
            })?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Default for MigrationWriter {
    fn default() -> Self {
        Self::new()
    }
}
