use dbshift_core::{next_version, MigrationVersion, Namespace, SchemaSpec};
use std::path::{Path, PathBuf};

use crate::error::CodegenResult;
use crate::render::Renderer;
use crate::writer::MigrationWriter;

/// Result of generating one migration entry
#[derive(Debug, Clone)]
pub struct GeneratedMigration {
    pub namespace: Namespace,
    pub version: MigrationVersion,
    /// `<version>_<slug>`, shared by both files
    pub name: String,
    pub up_path: PathBuf,
    pub down_path: PathBuf,
}

/// Authoring-time pipeline: allocate a version, render, write the file pair
pub struct MigrationGenerator<'a> {
    migrations_root: &'a Path,
    writer: MigrationWriter,
}

impl<'a> MigrationGenerator<'a> {
    pub fn new(migrations_root: &'a Path) -> Self {
        Self {
            migrations_root,
            writer: MigrationWriter::new(),
        }
    }

    pub fn generate(&self, spec: &SchemaSpec) -> CodegenResult<GeneratedMigration> {
        // Render before touching the filesystem so a missing definition
        // leaves no half-created namespace behind.
        let rendered = Renderer::for_spec(spec)?.render()?;

        let namespace = spec.namespace();
        let dir = namespace.dir(self.migrations_root);
        let version = next_version(&dir);
        let name = format!("{}_{}", version, spec.slug());

        let up_path = dir.join(format!("{}.up.{}", name, rendered.extension));
        let down_path = dir.join(format!("{}.down.{}", name, rendered.extension));

        self.writer.write_new(&up_path, &rendered.up)?;
        self.writer.write_new(&down_path, &rendered.down)?;

        tracing::info!(
            namespace = %namespace,
            version = %version,
            up = %up_path.display(),
            down = %down_path.display(),
            "generated migration"
        );

        Ok(GeneratedMigration {
            namespace,
            version,
            name,
            up_path,
            down_path,
        })
    }
}
