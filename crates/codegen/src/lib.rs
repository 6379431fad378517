pub mod error;
pub mod generator;
pub mod render;
pub mod writer;

pub use error::{CodegenError, CodegenResult};
pub use generator::{GeneratedMigration, MigrationGenerator};
pub use render::{DocumentRenderer, RelationalRenderer, RenderedMigration, Renderer};
pub use writer::MigrationWriter;
