//! Schema Renderer - turns schema descriptions into up/down migration bodies
//!
//! One variant per supported engine behind a common render contract. Adding
//! an engine means adding a variant, not touching the others.

use dbshift_core::{CollectionSpec, ColumnSpec, Engine, IndexSpec, SchemaSpec, TableSpec};
use serde_json::{json, Value};

use crate::error::{CodegenError, CodegenResult};

/// Maximum number of expression characters used in a check constraint name
pub const CHECK_NAME_PREFIX_LEN: usize = 20;

/// Rendered forward and reverse bodies of one migration entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMigration {
    pub up: String,
    pub down: String,
    /// File extension for both bodies, without the dot
    pub extension: &'static str,
}

/// Engine-specific renderer selected from the schema description
#[derive(Debug)]
pub enum Renderer<'a> {
    Relational(RelationalRenderer<'a>),
    Document(DocumentRenderer<'a>),
}

impl<'a> Renderer<'a> {
    /// Select the renderer for the engine the schema description declares.
    ///
    /// Fails with `MissingDefinition` when the block that engine needs is absent.
    pub fn for_spec(spec: &'a SchemaSpec) -> CodegenResult<Self> {
        match spec.engine() {
            Engine::Postgres => spec
                .table
                .as_ref()
                .map(|table| Renderer::Relational(RelationalRenderer::new(table)))
                .ok_or(CodegenError::MissingDefinition {
                    engine: Engine::Postgres,
                    expected: "table",
                }),
            Engine::Mongo => spec
                .collection
                .as_ref()
                .map(|collection| Renderer::Document(DocumentRenderer::new(collection)))
                .ok_or(CodegenError::MissingDefinition {
                    engine: Engine::Mongo,
                    expected: "collection",
                }),
        }
    }

    pub fn engine(&self) -> Engine {
        match self {
            Renderer::Relational(_) => Engine::Postgres,
            Renderer::Document(_) => Engine::Mongo,
        }
    }

    pub fn extension(&self) -> &'static str {
        self.engine().body_extension()
    }

    pub fn render_up(&self) -> CodegenResult<String> {
        match self {
            Renderer::Relational(r) => Ok(r.render_up()),
            Renderer::Document(r) => r.render_up(),
        }
    }

    pub fn render_down(&self) -> CodegenResult<String> {
        match self {
            Renderer::Relational(r) => Ok(r.render_down()),
            Renderer::Document(r) => r.render_down(),
        }
    }

    /// Render both bodies as a pair
    pub fn render(&self) -> CodegenResult<RenderedMigration> {
        Ok(RenderedMigration {
            up: self.render_up()?,
            down: self.render_down()?,
            extension: self.extension(),
        })
    }
}

/// Renders PostgreSQL DDL for a table description
#[derive(Debug)]
pub struct RelationalRenderer<'a> {
    table: &'a TableSpec,
}

impl<'a> RelationalRenderer<'a> {
    pub fn new(table: &'a TableSpec) -> Self {
        Self { table }
    }

    /// Table creation, then indexes, foreign keys and check constraints, each
    /// in declaration order
    pub fn render_up(&self) -> String {
        let table = self.table;
        let mut lines = Vec::new();

        lines.push(format!("-- Create {} table", table.name));
        lines.push(format!("CREATE TABLE IF NOT EXISTS {} (", table.name));
        let columns: Vec<String> = table.columns.iter().map(|c| self.column_definition(c)).collect();
        lines.push(columns.join(",\n"));
        lines.push(");".to_string());
        lines.push(String::new());

        for index in &table.indexes {
            lines.push(self.create_index(index));
        }

        for fk in &table.foreign_keys {
            let mut line = format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}",
                table.name,
                foreign_key_name(&table.name, &fk.column),
                fk.column,
                fk.references
            );
            if let Some(on_delete) = &fk.on_delete {
                line.push_str(&format!(" ON DELETE {}", on_delete));
            }
            if let Some(on_update) = &fk.on_update {
                line.push_str(&format!(" ON UPDATE {}", on_update));
            }
            line.push(';');
            lines.push(line);
        }

        for constraint in &table.constraints {
            lines.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({});",
                table.name,
                check_constraint_name(&constraint.expression),
                constraint.expression
            ));
        }

        finish(lines)
    }

    /// Indexes dropped in reverse declaration order, then the table.
    ///
    /// Foreign keys and check constraints go away with the table.
    pub fn render_down(&self) -> String {
        let table = self.table;
        let mut lines = vec![format!("-- Drop {} table", table.name)];

        for index in table.indexes.iter().rev() {
            lines.push(format!("DROP INDEX IF EXISTS {};", index.name));
        }
        lines.push(format!("DROP TABLE IF EXISTS {};", table.name));

        finish(lines)
    }

    fn column_definition(&self, column: &ColumnSpec) -> String {
        let mut definition = format!("    {} {}", column.name, column.column_type);
        if column.primary_key {
            definition.push_str(" PRIMARY KEY");
        }
        if column.not_null {
            definition.push_str(" NOT NULL");
        }
        if column.unique {
            definition.push_str(" UNIQUE");
        }
        if let Some(default) = column.default_literal() {
            definition.push_str(&format!(" DEFAULT {}", default));
        }
        definition
    }

    fn create_index(&self, index: &IndexSpec) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let method = index
            .method
            .as_deref()
            .map(|m| format!(" USING {}", m))
            .unwrap_or_default();
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {}{} ({});",
            unique,
            index.name,
            self.table.name,
            method,
            index.columns.join(", ")
        )
    }
}

/// Deterministic foreign key constraint name
pub fn foreign_key_name(table: &str, column: &str) -> String {
    format!("fk_{}_{}", table, column)
}

/// Check constraint name from the normalized expression prefix.
///
/// Expressions sharing their first 20 normalized characters produce the same
/// name; callers must keep such constraints apart themselves.
pub fn check_constraint_name(expression: &str) -> String {
    let normalized = expression.replace(' ', "_").to_lowercase();
    let prefix: String = normalized.chars().take(CHECK_NAME_PREFIX_LEN).collect();
    format!("chk_{}", prefix)
}

fn finish(lines: Vec<String>) -> String {
    let mut body = lines.join("\n");
    body.push('\n');
    body
}

/// Renders a MongoDB directive list for a collection description
#[derive(Debug)]
pub struct DocumentRenderer<'a> {
    collection: &'a CollectionSpec,
}

impl<'a> DocumentRenderer<'a> {
    pub fn new(collection: &'a CollectionSpec) -> Self {
        Self { collection }
    }

    /// Directive list holding a single collection creation with its validator
    pub fn up_directives(&self) -> Value {
        let mut create = serde_json::Map::new();
        create.insert("create".to_string(), json!(self.collection.name));
        if let Some(validator) = &self.collection.validator {
            create.insert("validator".to_string(), Value::Object(validator.clone()));
        }
        Value::Array(vec![Value::Object(create)])
    }

    /// Directive list holding a single collection drop
    pub fn down_directives(&self) -> Value {
        json!([{ "drop": self.collection.name }])
    }

    pub fn render_up(&self) -> CodegenResult<String> {
        to_document(&self.up_directives())
    }

    pub fn render_down(&self) -> CodegenResult<String> {
        to_document(&self.down_directives())
    }
}

fn to_document(directives: &Value) -> CodegenResult<String> {
    let mut body = serde_json::to_string_pretty(directives)?;
    body.push('\n');
    Ok(body)
}
