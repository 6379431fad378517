use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::namespace::{Engine, MigrationCategory, Namespace};

/// Declarative schema description consumed by the migration generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub database: DatabaseSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_type: Option<MigrationCategory>,
}

impl SchemaSpec {
    /// Create a schema spec from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load a schema spec from a YAML file
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let spec = Self::from_yaml(&content)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn engine(&self) -> Engine {
        self.database.engine
    }

    pub fn category(&self) -> MigrationCategory {
        self.migration_type.unwrap_or_default()
    }

    /// Namespace the generated entry belongs to
    pub fn namespace(&self) -> Namespace {
        Namespace::new(self.engine(), self.database.name.clone(), self.category())
    }

    /// Name of the described object: the table for relational engines, the
    /// collection for document engines
    pub fn object_name(&self) -> Option<&str> {
        match self.engine() {
            Engine::Postgres => self.table.as_ref().map(|t| t.name.as_str()),
            Engine::Mongo => self.collection.as_ref().map(|c| c.name.as_str()),
        }
    }

    /// Normalized entry slug: lowercase, spaces replaced by underscores
    pub fn slug(&self) -> String {
        normalize_slug(self.object_name().unwrap_or_default())
    }

    /// Basic structural checks; renderer-specific requirements are enforced
    /// when rendering
    pub fn validate(&self) -> CoreResult<()> {
        if self.database.name.trim().is_empty() {
            return Err(CoreError::validation("database.name must not be empty"));
        }
        if let Some(table) = &self.table {
            if table.name.trim().is_empty() {
                return Err(CoreError::validation("table.name must not be empty"));
            }
            if table.columns.is_empty() {
                return Err(CoreError::validation(format!(
                    "table '{}' declares no columns",
                    table.name
                )));
            }
            if let Some(constraint) = table
                .constraints
                .iter()
                .find(|c| !c.kind.eq_ignore_ascii_case(CHECK_CONSTRAINT))
            {
                return Err(CoreError::validation(format!(
                    "table '{}': unsupported constraint type '{}' (only {} is rendered)",
                    table.name, constraint.kind, CHECK_CONSTRAINT
                )));
            }
        }
        if let Some(collection) = &self.collection {
            if collection.name.trim().is_empty() {
                return Err(CoreError::validation("collection.name must not be empty"));
            }
        }
        Ok(())
    }
}

/// Lowercase an identifier and replace spaces with underscores
pub fn normalize_slug(name: &str) -> String {
    name.replace(' ', "_").to_lowercase()
}

/// Target database of a schema description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSpec {
    #[serde(rename = "type")]
    pub engine: Engine,
    pub name: String,
}

/// Relational table description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySpec>,
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ColumnSpec {
    /// Default value exactly as written, without quoting or validation
    pub fn default_literal(&self) -> Option<String> {
        self.default.as_ref().map(|value| match value {
            Value::String(s) => s.clone(),
            Value::Null => "NULL".to_string(),
            other => other.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    /// Index method, e.g. `gin` or `btree`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    pub column: String,
    /// Referenced target, e.g. `users(id)`
    pub references: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintSpec {
    #[serde(rename = "type", default = "default_constraint_kind")]
    pub kind: String,
    pub expression: String,
}

/// The only constraint type the generator renders
pub const CHECK_CONSTRAINT: &str = "check";

fn default_constraint_kind() -> String {
    CHECK_CONSTRAINT.to_string()
}

/// Document collection description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<Map<String, Value>>,
    #[serde(default)]
    pub indexes: Vec<DocumentIndexSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentIndexSpec {
    pub keys: Map<String, Value>,
    #[serde(default)]
    pub unique: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const USERS: &str = r#"
database:
  type: postgres
  name: app
table:
  name: users
  columns:
    - name: id
      type: serial
      primary_key: true
    - name: email
      type: text
      not_null: true
      unique: true
    - name: active
      type: boolean
      default: true
"#;

    #[test]
    fn test_parse_relational_spec() {
        let spec = SchemaSpec::from_yaml(USERS).unwrap();
        assert_eq!(spec.engine(), Engine::Postgres);
        assert_eq!(spec.category(), MigrationCategory::Schema);

        let table = spec.table.as_ref().unwrap();
        assert_eq!(table.columns.len(), 3);
        assert!(table.columns[0].primary_key);
        assert!(table.columns[1].not_null && table.columns[1].unique);
        assert_eq!(table.columns[2].default_literal().as_deref(), Some("true"));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_parse_document_spec_with_seed_tag() {
        let yaml = r#"
database:
  type: mongo
  name: product
migration_type: seed
collection:
  name: Product Reviews
  validator:
    $jsonSchema:
      bsonType: object
      required: [productId]
"#;
        let spec = SchemaSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.engine(), Engine::Mongo);
        assert_eq!(spec.category(), MigrationCategory::Seed);
        assert_eq!(spec.slug(), "product_reviews");
        assert_eq!(spec.namespace().key(), "mongo-product/seed");
        assert!(spec.collection.unwrap().validator.unwrap().contains_key("$jsonSchema"));
    }

    #[test]
    fn test_unknown_engine_is_rejected() {
        let yaml = "database:\n  type: mysql\n  name: app\n";
        assert!(SchemaSpec::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_validate_rejects_table_without_columns() {
        let yaml = "database:\n  type: postgres\n  name: app\ntable:\n  name: users\n  columns: []\n";
        let spec = SchemaSpec::from_yaml(yaml).unwrap();
        assert!(matches!(spec.validate(), Err(CoreError::Validation { .. })));
    }

    #[test]
    fn test_validate_accepts_only_check_constraints() {
        let base = "database:\n  type: postgres\n  name: app\ntable:\n  name: orders\n  columns:\n    - name: total\n      type: numeric\n  constraints:\n";

        let check = format!("{}    - type: CHECK\n      expression: total >= 0\n", base);
        assert!(SchemaSpec::from_yaml(&check).unwrap().validate().is_ok());

        let implicit = format!("{}    - expression: total >= 0\n", base);
        let spec = SchemaSpec::from_yaml(&implicit).unwrap();
        assert_eq!(spec.table.as_ref().unwrap().constraints[0].kind, CHECK_CONSTRAINT);
        assert!(spec.validate().is_ok());

        let exclude = format!("{}    - type: exclude\n      expression: total WITH =\n", base);
        let err = SchemaSpec::from_yaml(&exclude).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("unsupported constraint type 'exclude'"));
    }

    #[test]
    fn test_default_literal_is_verbatim() {
        let column = ColumnSpec {
            name: "created_at".to_string(),
            column_type: "timestamptz".to_string(),
            primary_key: false,
            not_null: true,
            unique: false,
            default: Some(Value::String("now()".to_string())),
        };
        assert_eq!(column.default_literal().as_deref(), Some("now()"));
    }
}
