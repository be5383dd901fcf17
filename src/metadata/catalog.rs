//! Catalog types and lookups

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::Operator;

/// Declared type of a field, used for value coercion and editor hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Date,
    /// Text restricted to a list of values
    Select,
}

impl FieldType {
    /// Operators offered when a field does not list its own
    pub fn default_operators(&self) -> &'static [Operator] {
        use Operator::*;
        match self {
            FieldType::Text => &[
                Eq,
                Ne,
                Contains,
                BeginsWith,
                EndsWith,
                DoesNotContain,
                DoesNotBeginWith,
                DoesNotEndWith,
                Null,
                NotNull,
                In,
                NotIn,
            ],
            FieldType::Number | FieldType::Date => {
                &[Eq, Ne, Lt, Lte, Gt, Gte, Between, Null, NotNull, In, NotIn]
            }
            FieldType::Boolean => &[Eq, Ne, Null, NotNull],
            FieldType::Select => &[Eq, Ne, In, NotIn, Null, NotNull],
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Number => write!(f, "number"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Date => write!(f, "date"),
            FieldType::Select => write!(f, "select"),
        }
    }
}

/// One queryable column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    /// Column name in the database
    pub name: String,
    /// Human-readable label
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Allowed operators; `None` means the type's defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operators: Option<Vec<Operator>>,
    /// Choices for `select` fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_editor_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
}

impl FieldMetadata {
    /// Create a field with the given name, label and type
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            operators: None,
            values: None,
            input_type: None,
            value_editor_type: None,
            default_value: None,
        }
    }

    /// Numeric field with a number input
    pub fn number(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldType::Number).input_type("number")
    }

    /// Plain text field
    pub fn text(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldType::Text)
    }

    /// Boolean field rendered as a checkbox, defaulting to `true`
    pub fn boolean(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldType::Boolean)
            .value_editor_type("checkbox")
            .default_value(serde_json::Value::Bool(true))
    }

    /// Builder method: restrict the allowed operators
    pub fn operators(mut self, operators: &[Operator]) -> Self {
        self.operators = Some(operators.to_vec());
        self
    }

    /// Builder method: set the choices of a select field
    pub fn values<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method: set the input type hint
    pub fn input_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    /// Builder method: set the value editor hint
    pub fn value_editor_type(mut self, editor: impl Into<String>) -> Self {
        self.value_editor_type = Some(editor.into());
        self
    }

    /// Builder method: set the default value hint
    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Operators this field accepts
    pub fn allowed_operators(&self) -> &[Operator] {
        match &self.operators {
            Some(ops) => ops,
            None => self.field_type.default_operators(),
        }
    }

    /// Check whether an operator may be applied to this field
    pub fn allows(&self, operator: Operator) -> bool {
        self.allowed_operators().contains(&operator)
    }
}

/// A queryable table and its fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub label: String,
    pub fields: Vec<FieldMetadata>,
}

impl TableMetadata {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            fields: Vec::new(),
        }
    }

    /// Builder method: append a field
    pub fn field(mut self, field: FieldMetadata) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a field by name
    pub fn get_field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Name and label of a table, without its fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub label: String,
}

/// Catalog load and validation errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid catalog: {0}")]
    Invalid(String),
}

/// The set of queryable tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub tables: Vec<TableMetadata>,
}

impl Catalog {
    /// Create a catalog from tables, validating names
    pub fn new(tables: Vec<TableMetadata>) -> Result<Self, CatalogError> {
        let catalog = Self { tables };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from a JSON file shaped like `{"tables": [...]}`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load from a file if one is configured, otherwise use the built-in catalog
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(p) => {
                let catalog = Self::from_file(p)?;
                tracing::info!(path = %p.display(), tables = catalog.tables.len(), "Loaded metadata catalog");
                Ok(catalog)
            }
            None => Ok(Self::sample()),
        }
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Look up a field of a table
    pub fn field(&self, table: &str, field: &str) -> Option<&FieldMetadata> {
        self.table(table).and_then(|t| t.get_field(field))
    }

    /// Table names and labels
    pub fn summaries(&self) -> Vec<TableSummary> {
        self.tables
            .iter()
            .map(|t| TableSummary {
                name: t.name.clone(),
                label: t.label.clone(),
            })
            .collect()
    }

    /// Check that names are identifiers and unique
    pub fn validate(&self) -> Result<(), CatalogError> {
        let ident = regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .map_err(|e| CatalogError::Invalid(format!("identifier pattern: {}", e)))?;

        let mut table_names = HashSet::new();
        for table in &self.tables {
            if !ident.is_match(&table.name) {
                return Err(CatalogError::Invalid(format!("bad table name '{}'", table.name)));
            }
            if !table_names.insert(table.name.as_str()) {
                return Err(CatalogError::Invalid(format!("duplicate table '{}'", table.name)));
            }
            if table.fields.is_empty() {
                return Err(CatalogError::Invalid(format!("table '{}' has no fields", table.name)));
            }

            let mut field_names = HashSet::new();
            for field in &table.fields {
                if !ident.is_match(&field.name) {
                    return Err(CatalogError::Invalid(format!(
                        "bad field name '{}.{}'",
                        table.name, field.name
                    )));
                }
                if !field_names.insert(field.name.as_str()) {
                    return Err(CatalogError::Invalid(format!(
                        "duplicate field '{}.{}'",
                        table.name, field.name
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sample_lookups() {
        let catalog = Catalog::sample();

        assert!(catalog.table("users").is_some());
        assert!(catalog.table("saved_queries").is_none());

        let price = catalog.field("products", "price").unwrap();
        assert_eq!(price.field_type, FieldType::Number);
        assert!(price.allows(Operator::Between));
        assert!(!price.allows(Operator::Contains));

        let names: Vec<String> = catalog.summaries().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["users", "products", "orders", "order_items"]);
    }

    #[test]
    fn test_default_operators_by_type() {
        let field = FieldMetadata::new("created", "Created", FieldType::Date);
        assert!(field.allows(Operator::Between));
        assert!(!field.allows(Operator::Contains));

        let flag = FieldMetadata::new("flag", "Flag", FieldType::Boolean);
        assert!(!flag.allows(Operator::Lt));
    }

    #[test]
    fn test_field_serializes_camel_case() {
        let field = FieldMetadata::boolean("is_active", "Is Active").operators(&[Operator::Eq]);
        let json = serde_json::to_value(&field).unwrap();

        assert_eq!(json["type"], "boolean");
        assert_eq!(json["valueEditorType"], "checkbox");
        assert_eq!(json["defaultValue"], true);
        assert_eq!(json["operators"], serde_json::json!(["="]));
        assert!(json.get("values").is_none());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_names() {
        let dup = Catalog {
            tables: vec![
                TableMetadata::new("t", "T").field(FieldMetadata::text("a", "A")),
                TableMetadata::new("t", "T").field(FieldMetadata::text("a", "A")),
            ],
        };
        assert!(matches!(dup.validate(), Err(CatalogError::Invalid(_))));

        let bad = Catalog {
            tables: vec![TableMetadata::new("t", "T").field(FieldMetadata::text("a; DROP", "A"))],
        };
        assert!(matches!(bad.validate(), Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tables": [{{"name": "events", "label": "Events", "fields": [
                {{"name": "kind", "label": "Kind", "type": "select", "values": ["a", "b"]}},
                {{"name": "at", "label": "At", "type": "date"}}
            ]}}]}}"#
        )
        .unwrap();

        let catalog = Catalog::from_file(file.path()).unwrap();

        let kind = catalog.field("events", "kind").unwrap();
        assert_eq!(kind.field_type, FieldType::Select);
        assert_eq!(kind.values.as_deref(), Some(&["a".to_string(), "b".to_string()][..]));
        assert!(kind.allows(Operator::In));
    }
}
