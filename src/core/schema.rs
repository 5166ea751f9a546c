//! Purpose: Per-table record schemas and the registry that looks them up by table name.
//! Exports: `FieldType`, `FieldDef`, `Schema`, `SchemaRegistry`.
//! Role: Optional typing layer over raw tables; absence means "no validation available".
//! Invariants: Zero or one schema per table name; later registrations replace earlier ones.
//! Invariants: Schema files are JSON objects of table name to field list.
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::core::error::{Error, ErrorKind};
use crate::core::validate::{NoopValidator, Validator};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Float,
    Boolean,
    Text,
    #[serde(alias = "date")]
    DateTime,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Text => "text",
            FieldType::DateTime => "datetime",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl FieldDef {
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }
}

#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, table: impl Into<String>, schema: Schema) -> Self {
        self.register(table, schema);
        self
    }

    pub fn register(&mut self, table: impl Into<String>, schema: Schema) {
        self.schemas.insert(table.into(), schema);
    }

    /// Adds every schema from `other`, replacing same-named tables.
    pub fn merge(&mut self, other: SchemaRegistry) {
        self.schemas.extend(other.schemas);
    }

    pub fn schema_for(&self, table: &str) -> Option<&Schema> {
        self.schemas.get(table)
    }

    pub fn has_schema(&self, table: &str) -> bool {
        self.schemas.contains_key(table)
    }

    /// Registered schema for `table`, or a validator that accepts everything.
    pub fn validator_for(&self, table: &str) -> &dyn Validator {
        match self.schemas.get(table) {
            Some(schema) => schema,
            None => &NoopValidator,
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        let raw: BTreeMap<String, Vec<FieldDef>> = serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid schema file")
                .with_hint(
                    "Expected {\"Table\": [{\"name\": \"Col\", \"type\": \"integer\", \"required\": true}]}.",
                )
                .with_source(err)
        })?;
        let schemas = raw
            .into_iter()
            .map(|(table, fields)| (table, Schema::new(fields)))
            .collect();
        Ok(Self { schemas })
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            let kind = if err.kind() == std::io::ErrorKind::NotFound {
                ErrorKind::NotFound
            } else {
                ErrorKind::Io
            };
            Error::new(kind)
                .with_message("failed to read schema file")
                .with_path(path)
                .with_source(err)
        })?;
        Self::from_json_str(&text).map_err(|err| err.with_path(path))
    }
}
