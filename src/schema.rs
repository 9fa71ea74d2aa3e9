//! Table schema for cublet ingestion
//!
//! A schema is an ordered list of fields. Every input record must carry one
//! string value per field, in schema order. The schema also designates the
//! user-key field that drives the chunk-boundary continuity rule.

use serde::{Deserialize, Serialize};

use crate::error::{CubeError, Result};

/// Field type of one schema column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Dictionary-encoded column used as the chunk-boundary continuity key
    UserKey,
    /// Dictionary-encoded categorical column
    Text,
    /// Signed 32-bit numeric column with min/max statistics
    Metric,
}

impl FieldType {
    /// On-disk tag for the metachunk footer
    pub(crate) fn tag(self) -> u32 {
        match self {
            FieldType::UserKey => 0,
            FieldType::Text => 1,
            FieldType::Metric => 2,
        }
    }

    pub(crate) fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(FieldType::UserKey),
            1 => Some(FieldType::Text),
            2 => Some(FieldType::Metric),
            _ => None,
        }
    }
}

/// One schema column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    /// Column name
    pub name: String,
    /// Column type
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered table schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Columns in record order
    pub fields: Vec<Field>,
}

impl Schema {
    /// Build a schema from a field list
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Load a schema from its JSON document representation
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: Schema = serde_json::from_str(json)
            .map_err(|e| CubeError::Config(format!("invalid schema document: {}", e)))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Number of columns; every record must carry exactly this many values
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Index of the declared user-key column, if any
    pub fn user_key_index(&self) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.field_type == FieldType::UserKey)
    }

    /// Validate the schema shape
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(CubeError::Config("schema has no fields".to_string()));
        }
        let user_keys = self
            .fields
            .iter()
            .filter(|f| f.field_type == FieldType::UserKey)
            .count();
        if user_keys > 1 {
            return Err(CubeError::Config(format!(
                "schema declares {} user-key fields, at most one is allowed",
                user_keys
            )));
        }
        Ok(())
    }

    /// Validate one record against the schema without mutating anything.
    ///
    /// Checks arity and that every metric value parses as an i32, so the
    /// downstream metachunk/chunk updates cannot fail mid-record.
    pub fn validate_record(&self, record: &[&str]) -> Result<()> {
        if record.len() != self.fields.len() {
            return Err(CubeError::MalformedRecord(format!(
                "expected {} fields, got {}",
                self.fields.len(),
                record.len()
            )));
        }
        for (field, value) in self.fields.iter().zip(record) {
            if field.field_type == FieldType::Metric && value.parse::<i32>().is_err() {
                return Err(CubeError::MalformedRecord(format!(
                    "field '{}': '{}' is not a valid 32-bit integer",
                    field.name, value
                )));
            }
        }
        Ok(())
    }
}
