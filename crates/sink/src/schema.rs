//! Table schemas and write dispositions
//!
//! A [`Schema`] is authored by producer code and is read-only to the sink.
//! It names the target table, lists its fields, and fixes the
//! [`Disposition`] that selects the stream's write strategy.

use serde::{Deserialize, Serialize};

/// How a flush treats the target table's existing content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Rows are added to whatever the table already holds
    #[default]
    Append,
    /// Each completed cycle replaces the table's content
    Truncate,
    /// Only valid for tables that start out empty (temporary tables)
    Empty,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Truncate => "truncate",
            Self::Empty => "empty",
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Numeric,
    Boolean,
    /// Absolute instant, stored in UTC
    Timestamp,
    /// Civil date and time without a zone
    DateTime,
    Date,
    /// Time of day
    Time,
    Bytes,
    Json,
}

/// One column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl FieldSchema {
    /// Optional (nullable) field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            description: String::new(),
        }
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Descriptor of a target table
///
/// # Example
///
/// ```
/// use tablesink::{Disposition, FieldSchema, FieldType, Schema};
///
/// let schema = Schema::new("orders", Disposition::Append)
///     .with_field(FieldSchema::new("id", FieldType::String).required())
///     .with_field(FieldSchema::new("amount", FieldType::Float));
/// assert_eq!(schema.fields.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Table name inside the configured database
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub fields: Vec<FieldSchema>,

    #[serde(default)]
    pub disposition: Disposition,
}

impl Schema {
    pub fn new(name: impl Into<String>, disposition: Disposition) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            fields: Vec::new(),
            disposition,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldSchema>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod schema_test;
