//! Records: values that can produce one table row

use serde_json::{Map, Value};

/// Column name to value mapping for one row
pub type Row = Map<String, Value>;

/// A record boxed for transport through a stream
pub type BoxedRecord = Box<dyn Record>;

/// A row produced by [`Record::save`]
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRow {
    pub values: Row,
    /// Optional id the warehouse may use to deduplicate retried inserts
    pub insert_id: Option<String>,
}

impl SavedRow {
    pub fn new(values: Row) -> Self {
        Self {
            values,
            insert_id: None,
        }
    }
}

/// Error raised when a record cannot produce its row
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to save record: {0}")]
pub struct RecordError(pub String);

impl RecordError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A value that knows how to produce its own row
///
/// Records are opaque to the sink; it only ever calls [`Record::save`]
/// when the owning batch is written.
pub trait Record: Send + Sync + 'static {
    fn save(&self) -> Result<SavedRow, RecordError>;
}

impl Record for Row {
    fn save(&self) -> Result<SavedRow, RecordError> {
        Ok(SavedRow::new(self.clone()))
    }
}

impl Record for SavedRow {
    fn save(&self) -> Result<SavedRow, RecordError> {
        Ok(self.clone())
    }
}

/// Record backed by a JSON object
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRecord {
    row: SavedRow,
}

impl JsonRecord {
    /// Wrap a JSON value; only objects make valid rows
    pub fn new(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(values) => Ok(Self {
                row: SavedRow::new(values),
            }),
            other => Err(RecordError::new(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Parse one JSON document
    pub fn parse(text: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(text).map_err(|e| RecordError::new(e.to_string()))?;
        Self::new(value)
    }

    pub fn with_insert_id(mut self, insert_id: impl Into<String>) -> Self {
        self.row.insert_id = Some(insert_id.into());
        self
    }

    pub fn values(&self) -> &Row {
        &self.row.values
    }
}

impl Record for JsonRecord {
    fn save(&self) -> Result<SavedRow, RecordError> {
        Ok(self.row.clone())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
