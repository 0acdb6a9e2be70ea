//! # Telemetry Document
//!
//! An ordered, capacity-bounded field map decoded from the JSON payload of one inbound
//! radio frame, plus the four link metadata fields the driver appends (`address`,
//! `length`, `rssi`, `snr`).
//!
//! The document is produced by value for each frame and handed to the report pipeline;
//! nothing keeps it past one gateway step.
//!
//! ```rust
//! use lorabridge::telemetry::{TelemetryDocument, TelemetryValue};
//!
//! let doc = TelemetryDocument::from_json(r#"{"distance":8123,"battery":3.41}"#).unwrap();
//! assert_eq!(doc.get("distance"), Some(&TelemetryValue::Integer(8123)));
//! assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["distance", "battery"]);
//! ```

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Upper bound on fields per document, metadata included.
pub const MAX_FIELDS: usize = 32;

/// Reserved metadata field names merged after decode.
pub const FIELD_ADDRESS: &str = "address";
pub const FIELD_LENGTH: &str = "length";
pub const FIELD_RSSI: &str = "rssi";
pub const FIELD_SNR: &str = "snr";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("document exceeds {max} fields")]
    CapacityExceeded { max: usize },
}

/// One decoded telemetry value.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl TelemetryValue {
    fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => TelemetryValue::Text(s),
            Value::Bool(b) => TelemetryValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => TelemetryValue::Integer(i),
                None => TelemetryValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            // Nested values and null are kept as their compact JSON text.
            other => TelemetryValue::Text(other.to_string()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            TelemetryValue::Text(s) => Value::String(s.clone()),
            TelemetryValue::Integer(i) => Value::from(*i),
            TelemetryValue::Float(f) => Value::from(*f),
            TelemetryValue::Bool(b) => Value::Bool(*b),
        }
    }
}

impl From<i64> for TelemetryValue {
    fn from(v: i64) -> Self {
        TelemetryValue::Integer(v)
    }
}

impl From<f64> for TelemetryValue {
    fn from(v: f64) -> Self {
        TelemetryValue::Float(v)
    }
}

impl From<bool> for TelemetryValue {
    fn from(v: bool) -> Self {
        TelemetryValue::Bool(v)
    }
}

impl From<&str> for TelemetryValue {
    fn from(v: &str) -> Self {
        TelemetryValue::Text(v.to_string())
    }
}

/// Ordered field-name to value map with a fixed field capacity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryDocument {
    fields: Vec<(String, TelemetryValue)>,
}

impl TelemetryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a JSON object, keeping the key order of the source text.
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(map) = value else {
            return Err(DocumentError::NotAnObject);
        };
        if map.len() > MAX_FIELDS {
            return Err(DocumentError::CapacityExceeded { max: MAX_FIELDS });
        }
        let fields = map
            .into_iter()
            .map(|(k, v)| (k, TelemetryValue::from_json(v)))
            .collect();
        Ok(Self { fields })
    }

    /// Insert a field, replacing an existing value in place or appending a new one.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<TelemetryValue>,
    ) -> Result<(), DocumentError> {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
            return Ok(());
        }
        if self.fields.len() >= MAX_FIELDS {
            return Err(DocumentError::CapacityExceeded { max: MAX_FIELDS });
        }
        self.fields.push((name, value));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TelemetryValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TelemetryValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The originating radio address, if the document carries a usable one.
    pub fn address(&self) -> Option<u16> {
        match self.get(FIELD_ADDRESS)? {
            TelemetryValue::Integer(i) => u16::try_from(*i).ok(),
            TelemetryValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Compact JSON rendering in document order, used for console echo.
    pub fn to_json_string(&self) -> String {
        let map: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map).to_string()
    }
}

impl fmt::Display for TelemetryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_string())
    }
}
