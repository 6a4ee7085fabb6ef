//! Array output formats applied to structured values on read

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// How arrays and objects are handed back from a single-key read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayFormat {
    /// Keep the structured value as-is (default)
    #[default]
    Json,
    /// Join element values with `,` into one string
    ///
    /// Lossy: object keys are dropped and nested structures are flattened to
    /// their JSON text.
    Csv,
    /// Render the structure as a YAML document string
    ///
    /// Read it back with [`deserialize_blob`].
    Serialize,
}

impl ArrayFormat {
    /// Config name of the format
    pub fn as_str(&self) -> &'static str {
        match self {
            ArrayFormat::Json => "json",
            ArrayFormat::Csv => "csv",
            ArrayFormat::Serialize => "serialize",
        }
    }
}

impl fmt::Display for ArrayFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArrayFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ArrayFormat::Json),
            "csv" => Ok(ArrayFormat::Csv),
            "serialize" => Ok(ArrayFormat::Serialize),
            other => Err(Error::Config(format!(
                "Unknown array format '{other}': expected json, csv or serialize"
            ))),
        }
    }
}

/// Render a value in the given format
///
/// Scalars pass through untouched; only arrays and objects are rendered.
pub fn render(value: Value, format: ArrayFormat) -> Result<Value> {
    if !is_structured(&value) {
        return Ok(value);
    }

    match format {
        ArrayFormat::Json => Ok(value),
        ArrayFormat::Csv => Ok(Value::String(join_csv(&value))),
        ArrayFormat::Serialize => Ok(Value::String(serde_yaml::to_string(&value)?)),
    }
}

/// Read back a blob produced by [`ArrayFormat::Serialize`]
pub fn deserialize_blob(blob: &str) -> Result<Value> {
    Ok(serde_yaml::from_str(blob)?)
}

pub(crate) fn is_structured(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

fn join_csv(value: &Value) -> String {
    let cells: Vec<String> = match value {
        Value::Array(items) => items.iter().map(csv_cell).collect(),
        Value::Object(map) => map.values().map(csv_cell).collect(),
        other => vec![csv_cell(other)],
    };
    cells.join(",")
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
