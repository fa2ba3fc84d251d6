use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::SevaError;

/// Filter value that disables the status and date stages of a listing.
pub const ALL: &str = "All";

/// Status every issue starts in.
pub const INITIAL_STATUS: &str = "Reported";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub lat: f64,
    pub lng: f64,
    pub photo: String,
    pub date: NaiveDate,
    pub history: Vec<String>,
}

/// Payload accepted by the create operation. Every field is optional.
///
/// Text fields that arrive as anything other than a JSON string fall back to
/// the empty string. Coordinates are kept raw until [`coerce_coordinate`]
/// runs so that the store decides how they are interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateIssueParams {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub photo: String,
}

/// Body of a successful create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub message: String,
    pub issue: Issue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilters {
    #[serde(default = "all")]
    pub status: String,
    #[serde(default = "all")]
    pub date: String,
    #[serde(default)]
    pub search: String,
}

impl Default for ListFilters {
    fn default() -> Self {
        ListFilters {
            status: all(),
            date: all(),
            search: String::new(),
        }
    }
}

fn all() -> String {
    ALL.to_string()
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// Turns a raw coordinate into a float.
///
/// Missing and falsy values (`null`, `false`, `0`, `""`, `[]`, `{}`) become
/// `0.0`. Strings are trimmed and parsed; `true` counts as `1.0`. NaN and
/// infinities are rejected since JSON cannot carry them back out.
pub fn coerce_coordinate(field: &str, value: Option<&Value>) -> Result<f64, SevaError> {
    let Some(value) = value else {
        return Ok(0.0);
    };
    let invalid = || SevaError::InvalidCoordinate {
        field: field.to_string(),
        value: value.to_string(),
    };

    match value {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n
            .as_f64()
            .map(|f| if f == 0.0 { 0.0 } else { f })
            .ok_or_else(invalid),
        Value::String(s) if s.is_empty() => Ok(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(invalid),
        Value::Array(items) if items.is_empty() => Ok(0.0),
        Value::Object(map) if map.is_empty() => Ok(0.0),
        Value::Array(_) | Value::Object(_) => Err(invalid()),
    }
}
