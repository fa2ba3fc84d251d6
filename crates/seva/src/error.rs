use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug)]
pub enum SevaError {
    /// Carries the id as it was requested, which may not even be numeric.
    NotFound(String),
    InvalidCoordinate { field: String, value: String },
    /// A `status` key whose value is not a string, `null` included.
    InvalidStatus(String),
    Internal(String),
}

impl fmt::Display for SevaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SevaError::NotFound(_) => write!(f, "Issue not found"),
            SevaError::InvalidCoordinate { field, value } => {
                write!(f, "invalid {field}: {value} is not a number")
            }
            SevaError::InvalidStatus(value) => {
                write!(f, "invalid status: {value} is not a string")
            }
            SevaError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for SevaError {}

impl SevaError {
    pub fn code(&self) -> &'static str {
        match self {
            SevaError::NotFound(_) => "not_found",
            SevaError::InvalidCoordinate { .. } => "invalid_coordinate",
            SevaError::InvalidStatus(_) => "invalid_status",
            SevaError::Internal(_) => "internal",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&SevaError> for ErrorResponse {
    fn from(err: &SevaError) -> Self {
        ErrorResponse {
            error: err.to_string(),
            code: Some(err.code().to_string()),
        }
    }
}
