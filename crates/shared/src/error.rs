use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the analysis service on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub detail: String,
}

impl ApiError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// A 2xx analysis payload that could not be turned into a usable result.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not JSON: {0}")]
    NotJson(#[source] serde_json::Error),
    #[error("payload is not a valid {kind} result: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("field `{field}` is not a finite number")]
    NonFinite { field: String },
    #[error("field `{field}` is out of range: {value}")]
    OutOfRange { field: String, value: f64 },
}
