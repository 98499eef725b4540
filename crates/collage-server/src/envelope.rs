//! JSON response envelopes
//!
//! Every response body is one of:
//! - `{"message": "Success", "result": ..., "warnings"?: ...}`
//! - `{"message": "Error", "error": {"kind", "detail", "orphaned"?}}`
//! - `{"message": "Method not allowed"}` / `{"message": "Not found"}`

use collage_core::{CleanupPartialFailure, CollageError};
use collage_store::{ArtifactId, StoreError};
use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};

/// `message` of every successful envelope
pub const SUCCESS: &str = "Success";
/// `message` of every error envelope
pub const ERROR: &str = "Error";

/// Successful response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    pub message: String,
    pub result: T,
    /// Cleanup deletes that failed after a valid composite was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<CleanupPartialFailure>,
}

impl<T> SuccessEnvelope<T> {
    #[must_use]
    pub fn new(result: T) -> Self {
        Self {
            message: SUCCESS.to_string(),
            result,
            warnings: None,
        }
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: Option<CleanupPartialFailure>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable class
    pub kind: String,
    /// Human-readable cause
    pub detail: String,
    /// Artifacts the failed request left in the store
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orphaned: Vec<ArtifactId>,
}

impl ErrorBody {
    #[must_use]
    pub fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
            orphaned: Vec::new(),
        }
    }
}

impl From<&CollageError> for ErrorBody {
    fn from(err: &CollageError) -> Self {
        Self {
            kind: err.kind().to_string(),
            detail: err.to_string(),
            orphaned: err.orphaned().to_vec(),
        }
    }
}

impl From<&StoreError> for ErrorBody {
    fn from(err: &StoreError) -> Self {
        Self::new("store", err.to_string())
    }
}

/// Failed response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(error: ErrorBody) -> Self {
        Self {
            message: ERROR.to_string(),
            error,
        }
    }
}

/// Bare status message (routing failures)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message: String,
}

pub(crate) fn success<T: Serialize>(
    status: StatusCode,
    envelope: &SuccessEnvelope<T>,
) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(envelope), status)
}

pub(crate) fn failure(status: StatusCode, error: ErrorBody) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(&ErrorEnvelope::new(error)), status)
}

pub(crate) fn message(status: StatusCode, message: &str) -> WithStatus<Json> {
    let body = MessageEnvelope {
        message: message.to_string(),
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}
