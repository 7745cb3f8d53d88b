//! Error types for resources.

use oxide_rest_client::ClientError;
use serde_json::Value;
use thiserror::Error;

use crate::fields::FieldError;
use crate::pattern::PatternError;

/// Resource-level errors.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A URL did not match its pattern, or a pattern parameter was missing.
    #[error(transparent)]
    Addressing(#[from] PatternError),

    /// A field rejected a value.
    #[error("field {field}: {source}")]
    Field {
        field: String,
        #[source]
        source: FieldError,
    },

    /// Assignment to a field declared non-editable.
    #[error("{field} is not editable")]
    NotEditable { field: String },

    /// The resource declares no field with this name.
    #[error("resource {resource} has no field {field}")]
    UnknownField { resource: String, field: String },

    /// The server rejected a write with 400.
    #[error("cannot {operation} {uri} ({status}): {body}")]
    Validation {
        operation: &'static str,
        uri: String,
        status: u16,
        body: Value,
    },

    /// The server answered with a status outside the accepted set.
    #[error("cannot {operation} {uri} ({status}): {body}")]
    Server {
        operation: &'static str,
        uri: String,
        status: u16,
        body: Value,
    },

    /// The server answered with a body of the wrong shape.
    #[error("unexpected content from {uri}: {reason}")]
    UnexpectedContent { uri: String, reason: String },

    /// The resource type is misconfigured.
    #[error("improperly configured: {0}")]
    Configuration(String),

    /// The instance has no absolute URL yet.
    #[error("{resource} instance has not been saved")]
    NotPersisted { resource: String },

    /// An index past the end of a query.
    #[error("index {index} out of range for query of {count} items")]
    IndexOutOfRange { index: usize, count: usize },

    /// A slice that is empty, inverted, or extends past the end of a query.
    #[error("invalid slice {start}..{stop} (step {step}) for query of {count} items")]
    InvalidSlice {
        start: usize,
        stop: usize,
        step: usize,
        count: usize,
    },

    /// The transport failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl ResourceError {
    /// Returns the parsed server body for validation and server errors.
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Validation { body, .. } | Self::Server { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns the HTTP status for validation and server errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for resource operations.
pub type Result<T> = std::result::Result<T, ResourceError>;
