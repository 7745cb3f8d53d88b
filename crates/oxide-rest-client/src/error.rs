//! Error types for the transport layer.

use thiserror::Error;

/// Transport-level errors.
///
/// These never carry HTTP status semantics: a 404 or a 500 is a successful
/// round trip as far as the client is concerned. Interpreting statuses is the
/// job of the resource layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying HTTP library failed (connection, TLS, timeout, ...).
    #[error("transport error for {method} {uri}: {source}")]
    Transport {
        method: String,
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("cannot build HTTP client: {0}")]
    Build(#[from] reqwest::Error),

    /// A URI could not be parsed or joined onto the root URI.
    #[error("invalid uri {uri}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    /// A request body could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The mock client has no canned response for this request.
    #[error("no canned response for {method} {uri}")]
    Unmatched { method: String, uri: String },
}

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, ClientError>;
