//! Error types for the document Q&A system

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for document Q&A operations
pub type Result<T> = std::result::Result<T, Error>;

/// Document Q&A errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// API keys were not supplied (or were blank)
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Document parsing failed (corrupt file, parser outage)
    #[error("Failed to parse file '{filename}': {message}")]
    Parse { filename: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Embedding call failed
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Query or chunk embeddings do not match the collection's embedding space
    #[error("Embedding mismatch: {0}")]
    EmbeddingMismatch(String),

    /// LLM call failed
    #[error("LLM error: {0}")]
    Llm(String),

    /// Upstream service answered with a non-success status
    #[error("{service} returned HTTP {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Vector store error
    #[error("Vector database error: {0}")]
    VectorDb(String),

    /// Named collection does not exist
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// No document has been processed for this session
    #[error("No document has been processed yet")]
    NoActiveDocument,

    /// Unknown or expired session
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Blank question submitted
    #[error("Question is empty")]
    EmptyQuestion,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a parse error
    pub fn parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether retrying the same call could succeed.
    ///
    /// Timeouts, connection failures, 429 and 5xx responses are transient;
    /// everything else (bad keys, malformed input, local failures) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err
                        .status()
                        .map(|s| s.as_u16() == 429 || s.is_server_error())
                        .unwrap_or(false)
            }
            Error::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::VectorDb(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::BAD_REQUEST, "config_error", msg.clone()),
            Error::MissingCredentials(msg) => {
                (StatusCode::UNAUTHORIZED, "missing_credentials", msg.clone())
            }
            Error::Parse { filename, message } => (
                StatusCode::BAD_REQUEST,
                "parse_error",
                format!("Failed to parse '{}': {}", filename, message),
            ),
            Error::UnsupportedFileType(ext) => (
                StatusCode::BAD_REQUEST,
                "unsupported_type",
                format!("Unsupported file type: {}", ext),
            ),
            Error::Embedding(msg) => (StatusCode::BAD_GATEWAY, "embedding_error", msg.clone()),
            Error::EmbeddingMismatch(msg) => {
                (StatusCode::CONFLICT, "embedding_mismatch", msg.clone())
            }
            Error::Llm(msg) => (StatusCode::SERVICE_UNAVAILABLE, "llm_error", msg.clone()),
            Error::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream_error", self.to_string()),
            Error::VectorDb(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "vector_db_error", msg.clone())
            }
            Error::CollectionNotFound(name) => (
                StatusCode::NOT_FOUND,
                "collection_not_found",
                format!("Collection not found: {}", name),
            ),
            Error::NoActiveDocument => (
                StatusCode::CONFLICT,
                "no_active_document",
                "Upload a PDF document before asking questions".to_string(),
            ),
            Error::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                "session_not_found",
                format!("Session not found: {}", id),
            ),
            Error::EmptyQuestion => (
                StatusCode::BAD_REQUEST,
                "empty_question",
                "Question is empty".to_string(),
            ),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
