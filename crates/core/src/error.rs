//! Error types for the ragcall domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; none of them is allowed to
//! escape into a live call session.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all ragcall operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Knowledge base errors ---
    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Why the knowledge base could not be made available.
///
/// `Missing`, `TooSmall` and `Placeholder` are configuration problems;
/// `Io` and `IndexBuild` are initialization failures. The loader treats all
/// of them the same way: no index, every turn is classified unavailable.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Knowledge source not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Knowledge source {} is too small ({size} bytes, need at least {min})", .path.display())]
    TooSmall { path: PathBuf, size: u64, min: u64 },

    #[error("Knowledge source {} still contains placeholder content", .0.display())]
    Placeholder(PathBuf),

    #[error("I/O error on {}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },

    #[error("Index construction failed: {0}")]
    IndexBuild(String),
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Retrieval timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Retrieval worker aborted: {0}")]
    WorkerAborted(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport not started")]
    NotStarted,

    #[error("Transport already started")]
    AlreadyStarted,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Session closed: {0}")]
    Closed(String),

    #[error("Reply generation failed: {0}")]
    ReplyFailed(String),
}

impl From<ProviderError> for RetrievalError {
    fn from(err: ProviderError) -> Self {
        RetrievalError::QueryFailed(err.to_string())
    }
}
