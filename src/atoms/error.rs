// ── Memorai Atoms: Error Types ─────────────────────────────────────────────
// Single canonical error enum for the engine, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by failure class (validation, store, DB…).
//   • "Absent" is a successful answer for lookups (Option / bool / empty Vec);
//     `NotFound` is reserved for operations that cannot proceed without it.
//   • Every vector backend failure is folded into `Store`, carrying the
//     operation name and the backend's message (or "Unknown error").
//   • `EngineError` → `String` is provided so CLI / protocol boundaries can
//     render a structured failure without boilerplate.

use thiserror::Error;

/// Message used when a backend failure carries no structured error detail.
pub const UNKNOWN_ERROR: &str = "Unknown error";

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, rejected before any side effect.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A record required for the operation does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Vector backend failure (init / upsert / search / delete / count …).
    #[error("Vector store error during {operation}: {message}")]
    Store { operation: String, message: String },

    /// Embedding / classification provider failure.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// SQLite / rusqlite database failure.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine configuration is invalid or unreadable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catch-all for errors that do not yet have a dedicated variant.
    /// Prefer adding a specific variant over using this in new code.
    #[error("{0}")]
    Other(String),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Wrap a vector backend failure whose cause is known.
    pub fn store(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        let message = cause.to_string();
        Self::Store {
            operation: operation.into(),
            message: if message.trim().is_empty() { UNKNOWN_ERROR.to_string() } else { message },
        }
    }

    /// Wrap a vector backend failure that carried no structured detail.
    pub fn store_unknown(operation: impl Into<String>) -> Self {
        Self::Store { operation: operation.into(), message: UNKNOWN_ERROR.to_string() }
    }

    /// True for input-shape failures (never retried, never logged as errors).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Other(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Other(s.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(e: toml::de::Error) -> Self {
        EngineError::Config(e.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations return this type.
pub type EngineResult<T> = Result<T, EngineError>;

// ── Conversion: EngineError → String ──────────────────────────────────────

impl From<EngineError> for String {
    fn from(e: EngineError) -> Self {
        e.to_string()
    }
}
