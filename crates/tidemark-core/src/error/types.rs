//! Core error types for Tidemark

use thiserror::Error;

/// Result type alias for Tidemark operations
pub type TidemarkResult<T> = Result<T, TidemarkError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<C: std::fmt::Display>(self, context: C) -> TidemarkResult<T>;

    /// Add context lazily (only evaluated on error)
    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> TidemarkResult<T>;
}

impl<T> ResultExt<T> for TidemarkResult<T> {
    fn context<C: std::fmt::Display>(self, context: C) -> TidemarkResult<T> {
        self.map_err(|e| e.with_context(context.to_string()))
    }

    fn with_context<C: std::fmt::Display, F: FnOnce() -> C>(self, f: F) -> TidemarkResult<T> {
        self.map_err(|e| e.with_context(f().to_string()))
    }
}

/// Main error type for Tidemark
///
/// Every variant carries an optional `context` describing the operation that
/// failed, so callers can report a specific reason rather than a generic one.
#[derive(Error, Debug, Clone)]
pub enum TidemarkError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
        context: Option<String>,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        context: Option<String>,
    },

    /// Invalid input errors, including rejected invariant violations
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
        context: Option<String>,
    },

    /// Storage/persistence errors
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        context: Option<String>,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        resource_type: Option<String>,
        context: Option<String>,
    },

    /// File watcher errors
    #[error("Watch error: {message}")]
    Watch {
        message: String,
        context: Option<String>,
    },

    /// Generic error with context
    #[error("Error: {message}")]
    Other {
        message: String,
        context: Option<String>,
    },
}

impl TidemarkError {
    /// Error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "TIDEMARK_CONFIG",
            Self::Io { .. } => "TIDEMARK_IO",
            Self::Json { .. } => "TIDEMARK_JSON",
            Self::InvalidInput { .. } => "TIDEMARK_INVALID_INPUT",
            Self::Storage { .. } => "TIDEMARK_STORAGE",
            Self::NotFound { .. } => "TIDEMARK_NOT_FOUND",
            Self::Watch { .. } => "TIDEMARK_WATCH",
            Self::Other { .. } => "TIDEMARK_OTHER",
        }
    }

    /// Context attached to the error, if any
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Config { context, .. }
            | Self::Io { context, .. }
            | Self::Json { context, .. }
            | Self::InvalidInput { context, .. }
            | Self::Storage { context, .. }
            | Self::NotFound { context, .. }
            | Self::Watch { context, .. }
            | Self::Other { context, .. } => context.as_deref(),
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an invalid-input error
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }

    /// Resource type of a not-found error
    pub fn resource_type(&self) -> Option<&str> {
        match self {
            Self::NotFound { resource_type, .. } => resource_type.as_deref(),
            _ => None,
        }
    }
}
