//! Error types for the TaskShare client.

use thiserror::Error;

/// A shared error type for the entire TaskShare client.
///
/// Local variants (`Validation`, `AuthRequired`, `ProtectedEntity`,
/// `OrderMismatch`, `NotOwner`, `SwapInProgress`) are raised before any
/// network call. `Conflict` and `Transport` come back from the server or the
/// push channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskShareError {
    /// Rejected input (empty or over-length title, invalid category name, ...)
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// No authentication token is held by the session
    #[error("Not logged in")]
    AuthRequired,

    /// The server rejected the operation
    #[error("Rejected by server: {0}")]
    Conflict(String),

    /// Attempt to edit or delete a reserved entity
    #[error("{entity_type} '{id}' is protected and cannot be changed")]
    ProtectedEntity {
        entity_type: &'static str,
        id: String,
    },

    /// Reorder target ids not found, not adjacent, or not a permutation
    #[error("Order mismatch: {0}")]
    OrderMismatch(String),

    /// Only the owner of a task may perform this operation
    #[error("Task {task_id} is shared with you and can only be changed by its owner")]
    NotOwner { task_id: i64 },

    /// A swap is already waiting for server confirmation
    #[error("Another reorder is still in progress")]
    SwapInProgress,

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A response arrived for a session that has since been torn down
    #[error("Session ended before the response arrived")]
    StaleSession,

    /// Push channel or HTTP transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },
}

impl TaskShareError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Creates a ProtectedEntity error
    pub fn protected(entity_type: &'static str, id: impl ToString) -> Self {
        Self::ProtectedEntity {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates an OrderMismatch error
    pub fn order_mismatch(message: impl Into<String>) -> Self {
        Self::OrderMismatch(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Self::ProtectedEntity { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true for errors detected without contacting the server.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::AuthRequired
                | Self::ProtectedEntity { .. }
                | Self::OrderMismatch(_)
                | Self::NotOwner { .. }
                | Self::SwapInProgress
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for TaskShareError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for TaskShareError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for TaskShareError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, TaskShareError>`.
pub type Result<T> = std::result::Result<T, TaskShareError>;
