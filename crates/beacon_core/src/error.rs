//! Core error types for BEACON.

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A qualified or unqualified name could not be parsed
    #[error("Invalid name '{name}': {reason}")]
    InvalidName {
        /// The offending text
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Unknown resource kind (block type)
    #[error("Unknown resource kind: {0}")]
    UnknownKind(String),

    /// Validation error
    #[error("Validation failed for {field}: {reason}")]
    Validation {
        /// Field or subject that failed validation
        field: String,
        /// Reason for the failure
        reason: String,
    },

    /// Not found
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of the missing entity
        kind: String,
        /// Identifier that was looked up
        id: String,
    },
}
