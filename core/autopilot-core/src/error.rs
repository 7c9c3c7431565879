//! Error types for autopilot-core operations.
//!
//! Nothing in the controller is allowed to surface as an unhandled fault;
//! callers in the hook binary map every error into a well-formed decision.
//! External-command failures are not errors at all - they come back as
//! structured results from the executor.

/// All errors that can occur in engine operations.
#[derive(Debug, thiserror::Error)]
pub enum AutoError {
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Git operation failed: git {operation}: {details}")]
    Git { operation: String, details: String },
}

/// Convenience type alias for Results using AutoError.
pub type Result<T> = std::result::Result<T, AutoError>;
