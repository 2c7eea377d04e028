//! Error types for the capture pipeline.
//!
//! Only the boundary adapters (inference payload parsing, fetchers, the
//! repository) produce errors. Extraction, scoring and adaptation are total
//! over well-typed input and never fail.

/// Errors returned by the pipeline orchestrator.
///
/// Configuration, suggestion and database problems surface through their own
/// types at the boundary that raises them; database failures reach the
/// orchestrator as [`CollaboratorError`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// The task consumer failed part way through a multi-task conversion.
    /// The capture is already linked to the first of `created`.
    #[error("Conversion of {id} stopped after {} task(s): {source}", .created.len())]
    PartialConversion {
        id: String,
        created: Vec<String>,
        source: CollaboratorError,
    },
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while constructing or transitioning a capture artifact.
///
/// Callers must not retry these without changing the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("Invalid capture: {reason}")]
    InvalidCapture { reason: String },

    #[error("Capture {id} is already linked to task {task_id}")]
    AlreadyLinked { id: String, task_id: String },

    #[error("Capture {id} cannot be converted into a task")]
    NotConvertible { id: String },
}

/// Failures of an external collaborator (repository, inference service, fetcher).
///
/// Propagated unchanged; the pipeline performs no retry of its own.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{collaborator} unavailable: {reason}")]
    Unavailable {
        collaborator: String,
        reason: String,
    },

    #[error("Capture {id} not found")]
    NotFound { id: String },
}

impl CollaboratorError {
    /// Shorthand for an `Unavailable` error.
    pub fn unavailable(collaborator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            collaborator: collaborator.into(),
            reason: reason.into(),
        }
    }
}

/// Problems with a suggestion bundle returned by the inference collaborator.
///
/// The tolerant parser records these and substitutes defaults; only the
/// strict parser returns them as errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SuggestionError {
    #[error("Malformed suggestion field `{field}`: {reason}")]
    Malformed { field: String, reason: String },
}

impl SuggestionError {
    pub(crate) fn malformed(field: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<DatabaseError> for CollaboratorError {
    fn from(e: DatabaseError) -> Self {
        Self::unavailable("capture repository", e.to_string())
    }
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
