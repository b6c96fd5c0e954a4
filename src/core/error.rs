//! Error types shared by the workflow and health engines.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while executing workflows or assessing projects.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A project, execution, or project path could not be found.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The requested state transition is not allowed.
    #[error("cannot {action} workflow execution with status: {status}")]
    InvalidState { action: &'static str, status: String },

    /// The trigger named a workflow type that does not exist.
    #[error("unknown workflow type: {0}")]
    UnknownWorkflowType(String),

    /// The trigger named a trigger type that does not exist.
    #[error("unknown trigger type: {0}")]
    UnknownTriggerType(String),

    /// The workflow configuration failed validation.
    #[error("invalid {workflow} configuration: {reason}")]
    InvalidConfiguration { workflow: String, reason: String },

    /// An external process could not be spawned or exited unsuccessfully.
    #[error("external tool `{program}` failed: {reason}")]
    ExternalTool { program: String, reason: String },

    /// A workflow step failed; `context` names the step.
    #[error("{context}: {source}")]
    Handler {
        context: String,
        #[source]
        source: Box<EngineError>,
    },

    /// The backing store rejected an operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Shorthand for a [`EngineError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound { kind, id: id.to_string() }
    }

    /// Wrap this error with the name of the step that produced it.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Handler { context: context.into(), source: Box::new(self) }
    }

    /// Whether this error (or the error it wraps) is a `NotFound`.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Handler { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}
