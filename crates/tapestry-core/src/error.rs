use core::result::Result as CoreResult;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::task::TaskId;

/// Result type for core operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur in the planning engine.
#[derive(Debug, Error)]
pub enum Error {
    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// The model client encountered an error.
    #[error("Provider error: {0}")]
    Provider(String),

    /// A tool invocation failed in a way the loop cannot absorb.
    #[error("Tool error: {0}")]
    Tool(String),

    /// The model returned a response the engine cannot use.
    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    /// A task status transition was requested from the wrong state.
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    /// The proposed plan contains a dependency cycle.
    #[error("Cyclic dependencies in plan: {0}")]
    CyclicDependencies(String),

    /// An operation required an active plan but none exists.
    #[error("No active plan")]
    PlanMissing,

    /// The referenced task does not exist in the active plan.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The in-flight operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns `true` if this error is the distinct cancellation condition.
    ///
    /// Cancellation must propagate out of decomposition and execution
    /// instead of being absorbed into a fallback plan or a failed task.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Determines whether this error may succeed if retried.
    ///
    /// Returns `true` for transient errors like provider failures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Tool(_))
    }
}
