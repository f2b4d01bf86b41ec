//! Task execution results

use serde::{Deserialize, Serialize};

/// Outcome of executing one task, immutable once attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Whether the task succeeded.
    pub success: bool,
    /// One-line account of what happened.
    pub summary: String,
    /// Full final answer text, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Items the task wants forwarded to dependent tasks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pass_to_next: Vec<String>,
    /// Error description for failed tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    /// Creates a successful result with the given summary.
    pub fn success<T: Into<String>>(summary: T) -> Self {
        Self {
            success: true,
            summary: summary.into(),
            output: None,
            pass_to_next: Vec::default(),
            error: None,
        }
    }

    /// Creates a failed result carrying the error message.
    pub fn failure<T: Into<String>>(error: T) -> Self {
        let error = error.into();
        Self {
            success: false,
            summary: format!("Task failed: {error}"),
            output: None,
            pass_to_next: Vec::default(),
            error: Some(error),
        }
    }

    /// Attaches the full output text.
    #[must_use]
    pub fn with_output<T: Into<String>>(mut self, output: T) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Attaches items to forward to dependent tasks.
    #[must_use]
    pub fn with_pass_to_next(mut self, items: Vec<String>) -> Self {
        self.pass_to_next = items;
        self
    }
}
