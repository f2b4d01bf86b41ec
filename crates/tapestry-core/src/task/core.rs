//! Core task types and lifecycle transitions

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::task::result::TaskResult;
use crate::tools::is_allowed_tool;

/// Unique identifier for a task.
///
/// Assigned at creation, never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generates a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Immutable definition of a task produced by decomposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Unique identifier for this task.
    pub id: TaskId,
    /// Short human-readable title.
    pub title: String,
    /// Detailed description of what to do.
    pub description: String,
    /// Conditions under which the task counts as done.
    pub acceptance_criteria: Vec<String>,
    /// Tasks within the same plan that must complete first.
    pub dependencies: Vec<TaskId>,
    /// Tools this task may use, restricted to the fixed allow-list.
    pub required_tools: Vec<String>,
}

impl TaskDefinition {
    /// Creates a definition with a fresh id and no dependencies.
    pub fn new<T: Into<String>>(title: T, description: T) -> Self {
        Self {
            id: TaskId::generate(),
            title: title.into(),
            description: description.into(),
            acceptance_criteria: Vec::default(),
            dependencies: Vec::default(),
            required_tools: Vec::default(),
        }
    }

    /// Sets the acceptance criteria.
    #[must_use]
    pub fn with_acceptance_criteria(mut self, criteria: Vec<String>) -> Self {
        self.acceptance_criteria = criteria;
        self
    }

    /// Sets task dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<TaskId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Sets the required tools, silently dropping names outside the allow-list.
    #[must_use]
    pub fn with_required_tools(mut self, tools: Vec<String>) -> Self {
        self.required_tools = tools
            .into_iter()
            .filter(|name| is_allowed_tool(name))
            .collect();
        self
    }
}

/// Task lifecycle status.
///
/// `Completed`, `Failed`, and `Skipped` are terminal; the only
/// transition out of `Blocked` is to `Skipped` via replanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet.
    Pending,
    /// Currently executing.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// A dependency failed; this task can never run.
    Blocked,
    /// Pruned by replanning.
    Skipped,
}

impl TaskStatus {
    /// Returns `true` if no further transition can leave this status.
    ///
    /// `Blocked` is terminal-adjacent: replanning may still move it to
    /// `Skipped`.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
            Self::Skipped => "skipped",
        };
        write!(formatter, "{label}")
    }
}

/// Execution context a task accumulates while it runs.
///
/// Mutated only by the executor that owns the task's run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskContext {
    /// Files read through read-only tools.
    pub files_read: BTreeSet<String>,
    /// Files touched through mutating tools.
    pub files_modified: BTreeSet<String>,
    /// Discoveries extracted from the final answer.
    pub discoveries: Vec<String>,
    /// Decisions extracted from the final answer.
    pub decisions: Vec<String>,
}

/// A task definition plus its mutable execution state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// The immutable definition this task was created from.
    pub definition: TaskDefinition,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// When execution started.
    pub started_at: Option<DateTime<Utc>>,
    /// When execution reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Result of execution, immutable once attached.
    pub result: Option<TaskResult>,
    /// Why this task was blocked, when it was.
    pub block_reason: Option<String>,
    /// Context accumulated during execution.
    pub context: TaskContext,
}

impl Task {
    /// Wraps a definition with fresh execution state.
    pub fn new(definition: TaskDefinition) -> Self {
        Self {
            definition,
            status: TaskStatus::Pending,
            started_at: None,
            completed_at: None,
            result: None,
            block_reason: None,
            context: TaskContext::default(),
        }
    }

    /// The task's identifier.
    pub fn id(&self) -> TaskId {
        self.definition.id
    }

    /// Marks the task in progress.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] unless the task is pending.
    pub fn start(&mut self) -> Result<()> {
        self.expect_status(TaskStatus::Pending, TaskStatus::InProgress)?;
        self.status = TaskStatus::InProgress;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Marks the task completed and attaches its result.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] unless the task is in progress.
    pub fn complete(&mut self, result: TaskResult) -> Result<()> {
        self.expect_status(TaskStatus::InProgress, TaskStatus::Completed)?;
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.result = Some(result);
        Ok(())
    }

    /// Marks the task failed and attaches the failing result.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] unless the task is in progress.
    pub fn fail(&mut self, result: TaskResult) -> Result<()> {
        self.expect_status(TaskStatus::InProgress, TaskStatus::Failed)?;
        self.status = TaskStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.result = Some(result);
        Ok(())
    }

    /// Blocks the task because a dependency failed.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] unless the task is pending.
    pub fn block<T: Into<String>>(&mut self, reason: T) -> Result<()> {
        self.expect_status(TaskStatus::Pending, TaskStatus::Blocked)?;
        self.status = TaskStatus::Blocked;
        self.block_reason = Some(reason.into());
        Ok(())
    }

    /// Skips a blocked task during replanning.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] unless the task is blocked.
    pub fn skip(&mut self) -> Result<()> {
        self.expect_status(TaskStatus::Blocked, TaskStatus::Skipped)?;
        self.status = TaskStatus::Skipped;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    fn expect_status(&self, expected: TaskStatus, target: TaskStatus) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(Error::InvalidTransition(format!(
                "task {} is {}, cannot transition to {target} (requires {expected})",
                self.id(),
                self.status,
            )))
        }
    }
}
