//! Plan types and derived projections

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::core::{Task, TaskId, TaskStatus};
use crate::task::result::TaskResult;

/// Unique identifier for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(Uuid);

impl PlanId {
    /// Generates a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Overall status of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Decomposition has not produced tasks yet.
    Planning,
    /// Tasks are being executed.
    Executing,
    /// Every task reached a terminal, non-failing status.
    Completed,
    /// Nothing is runnable and at least one task failed or is blocked.
    Failed,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(formatter, "{label}")
    }
}

/// One decomposition of a user request plus its execution state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Verbatim user request this plan decomposes.
    pub original_goal: String,
    /// Owned tasks, in decomposition order; may grow via replanning.
    pub tasks: Vec<Task>,
    /// Topological ordering of task ids, recomputed when the list changes.
    pub execution_order: Vec<TaskId>,
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Overall plan status.
    pub status: PlanStatus,
}

impl TaskPlan {
    /// Creates a plan over the given tasks, still in `Planning` status.
    ///
    /// The execution order is computed by the store, which owns graph
    /// validation.
    pub fn new<T: Into<String>>(original_goal: T, tasks: Vec<Task>) -> Self {
        Self {
            id: PlanId::generate(),
            original_goal: original_goal.into(),
            tasks,
            execution_order: Vec::default(),
            created_at: Utc::now(),
            status: PlanStatus::Planning,
        }
    }

    /// Looks up a task by id.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    /// Looks up a task by id, mutably.
    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id() == id)
    }

    /// Counts tasks by status.
    pub fn status_summary(&self) -> StatusSummary {
        let mut summary = StatusSummary::default();
        for task in &self.tasks {
            match task.status {
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
                TaskStatus::Blocked => summary.blocked += 1,
                TaskStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    /// Folds the context of all completed tasks, in completion order.
    ///
    /// Recomputed on every call so readers always see a snapshot
    /// consistent with the last completed mutation.
    pub fn accumulated_context(&self) -> AccumulatedContext {
        let mut completed: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Completed)
            .collect();
        completed.sort_by_key(|task| task.completed_at);

        let mut accumulated = AccumulatedContext::default();
        for task in completed {
            accumulated
                .discoveries
                .extend(task.context.discoveries.iter().cloned());
            accumulated
                .decisions
                .extend(task.context.decisions.iter().cloned());
            for file in &task.context.files_read {
                if !accumulated.files_read.contains(file) {
                    accumulated.files_read.push(file.clone());
                }
            }
            for file in &task.context.files_modified {
                if !accumulated.files_modified.contains(file) {
                    accumulated.files_modified.push(file.clone());
                }
            }
            accumulated.completed_tasks.push(CompletedTask {
                id: task.id(),
                title: task.definition.title.clone(),
                summary: task
                    .result
                    .as_ref()
                    .map_or_else(|| "Done".to_owned(), |result| result.summary.clone()),
            });
        }
        accumulated
    }
}

/// Per-status task counts for a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    /// Tasks not started yet.
    pub pending: usize,
    /// Tasks currently executing.
    pub in_progress: usize,
    /// Tasks finished successfully.
    pub completed: usize,
    /// Tasks finished with an error.
    pub failed: usize,
    /// Tasks whose dependencies failed.
    pub blocked: usize,
    /// Tasks pruned by replanning.
    pub skipped: usize,
}

impl StatusSummary {
    /// Returns `true` when no task is pending or in progress.
    pub const fn is_settled(&self) -> bool {
        self.pending == 0 && self.in_progress == 0
    }
}

/// Rolling summary of everything completed tasks produced.
///
/// Derived, never stored; see [`TaskPlan::accumulated_context`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccumulatedContext {
    /// Discoveries from completed tasks, in completion order.
    pub discoveries: Vec<String>,
    /// Decisions from completed tasks, in completion order.
    pub decisions: Vec<String>,
    /// Files read, deduplicated, first appearance preserved.
    pub files_read: Vec<String>,
    /// Files modified, deduplicated, first appearance preserved.
    pub files_modified: Vec<String>,
    /// Identity and summary of each completed task.
    pub completed_tasks: Vec<CompletedTask>,
}

/// Identity and summary of one completed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTask {
    /// Task identifier.
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Result summary.
    pub summary: String,
}

/// Result of a direct dependency, scoped for a dependent task's prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyResult {
    /// Dependency task identifier.
    pub id: TaskId,
    /// Dependency task title.
    pub title: String,
    /// The dependency's attached result.
    pub result: TaskResult,
}
