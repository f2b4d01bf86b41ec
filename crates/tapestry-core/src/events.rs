use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::task::{PlanId, TaskId, TaskResult};

/// Lifecycle event published by the task store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlanEvent {
    /// A plan was created and is ready to execute.
    PlanCreated {
        /// ID of the plan.
        plan_id: PlanId,
        /// Number of tasks in the plan.
        task_count: usize,
    },
    /// The task list changed (tasks added or removed).
    PlanUpdated {
        /// ID of the plan.
        plan_id: PlanId,
        /// Number of tasks after the change.
        task_count: usize,
    },
    /// A task started executing.
    TaskStarted {
        /// ID of the task.
        task_id: TaskId,
        /// Title of the task.
        title: String,
    },
    /// A task completed successfully.
    TaskCompleted {
        /// ID of the task.
        task_id: TaskId,
        /// Final result.
        result: Box<TaskResult>,
    },
    /// A task failed.
    TaskFailed {
        /// ID of the task.
        task_id: TaskId,
        /// Error message.
        error: String,
    },
    /// A task was blocked because a dependency failed.
    TaskBlocked {
        /// ID of the task.
        task_id: TaskId,
        /// Why the task was blocked.
        reason: String,
    },
    /// A blocked task was skipped by replanning.
    TaskSkipped {
        /// ID of the task.
        task_id: TaskId,
    },
    /// Every task reached a terminal, non-failing status.
    PlanCompleted {
        /// ID of the plan.
        plan_id: PlanId,
    },
    /// Nothing is runnable and at least one task failed or is blocked.
    PlanFailed {
        /// ID of the plan.
        plan_id: PlanId,
    },
}

/// Subscriber to plan lifecycle events.
///
/// Handlers are invoked synchronously, in registration order, for every
/// event. A handler error is logged by the store and never prevents
/// delivery to subsequent handlers or corrupts plan state.
pub trait PlanObserver: Send + Sync {
    /// Handles one event.
    ///
    /// # Errors
    /// Returns an error when the handler cannot process the event; the
    /// store isolates the failure.
    fn on_event(&self, event: &PlanEvent) -> Result<()>;
}

impl<F> PlanObserver for F
where
    F: Fn(&PlanEvent) -> Result<()> + Send + Sync,
{
    fn on_event(&self, event: &PlanEvent) -> Result<()> {
        self(event)
    }
}
