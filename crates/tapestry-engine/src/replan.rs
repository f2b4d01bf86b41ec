use tapestry_core::{Result, TaskStatus};

use crate::store::TaskStore;

/// Result of a replanning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplanOutcome {
    /// Number of blocked tasks that were skipped.
    pub skipped: usize,
    /// Whether any pending task remains to execute.
    pub can_continue: bool,
}

/// Decides whether a failed plan can still make progress.
///
/// This is a conservative strategy: it never regenerates a plan, only
/// prunes unreachable work so independent pending tasks can continue.
#[derive(Default)]
pub struct Replanner;

impl Replanner {
    /// Returns `true` when the plan needs a replanning pass.
    ///
    /// That is: any task failed, or nothing is pending or in progress
    /// while at least one task sits blocked.
    pub fn should_replan(store: &TaskStore) -> bool {
        let Ok(summary) = store.status_summary() else {
            return false;
        };
        summary.failed > 0 || (summary.is_settled() && summary.blocked > 0)
    }

    /// Skips every blocked task and reports whether work remains.
    ///
    /// # Errors
    /// Returns [`tapestry_core::Error::PlanMissing`] when no plan is
    /// active.
    pub fn simple_replan(store: &mut TaskStore) -> Result<ReplanOutcome> {
        let blocked: Vec<_> = store
            .plan()
            .map(|plan| {
                plan.tasks
                    .iter()
                    .filter(|task| task.status == TaskStatus::Blocked)
                    .map(|task| task.id())
                    .collect()
            })
            .unwrap_or_default();

        for task_id in &blocked {
            store.skip_task(*task_id)?;
        }

        let summary = store.status_summary()?;
        let outcome = ReplanOutcome {
            skipped: blocked.len(),
            can_continue: summary.pending > 0,
        };
        tracing::debug!(
            "Replanning skipped {} blocked tasks, can_continue={}",
            outcome.skipped,
            outcome.can_continue
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapestry_core::{TaskDefinition, TaskResult};

    #[test]
    fn test_should_replan_on_blocked_only_plan() {
        let first = TaskDefinition::new("A", "a");
        let second = TaskDefinition::new("B", "b").with_dependencies(vec![first.id]);
        let third = TaskDefinition::new("C", "c").with_dependencies(vec![first.id]);

        let mut store = TaskStore::new();
        store
            .create_plan("goal", vec![first.clone(), second, third])
            .unwrap();
        store.start_task(first.id).unwrap();
        store
            .fail_task(first.id, TaskResult::failure("boom"))
            .unwrap();

        // {pending: 0, in_progress: 0, blocked: 2, failed: 1}
        assert!(Replanner::should_replan(&store));

        // Removing the failed task leaves {blocked: 2, failed: 0};
        // nothing is runnable, so replanning is still required.
        store.remove_task(first.id).unwrap();
        let summary = store.status_summary().unwrap();
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.blocked, 2);
        assert!(Replanner::should_replan(&store));
    }

    #[test]
    fn test_should_not_replan_with_pending_work() {
        let first = TaskDefinition::new("A", "a");
        let mut store = TaskStore::new();
        store.create_plan("goal", vec![first]).unwrap();

        // {pending: 1, blocked: 0, failed: 0}
        assert!(!Replanner::should_replan(&store));
    }

    #[test]
    fn test_should_not_replan_without_a_plan() {
        let store = TaskStore::new();
        assert!(!Replanner::should_replan(&store));
    }

    #[test]
    fn test_simple_replan_skips_blocked_and_reports_pending() {
        let failing = TaskDefinition::new("Failing", "fails");
        let dependent =
            TaskDefinition::new("Dependent", "blocked").with_dependencies(vec![failing.id]);
        let independent = TaskDefinition::new("Independent", "still runnable");

        let mut store = TaskStore::new();
        store
            .create_plan(
                "goal",
                vec![failing.clone(), dependent.clone(), independent.clone()],
            )
            .unwrap();
        store.start_task(failing.id).unwrap();
        store
            .fail_task(failing.id, TaskResult::failure("boom"))
            .unwrap();

        let outcome = Replanner::simple_replan(&mut store).unwrap();
        assert_eq!(outcome.skipped, 1);
        assert!(outcome.can_continue);

        let plan = store.plan().unwrap();
        assert_eq!(
            plan.task(dependent.id).unwrap().status,
            TaskStatus::Skipped
        );
        // The independent task is still runnable.
        assert_eq!(store.next_task().unwrap(), Some(independent.id));
    }
}
