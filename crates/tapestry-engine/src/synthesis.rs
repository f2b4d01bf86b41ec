use tapestry_core::{Task, TaskPlan, TaskStatus};

/// Maximum number of discoveries included in a synthesized summary.
const MAX_DISCOVERIES: usize = 5;

/// Renders a human-readable summary of a finished or partially
/// finished plan.
///
/// Pure rendering: no side effects, no network access. A plan that
/// partially failed still yields an account of what succeeded and what
/// failed instead of an opaque abort.
#[derive(Default)]
pub struct ContextSynthesizer;

impl ContextSynthesizer {
    /// Renders a summary from the goal and the finished tasks.
    pub fn synthesize(goal: &str, completed: &[&Task], failed: &[&Task]) -> String {
        let mut output = format!("Goal: {goal}\n");

        if !completed.is_empty() {
            output.push_str("\nCompleted tasks:\n");
            for task in completed {
                let summary = task
                    .result
                    .as_ref()
                    .map_or("Done", |result| result.summary.as_str());
                output.push_str(&format!("- {}: {summary}\n", task.definition.title));
            }
        }

        if !failed.is_empty() {
            output.push_str("\nFailed tasks:\n");
            for task in failed {
                let error = task
                    .result
                    .as_ref()
                    .and_then(|result| result.error.as_deref())
                    .unwrap_or("Failed");
                output.push_str(&format!("- {}: {error}\n", task.definition.title));
            }
        }

        let discoveries = collect_discoveries(completed);
        if !discoveries.is_empty() {
            output.push_str("\nKey discoveries:\n");
            for discovery in discoveries {
                output.push_str(&format!("- {discovery}\n"));
            }
        }

        let modified = collect_modified_files(completed, failed);
        if !modified.is_empty() {
            output.push_str("\nFiles modified:\n");
            for file in modified {
                output.push_str(&format!("- {file}\n"));
            }
        }

        output
    }

    /// Renders a summary for a whole plan.
    pub fn synthesize_plan(plan: &TaskPlan) -> String {
        let completed: Vec<&Task> = plan
            .tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Completed)
            .collect();
        let failed: Vec<&Task> = plan
            .tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Failed)
            .collect();
        Self::synthesize(&plan.original_goal, &completed, &failed)
    }
}

/// Up to [`MAX_DISCOVERIES`] deduplicated discoveries across completed
/// tasks, first appearance preserved.
fn collect_discoveries(completed: &[&Task]) -> Vec<String> {
    let mut discoveries = Vec::new();
    for task in completed {
        for discovery in &task.context.discoveries {
            if discoveries.len() >= MAX_DISCOVERIES {
                return discoveries;
            }
            if !discoveries.iter().any(|existing| existing == discovery) {
                discoveries.push(discovery.clone());
            }
        }
    }
    discoveries
}

/// Union of modified files across all finished tasks.
fn collect_modified_files(completed: &[&Task], failed: &[&Task]) -> Vec<String> {
    let mut files = Vec::new();
    for task in completed.iter().chain(failed) {
        for file in &task.context.files_modified {
            if !files.iter().any(|existing| existing == file) {
                files.push(file.clone());
            }
        }
    }
    files
}
