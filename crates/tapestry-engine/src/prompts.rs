//! Prompt assembly for decomposition and task execution.
//!
//! Prompts are built with plain formatting because every section is
//! parameterized by the request, the analysis, and accumulated context.

use tapestry_core::{AccumulatedContext, DependencyResult, TaskDefinition};

use crate::analyzer::QueryAnalysis;

/// System prompt for the decomposition call.
pub fn decomposition_system_prompt() -> String {
    "You are a planning assistant. Decompose the user's request into a \
     minimal set of atomic tasks and reply with a JSON array only."
        .to_owned()
}

/// User prompt for the decomposition call.
pub fn decomposition_prompt(
    query: &str,
    analysis: &QueryAnalysis,
    allowed_tools: &[&str],
    max_tasks: usize,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!("Request: {query}\n"));
    prompt.push_str(&format!("Request type: {}\n", analysis.task_type));
    if !analysis.required_context.is_empty() {
        prompt.push_str(&format!(
            "Mentioned context: {}\n",
            analysis.required_context.join(", ")
        ));
    }
    prompt.push('\n');
    prompt.push_str(&format!(
        "Produce at most {max_tasks} tasks as a JSON array. Each element:\n"
    ));
    prompt.push_str(concat!(
        r#"{"title": "...", "description": "...", "acceptance_criteria": ["..."], "#,
        r#""dependencies": [0], "required_tools": ["..."]}"#,
        "\n",
    ));
    prompt.push_str("Dependencies are 0-based indices of earlier tasks in the array.\n");
    prompt.push_str(&format!("Available tools: {}.\n", allowed_tools.join(", ")));
    prompt
}

/// System prompt for a task execution conversation.
pub fn task_system_prompt() -> String {
    "You are a coding assistant executing one task from a larger plan. \
     Use the available tools as needed. When finished, answer in \
     markdown with headings for Summary, Discoveries, Decisions, and \
     Pass to next where applicable, using bullet lists under each."
        .to_owned()
}

/// Task-scoped prompt: the task itself, the original goal, accumulated
/// findings from completed tasks, and direct dependency results only.
pub fn task_prompt(
    definition: &TaskDefinition,
    original_goal: &str,
    accumulated: &AccumulatedContext,
    dependency_results: &[DependencyResult],
) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!("Overall goal: {original_goal}\n\n"));
    prompt.push_str(&format!("Current task: {}\n", definition.title));
    prompt.push_str(&definition.description);
    prompt.push('\n');

    if !definition.acceptance_criteria.is_empty() {
        prompt.push_str("\nAcceptance criteria:\n");
        for criterion in &definition.acceptance_criteria {
            prompt.push_str(&format!("- {criterion}\n"));
        }
    }

    if !accumulated.discoveries.is_empty() {
        prompt.push_str("\nDiscoveries from completed tasks:\n");
        for discovery in &accumulated.discoveries {
            prompt.push_str(&format!("- {discovery}\n"));
        }
    }

    if !accumulated.decisions.is_empty() {
        prompt.push_str("\nDecisions made so far:\n");
        for decision in &accumulated.decisions {
            prompt.push_str(&format!("- {decision}\n"));
        }
    }

    if !dependency_results.is_empty() {
        prompt.push_str("\nResults from tasks this one depends on:\n");
        for dependency in dependency_results {
            prompt.push_str(&format!(
                "- {}: {}\n",
                dependency.title, dependency.result.summary
            ));
            for item in &dependency.result.pass_to_next {
                prompt.push_str(&format!("  - {item}\n"));
            }
        }
    }

    prompt
}
