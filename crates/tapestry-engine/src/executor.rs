use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use tapestry_core::{
    AssistantTurn, Error, Message, ModelClient, Result, TaskId, TaskResult, ToolCallRequest,
    ToolDispatcher, ToolEffect, ToolMessage, default_tool_specs, tool_effect,
};

use crate::extract::{ExtractedFindings, FindingsExtractor, HeadingExtractor};
use crate::prompts;
use crate::store::TaskStore;

/// Hard cap on model round-trips per task.
const MAX_TOOL_ITERATIONS: usize = 10;

/// File touches observed while a task's tool calls execute.
#[derive(Debug, Default)]
struct FileTouches {
    read: BTreeSet<String>,
    modified: BTreeSet<String>,
}

/// Drives one task to completion through the model/tool loop.
///
/// Tasks run strictly one at a time: the `&mut TaskStore` parameter is
/// what serializes execution against the shared accumulated-context
/// state.
pub struct TaskExecutor {
    client: Arc<dyn ModelClient>,
    tools: Arc<dyn ToolDispatcher>,
    extractor: Box<dyn FindingsExtractor>,
}

impl TaskExecutor {
    /// Creates an executor with the default findings extractor.
    pub fn new(client: Arc<dyn ModelClient>, tools: Arc<dyn ToolDispatcher>) -> Self {
        Self {
            client,
            tools,
            extractor: Box::new(HeadingExtractor),
        }
    }

    /// Replaces the findings extraction strategy.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Box<dyn FindingsExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Executes one runnable task and records its result in the store.
    ///
    /// Marks the task in progress, runs the bounded model/tool loop,
    /// extracts findings from the final answer, and completes or fails
    /// the task. Any error other than cancellation becomes a failed
    /// task result; cancellation unwinds without touching task state.
    ///
    /// # Errors
    /// Returns [`tapestry_core::Error::Cancelled`] when the run is
    /// cancelled, or a store error when `task_id` is not a runnable
    /// task.
    pub async fn execute_task(
        &self,
        store: &mut TaskStore,
        task_id: TaskId,
        cancel: &CancellationToken,
    ) -> Result<TaskResult> {
        store.start_task(task_id)?;

        match self.run_task_loop(store, task_id, cancel).await {
            Ok((findings, final_text, touches)) => {
                let context = store.task_context_mut(task_id)?;
                context.files_read.extend(touches.read);
                context.files_modified.extend(touches.modified);
                context.discoveries.extend(findings.discoveries.clone());
                context.decisions.extend(findings.decisions.clone());

                let mut result = TaskResult::success(findings.summary)
                    .with_pass_to_next(findings.pass_to_next);
                if !final_text.is_empty() {
                    result = result.with_output(final_text);
                }
                store.complete_task(task_id, result.clone())?;
                Ok(result)
            }
            Err(error) if error.is_cancelled() => Err(error),
            Err(error) => {
                let result = TaskResult::failure(error.to_string());
                store.fail_task(task_id, result.clone())?;
                Ok(result)
            }
        }
    }

    /// Runs the iterative model/tool loop for one task.
    ///
    /// Each iteration sends the conversation with the full tool set; a
    /// tool-free reply is the final answer. Exceeding the cap ends the
    /// loop with whatever final content exists, which may be empty.
    async fn run_task_loop(
        &self,
        store: &TaskStore,
        task_id: TaskId,
        cancel: &CancellationToken,
    ) -> Result<(ExtractedFindings, String, FileTouches)> {
        let mut messages = self.build_conversation(store, task_id)?;
        let specs = default_tool_specs();
        let mut touches = FileTouches::default();
        let mut final_text = String::new();

        for iteration in 0..MAX_TOOL_ITERATIONS {
            let turn = self.client.complete(&messages, &specs, cancel).await?;

            match turn {
                AssistantTurn::Text(text) => {
                    final_text = text;
                    break;
                }
                AssistantTurn::ToolCalls(requests) => {
                    tracing::debug!(
                        "Task {task_id} iteration {} requested {} tool calls",
                        iteration + 1,
                        requests.len()
                    );
                    messages.push(Message::assistant(render_tool_requests(&requests)));

                    // Strictly sequential, in request order: later calls
                    // in the same turn may depend on earlier mutations.
                    for request in &requests {
                        record_file_touch(&mut touches, request);
                        let tool_message = match self.tools.execute(request, cancel).await {
                            Ok(message) => message,
                            Err(error) if error.is_cancelled() => return Err(error),
                            Err(error) => ToolMessage::error(
                                request.id.clone(),
                                request.name.clone(),
                                error.to_string(),
                            ),
                        };
                        messages.push(tool_message.into_message());
                    }
                }
            }
        }

        let findings = self.extractor.extract(&final_text);
        Ok((findings, final_text, touches))
    }

    /// Builds the task-scoped conversation.
    ///
    /// Context is limited to discoveries and decisions accumulated from
    /// previously completed tasks plus results from this task's direct
    /// dependencies, never unrelated tasks' full output.
    fn build_conversation(&self, store: &TaskStore, task_id: TaskId) -> Result<Vec<Message>> {
        let plan = store.plan().ok_or(Error::PlanMissing)?;
        let task = plan.task(task_id).ok_or(Error::TaskNotFound(task_id))?;

        let accumulated = store.accumulated_context()?;
        let dependency_results = store.dependency_results(task_id)?;
        let prompt = prompts::task_prompt(
            &task.definition,
            &plan.original_goal,
            &accumulated,
            &dependency_results,
        );

        Ok(vec![
            Message::system(prompts::task_system_prompt()),
            Message::user(prompt),
        ])
    }
}

/// Renders requested tool calls as the assistant turn in the transcript.
fn render_tool_requests(requests: &[ToolCallRequest]) -> String {
    let rendered: Vec<String> = requests
        .iter()
        .map(|request| format!("{}({})", request.name, request.arguments))
        .collect();
    format!("Calling tools: {}", rendered.join(", "))
}

/// Classifies one tool call's file touch from its name and arguments.
///
/// Read-only tools mark the file as read; mutating tools mark it as
/// modified. The path is taken from a `path` or `filename` argument.
fn record_file_touch(touches: &mut FileTouches, request: &ToolCallRequest) {
    let Some(effect) = tool_effect(&request.name) else {
        return;
    };
    let Some(path) = argument_path(&request.arguments) else {
        return;
    };

    match effect {
        ToolEffect::Read => {
            touches.read.insert(path);
        }
        ToolEffect::Mutate => {
            touches.modified.insert(path);
        }
    }
}

fn argument_path(arguments: &Value) -> Option<String> {
    arguments
        .get("path")
        .or_else(|| arguments.get("filename"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(name: &str, arguments: Value) -> ToolCallRequest {
        ToolCallRequest {
            id: "call_1".to_owned(),
            name: name.to_owned(),
            arguments,
        }
    }

    #[test]
    fn test_read_tool_marks_file_read() {
        let mut touches = FileTouches::default();
        record_file_touch(&mut touches, &request("read_file", json!({"path": "src/lib.rs"})));
        assert!(touches.read.contains("src/lib.rs"));
        assert!(touches.modified.is_empty());
    }

    #[test]
    fn test_mutating_tool_marks_file_modified() {
        let mut touches = FileTouches::default();
        record_file_touch(
            &mut touches,
            &request("replace_lines", json!({"filename": "src/main.rs"})),
        );
        assert!(touches.modified.contains("src/main.rs"));
        assert!(touches.read.is_empty());
    }

    #[test]
    fn test_unknown_tool_or_missing_path_is_ignored() {
        let mut touches = FileTouches::default();
        record_file_touch(&mut touches, &request("mystery_tool", json!({"path": "x"})));
        record_file_touch(&mut touches, &request("read_file", json!({"query": "x"})));
        assert!(touches.read.is_empty());
        assert!(touches.modified.is_empty());
    }

    #[test]
    fn test_render_tool_requests() {
        let rendered = render_tool_requests(&[
            request("read_file", json!({"path": "a.rs"})),
            request("execute_bash", json!({"command": "ls"})),
        ]);
        assert!(rendered.starts_with("Calling tools: read_file"));
        assert!(rendered.contains("execute_bash"));
    }
}
