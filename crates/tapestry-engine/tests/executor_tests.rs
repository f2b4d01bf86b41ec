//! Integration tests for the per-task model/tool execution loop.

#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

mod common;

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{MockModelClient, MockToolDispatcher, tool_request};
use tapestry_core::{ModelClient, TaskDefinition, TaskId, TaskStatus, ToolDispatcher};
use tapestry_engine::{TaskExecutor, TaskStore};

fn single_task_store(title: &str) -> (TaskStore, TaskId) {
    let definition = TaskDefinition::new(title, "do the work");
    let task_id = definition.id;
    let mut store = TaskStore::new();
    store.create_plan("the goal", vec![definition]).unwrap();
    (store, task_id)
}

#[tokio::test]
async fn tool_free_reply_completes_the_task() {
    let client = MockModelClient::new().with_text(
        "## Summary\nChecked the module.\n\n## Discoveries\n- module is sound\n",
    );
    let executor = TaskExecutor::new(Arc::new(client), Arc::new(MockToolDispatcher::new()));
    let (mut store, task_id) = single_task_store("Check");

    let result = executor
        .execute_task(&mut store, task_id, &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.summary, "Checked the module.");

    let task = store.plan().unwrap().task(task_id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.context.discoveries, vec!["module is sound"]);
}

#[tokio::test]
async fn tool_calls_run_sequentially_in_request_order() {
    let client = MockModelClient::new()
        .with_tool_calls(vec![
            tool_request("call_1", "read_file", json!({"path": "src/lib.rs"})),
            tool_request("call_2", "replace_lines", json!({"path": "src/lib.rs"})),
            tool_request("call_3", "execute_bash", json!({"command": "cargo check"})),
        ])
        .with_text("## Summary\nApplied the edit.\n");
    let tools = Arc::new(MockToolDispatcher::new());
    let executor = TaskExecutor::new(Arc::new(client), Arc::clone(&tools) as Arc<dyn ToolDispatcher>);
    let (mut store, task_id) = single_task_store("Edit");

    let result = executor
        .execute_task(&mut store, task_id, &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(
        tools.executed_tools(),
        vec!["read_file", "replace_lines", "execute_bash"]
    );

    let task = store.plan().unwrap().task(task_id).unwrap();
    assert!(task.context.files_read.contains("src/lib.rs"));
    assert!(task.context.files_modified.contains("src/lib.rs"));
}

#[tokio::test]
async fn tool_failure_becomes_error_result_and_loop_continues() {
    let client = MockModelClient::new()
        .with_tool_calls(vec![tool_request(
            "call_1",
            "execute_bash",
            json!({"command": "cargo test"}),
        )])
        .with_text("## Summary\nTests could not run.\n");
    let tools = Arc::new(MockToolDispatcher::new().with_failing_tool("execute_bash"));
    let executor = TaskExecutor::new(Arc::new(client), Arc::clone(&tools) as Arc<dyn ToolDispatcher>);
    let (mut store, task_id) = single_task_store("Test");

    let result = executor
        .execute_task(&mut store, task_id, &CancellationToken::new())
        .await
        .unwrap();

    // The tool failed but the task still ran to a final answer.
    assert!(result.success);
    assert_eq!(result.summary, "Tests could not run.");
    assert_eq!(tools.executed_tools(), vec!["execute_bash"]);
}

#[tokio::test]
async fn model_failure_records_a_failed_task() {
    let client = MockModelClient::new().with_failure("connection reset");
    let executor = TaskExecutor::new(Arc::new(client), Arc::new(MockToolDispatcher::new()));
    let (mut store, task_id) = single_task_store("Doomed");

    let result = executor
        .execute_task(&mut store, task_id, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("connection reset"));

    let plan = store.plan().unwrap();
    assert_eq!(plan.task(task_id).unwrap().status, TaskStatus::Failed);
}

#[tokio::test]
async fn cancellation_is_rethrown_not_recorded() {
    let client = MockModelClient::new().with_text("never reached");
    let executor = TaskExecutor::new(Arc::new(client), Arc::new(MockToolDispatcher::new()));
    let (mut store, task_id) = single_task_store("Cancelled");

    let cancel = CancellationToken::new();
    cancel.cancel();

    let error = executor
        .execute_task(&mut store, task_id, &cancel)
        .await
        .unwrap_err();
    assert!(error.is_cancelled());

    // No result was attached; the run was abandoned, not failed.
    let task = store.plan().unwrap().task(task_id).unwrap();
    assert_eq!(task.status, TaskStatus::InProgress);
    assert!(task.result.is_none());
}

#[tokio::test]
async fn iteration_cap_ends_the_loop_with_empty_content() {
    let mut client = MockModelClient::new();
    for index in 0..20 {
        client = client.with_tool_calls(vec![tool_request(
            &format!("call_{index}"),
            "read_file",
            json!({"path": "src/lib.rs"}),
        )]);
    }
    let client = Arc::new(client);
    let executor = TaskExecutor::new(Arc::clone(&client) as Arc<dyn ModelClient>, Arc::new(MockToolDispatcher::new()));
    let (mut store, task_id) = single_task_store("Looping");

    let result = executor
        .execute_task(&mut store, task_id, &CancellationToken::new())
        .await
        .unwrap();

    // Ten model round-trips, then the loop gives up without a final
    // answer and the summary falls back to the default.
    assert_eq!(client.call_count(), 10);
    assert!(result.success);
    assert_eq!(result.summary, "Task completed");
    assert!(result.output.is_none());
}
