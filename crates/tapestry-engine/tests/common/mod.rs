//! Mock collaborators for engine integration tests.
//!
//! Scripted turns and recorded call history, enabling end-to-end plan
//! runs without real API calls or real tools.
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use tapestry_core::{
    AssistantTurn, Error, Message, ModelClient, Result, Role, ToolCallRequest, ToolDispatcher,
    ToolMessage, ToolSpec,
};

/// Initializes tracing once so tests can opt into log output with
/// `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _unused = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// One scripted model turn.
enum ScriptedTurn {
    /// Return this assistant turn.
    Turn(AssistantTurn),
    /// Fail with a provider error.
    Fail(String),
}

/// Model client that replays scripted turns in order.
///
/// Turns are consumed front to back; when the script is exhausted the
/// default response is returned. Every call's last user/tool message is
/// recorded for verification.
pub struct MockModelClient {
    script: Mutex<VecDeque<ScriptedTurn>>,
    default_response: String,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockModelClient {
    /// Creates a client with an empty script.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_response: "Task completed".to_owned(),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a plain-text turn.
    #[must_use]
    pub fn with_text(self, text: &str) -> Self {
        self.push(ScriptedTurn::Turn(AssistantTurn::Text(text.to_owned())));
        self
    }

    /// Queues a tool-call turn.
    #[must_use]
    pub fn with_tool_calls(self, requests: Vec<ToolCallRequest>) -> Self {
        self.push(ScriptedTurn::Turn(AssistantTurn::ToolCalls(requests)));
        self
    }

    /// Queues a provider failure.
    #[must_use]
    pub fn with_failure(self, message: &str) -> Self {
        self.push(ScriptedTurn::Fail(message.to_owned()));
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.call_history.lock().map(|history| history.len()).unwrap_or(0)
    }

    /// Content of the last message of each call, in call order.
    pub fn call_history(&self) -> Vec<String> {
        self.call_history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    fn push(&self, turn: ScriptedTurn) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(turn);
        }
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[ToolSpec],
        cancel: &CancellationToken,
    ) -> Result<AssistantTurn> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if let Ok(mut history) = self.call_history.lock() {
            let last = messages
                .last()
                .map(|message| message.content.clone())
                .unwrap_or_default();
            history.push(last);
        }

        let scripted = self.script.lock().ok().and_then(|mut script| script.pop_front());
        match scripted {
            Some(ScriptedTurn::Turn(turn)) => Ok(turn),
            Some(ScriptedTurn::Fail(message)) => Err(Error::Provider(message)),
            None => Ok(AssistantTurn::Text(self.default_response.clone())),
        }
    }
}

/// Tool dispatcher that records requests and returns canned results.
pub struct MockToolDispatcher {
    executed: Arc<Mutex<Vec<ToolCallRequest>>>,
    failing_tools: Vec<String>,
}

impl MockToolDispatcher {
    /// Creates a dispatcher where every tool succeeds.
    pub fn new() -> Self {
        Self {
            executed: Arc::new(Mutex::new(Vec::new())),
            failing_tools: Vec::new(),
        }
    }

    /// Makes the named tool fail with a dispatch error.
    #[must_use]
    pub fn with_failing_tool(mut self, name: &str) -> Self {
        self.failing_tools.push(name.to_owned());
        self
    }

    /// Names of executed tools, in execution order.
    pub fn executed_tools(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|requests| requests.iter().map(|request| request.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ToolDispatcher for MockToolDispatcher {
    async fn execute(
        &self,
        request: &ToolCallRequest,
        cancel: &CancellationToken,
    ) -> Result<ToolMessage> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if let Ok(mut executed) = self.executed.lock() {
            executed.push(request.clone());
        }

        if self.failing_tools.iter().any(|name| *name == request.name) {
            return Err(Error::Tool(format!("{} is unavailable", request.name)));
        }

        Ok(ToolMessage::ok(
            request.id.clone(),
            request.name.clone(),
            format!("{} result", request.name),
        ))
    }
}

/// Builds a tool-call request with the given name and arguments.
pub fn tool_request(id: &str, name: &str, arguments: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_owned(),
        name: name.to_owned(),
        arguments,
    }
}

/// Convenience: asserts a message has the tool role.
pub fn is_tool_message(message: &Message) -> bool {
    message.role == Role::Tool
}
