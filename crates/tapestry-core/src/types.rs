use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant output.
    Assistant,
    /// Tool execution result.
    Tool,
}

/// A single role-tagged message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author.
    pub role: Role,
    /// Message content.
    pub content: String,
    /// Identifier of the tool call this message answers, for tool results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Creates a system message.
    pub fn system<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Creates a user message.
    pub fn user<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Creates an assistant message.
    pub fn assistant<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
        }
    }
}

/// One assistant turn: either plain text or a batch of tool-call requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssistantTurn {
    /// Plain text answer; ends the task's iteration loop.
    Text(String),
    /// Tool calls to execute, in the order the model requested them.
    ToolCalls(Vec<ToolCallRequest>),
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifier assigned by the model, echoed back in the result.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Tool-specific arguments.
    pub arguments: Value,
}

/// Result of one tool invocation, fed back into the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMessage {
    /// Identifier of the originating tool call.
    pub call_id: String,
    /// Name of the tool that produced this result.
    pub name: String,
    /// Result content, or an error description when `is_error` is set.
    pub content: String,
    /// Whether the invocation failed.
    pub is_error: bool,
}

impl ToolMessage {
    /// Creates a successful tool result.
    pub fn ok<T: Into<String>>(call_id: T, name: T, content: T) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Creates an error-tagged tool result.
    ///
    /// Tool failures are represented as normal results so the executor
    /// loop can feed them back to the model and continue.
    pub fn error<T: Into<String>>(call_id: T, name: T, content: T) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Renders this result as a conversation message.
    pub fn into_message(self) -> Message {
        let content = if self.is_error {
            format!("ERROR [{}]: {}", self.name, self.content)
        } else {
            self.content
        };
        Message {
            role: Role::Tool,
            content,
            tool_call_id: Some(self.call_id),
        }
    }
}

/// Description of an available tool, advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name from the fixed allow-list.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON schema for the tool's arguments.
    pub parameters: Value,
}
