use serde_json::json;

use crate::types::ToolSpec;

/// The fixed tool allow-list.
///
/// Constrains decomposition output and classifies read/write effects;
/// the concrete implementations live behind [`crate::ToolDispatcher`].
pub const ALLOWED_TOOLS: [&str; 9] = [
    "read_file",
    "create_file",
    "insert_lines",
    "replace_lines",
    "delete_lines",
    "search_files",
    "execute_bash",
    "fetch_url",
    "web_search",
];

/// Effect a tool has on the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolEffect {
    /// Reads files or external data without modifying the workspace.
    Read,
    /// Creates or modifies workspace files.
    Mutate,
}

/// Returns `true` if the name is on the allow-list.
pub fn is_allowed_tool(name: &str) -> bool {
    ALLOWED_TOOLS.contains(&name)
}

/// Classifies an allow-listed tool's workspace effect.
///
/// Returns `None` for names outside the allow-list.
pub fn tool_effect(name: &str) -> Option<ToolEffect> {
    match name {
        "read_file" | "search_files" | "fetch_url" | "web_search" => Some(ToolEffect::Read),
        "create_file" | "insert_lines" | "replace_lines" | "delete_lines" => {
            Some(ToolEffect::Mutate)
        }
        // Bash can mutate anything it touches; classify conservatively.
        "execute_bash" => Some(ToolEffect::Mutate),
        _ => None,
    }
}

/// Default specs for the full allow-list, advertised to the model.
pub fn default_tool_specs() -> Vec<ToolSpec> {
    ALLOWED_TOOLS
        .iter()
        .map(|name| ToolSpec {
            name: (*name).to_owned(),
            description: describe_tool(name).to_owned(),
            parameters: parameters_schema(name),
        })
        .collect()
}

fn describe_tool(name: &str) -> &'static str {
    match name {
        "read_file" => "Read the contents of a file",
        "create_file" => "Create a file with the given content",
        "insert_lines" => "Insert lines into a file at a position",
        "replace_lines" => "Replace a line range in a file",
        "delete_lines" => "Delete a line range from a file",
        "search_files" => "Search files for a pattern",
        "execute_bash" => "Run a shell command",
        "fetch_url" => "Fetch the contents of a URL",
        "web_search" => "Search the web",
        _ => "",
    }
}

fn parameters_schema(name: &str) -> serde_json::Value {
    match name {
        "read_file" | "create_file" | "insert_lines" | "replace_lines" | "delete_lines" => json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path" }
            },
            "required": ["path"]
        }),
        "search_files" | "web_search" => json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query" }
            },
            "required": ["query"]
        }),
        "execute_bash" => json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "Command to run" }
            },
            "required": ["command"]
        }),
        "fetch_url" => json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "URL to fetch" }
            },
            "required": ["url"]
        }),
        _ => json!({ "type": "object" }),
    }
}
