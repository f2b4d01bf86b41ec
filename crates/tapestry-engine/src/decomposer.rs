use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use tapestry_core::{
    ALLOWED_TOOLS, AssistantTurn, Message, ModelClient, PlanningConfig, Result, TaskDefinition,
    TaskId,
};

use crate::analyzer::QueryAnalysis;
use crate::prompts;

/// Number of allow-list entries granted to the fallback task.
const FALLBACK_TOOL_COUNT: usize = 5;

/// Outcome of decomposing a request.
#[derive(Debug)]
pub struct Decomposition {
    /// Task definitions ready for plan creation, never empty.
    pub definitions: Vec<TaskDefinition>,
    /// Whether the fallback single-task plan was substituted.
    pub used_fallback: bool,
}

/// Task element as proposed by the model.
#[derive(Debug, Deserialize)]
struct ProposedTask {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    acceptance_criteria: Vec<String>,
    #[serde(default)]
    dependencies: Vec<i64>,
    #[serde(default)]
    required_tools: Vec<String>,
}

/// Matches a fenced code block, with or without a language tag.
static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[a-zA-Z]*\s*\n(.*?)```").unwrap_or_else(|error| {
        panic!("invalid fenced-block pattern: {error}");
    })
});

/// Decomposes a request into dependency-ordered task definitions with
/// one model call, falling back to a single-task plan when the
/// response cannot be used.
pub struct TaskDecomposer {
    client: Arc<dyn ModelClient>,
    config: PlanningConfig,
}

impl TaskDecomposer {
    /// Creates a decomposer over the given model client.
    pub fn new(client: Arc<dyn ModelClient>, config: PlanningConfig) -> Self {
        Self { client, config }
    }

    /// Decomposes the query into task definitions.
    ///
    /// Issues exactly one model call. Any parsing or transport failure
    /// is absorbed into the fallback plan; cancellation is not.
    ///
    /// # Errors
    /// Returns [`tapestry_core::Error::Cancelled`] when the model call
    /// is cancelled.
    pub async fn decompose(
        &self,
        query: &str,
        analysis: &QueryAnalysis,
        cancel: &CancellationToken,
    ) -> Result<Decomposition> {
        let messages = vec![
            Message::system(prompts::decomposition_system_prompt()),
            Message::user(prompts::decomposition_prompt(
                query,
                analysis,
                &ALLOWED_TOOLS,
                self.config.max_tasks_per_plan,
            )),
        ];

        let turn = match self.client.complete(&messages, &[], cancel).await {
            Ok(turn) => turn,
            Err(error) if error.is_cancelled() => return Err(error),
            Err(error) => {
                tracing::warn!("Decomposition call failed, using fallback plan: {error}");
                return Ok(Self::fallback(query));
            }
        };

        let AssistantTurn::Text(text) = turn else {
            tracing::warn!("Decomposition returned tool calls, using fallback plan");
            return Ok(Self::fallback(query));
        };

        match self.parse_definitions(&text) {
            Some(definitions) if !definitions.is_empty() => Ok(Decomposition {
                definitions,
                used_fallback: false,
            }),
            _ => {
                tracing::warn!("Decomposition response unparseable, using fallback plan");
                Ok(Self::fallback(query))
            }
        }
    }

    /// Parses the model's response into definitions.
    ///
    /// Returns `None` when the text is not a JSON array; individually
    /// invalid elements are dropped without failing the whole parse.
    fn parse_definitions(&self, text: &str) -> Option<Vec<TaskDefinition>> {
        let payload = extract_json_payload(text);
        let parsed: Value = serde_json::from_str(payload.trim()).ok()?;
        let elements = parsed.as_array()?;

        // First pass: validate elements, keeping the original array
        // position so dependency indices resolve against siblings.
        let mut proposals: Vec<Option<ProposedTask>> = Vec::with_capacity(elements.len());
        for element in elements {
            let proposal = serde_json::from_value::<ProposedTask>(element.clone())
                .ok()
                .filter(|task| {
                    !task.title.trim().is_empty() && !task.description.trim().is_empty()
                });
            proposals.push(proposal);
        }

        let ids: Vec<Option<TaskId>> = proposals
            .iter()
            .map(|proposal| proposal.as_ref().map(|_| TaskId::generate()))
            .collect();

        let mut definitions = Vec::new();
        for (position, proposal) in proposals.into_iter().enumerate() {
            let Some(proposal) = proposal else { continue };
            let Some(id) = ids[position] else { continue };
            if definitions.len() >= self.config.max_tasks_per_plan {
                tracing::warn!(
                    "Decomposition proposed more than {} tasks, truncating",
                    self.config.max_tasks_per_plan
                );
                break;
            }

            let dependencies = resolve_dependencies(&proposal.dependencies, position, &ids);
            let mut definition = TaskDefinition::new(proposal.title, proposal.description)
                .with_acceptance_criteria(proposal.acceptance_criteria)
                .with_dependencies(dependencies)
                .with_required_tools(proposal.required_tools);
            definition.id = id;
            definitions.push(definition);
        }

        Some(definitions)
    }

    /// Builds the fallback single-task plan over the verbatim query.
    fn fallback(query: &str) -> Decomposition {
        let tools = ALLOWED_TOOLS
            .iter()
            .take(FALLBACK_TOOL_COUNT)
            .map(|name| (*name).to_owned())
            .collect();
        let definition = TaskDefinition::new("Complete the request".to_owned(), query.to_owned())
            .with_required_tools(tools);
        Decomposition {
            definitions: vec![definition],
            used_fallback: true,
        }
    }
}

/// Locates a fenced code block if present, else returns the raw text.
fn extract_json_payload(text: &str) -> &str {
    FENCED_BLOCK
        .captures(text)
        .and_then(|capture| capture.get(1))
        .map_or(text, |inner| inner.as_str())
}

/// Resolves 0-based sibling indices to generated ids, dropping
/// self-references, out-of-range indices, and references to elements
/// that failed validation.
fn resolve_dependencies(
    indices: &[i64],
    position: usize,
    ids: &[Option<TaskId>],
) -> Vec<TaskId> {
    indices
        .iter()
        .filter_map(|&index| {
            let index = usize::try_from(index).ok()?;
            if index == position {
                return None;
            }
            ids.get(index).copied().flatten()
        })
        .collect()
}
