use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{Message, Result, ToolCallRequest, ToolMessage, ToolSpec};

/// Trait for the language-model transport.
///
/// The engine stays agnostic to the wire protocol; implementations must
/// surface cancellation as [`crate::Error::Cancelled`], distinct from
/// ordinary failures.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Returns the unique identifier for this client.
    fn name(&self) -> &'static str;

    /// Sends an ordered conversation and returns one assistant turn.
    ///
    /// The turn is either plain text or a list of tool-call requests.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] when `cancel` fires, or
    /// another error when the request fails or the response cannot be
    /// parsed.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        cancel: &CancellationToken,
    ) -> Result<crate::AssistantTurn>;
}

/// Trait for the external tool-execution collaborator.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Executes one tool call and returns its result turn.
    ///
    /// Tool failures should be reported as error-tagged
    /// [`ToolMessage`]s, not as errors, so the executor loop can feed
    /// them back to the model and continue.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] when `cancel` fires; any
    /// other error is converted into an error-tagged result by the
    /// executor.
    async fn execute(
        &self,
        request: &ToolCallRequest,
        cancel: &CancellationToken,
    ) -> Result<ToolMessage>;
}
