use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::errors::ProviderResult;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};
use crate::reasoning::ReasoningOptions;

/// Everything a provider needs for one completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub options: ReasoningOptions,
}

/// Incremental output of a streaming completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "response", rename_all = "camelCase")]
pub enum CompletionEvent {
    /// New text, with everything streamed so far
    Content { delta: String, snapshot: String },
    /// A tool call the model finished emitting
    ToolCall(ToolCall),
    /// The complete assistant text once the stream is over
    FinalContent(String),
    /// The caller cancelled while the stream was running
    Abort(String),
}

impl CompletionEvent {
    /// Event name used on the downstream event stream
    pub fn name(&self) -> &'static str {
        match self {
            CompletionEvent::Content { .. } => "content",
            CompletionEvent::ToolCall(_) => "toolCall",
            CompletionEvent::FinalContent(_) => "finalContent",
            CompletionEvent::Abort(_) => "abort",
        }
    }
}

pub type CompletionStream = BoxStream<'static, ProviderResult<CompletionEvent>>;

/// Base trait for chat completion providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Open a streaming completion.
    ///
    /// Errors returned here happen before any output was produced, so the call
    /// may be retried. Failures after that arrive as items of the stream.
    async fn stream(
        &self,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> ProviderResult<CompletionStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_serialization() -> anyhow::Result<()> {
        let event = CompletionEvent::Content {
            delta: "lo".to_string(),
            snapshot: "hello".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event)?,
            json!({"type": "content", "response": {"delta": "lo", "snapshot": "hello"}})
        );

        let event = CompletionEvent::FinalContent("hello".to_string());
        assert_eq!(
            serde_json::to_value(&event)?,
            json!({"type": "finalContent", "response": "hello"})
        );

        let event = CompletionEvent::ToolCall(ToolCall::new("a", "f", "{}"));
        let value = serde_json::to_value(&event)?;
        assert_eq!(value["type"], event.name());
        assert_eq!(value["response"]["id"], "a");
        Ok(())
    }

    #[test]
    fn test_request_defaults() -> anyhow::Result<()> {
        let request: CompletionRequest =
            serde_json::from_value(json!({"messages": [{"role": "user", "content": "hi"}]}))?;
        assert!(request.tools.is_empty());
        assert_eq!(request.options, ReasoningOptions::default());
        Ok(())
    }
}
