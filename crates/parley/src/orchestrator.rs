//! Drives a single chat request from posted payload to provider stream.
//!
//! The history is repaired with [`fix_orphan_tools`] before the first attempt.
//! If the provider still rejects it for tool ordering, the history is stripped
//! with [`hard_sanitize`] and the request is sent exactly once more.
use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::{ErrorKind, ProviderResult};
use crate::models::content::Content;
use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{CompletionRequest, CompletionStream, Provider};
use crate::reasoning::ModeResolution;
use crate::sanitize::{ensure_non_empty, fix_orphan_tools, hard_sanitize};

/// The JSON document posted in the `content` form field
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPrompt {
    /// Thread the request belongs to, only used for logging
    #[serde(default)]
    pub id: Option<String>,
    /// Prior conversation; left untouched when absent
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    /// The new user turn
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tools: Vec<Tool>,
}

impl ChatPrompt {
    /// Validate the history and assemble the completion request.
    ///
    /// The mode comes from `form_mode` alone, absent meaning standard; a mode
    /// inside the payload is ignored. `image` is attached as given to the new
    /// user turn.
    pub fn into_request(
        self,
        form_mode: Option<&str>,
        image: Option<String>,
    ) -> (CompletionRequest, ModeResolution) {
        let mut messages = self
            .messages
            .map(|history| ensure_non_empty(fix_orphan_tools(history)))
            .unwrap_or_default();

        let image = image.filter(|image| !image.is_empty());
        let turn = match (self.message, image) {
            (Some(text), Some(image)) => Some(Content::with_image(Some(text), image)),
            (Some(text), None) => Some(Content::text(text)),
            (None, Some(image)) => Some(Content::with_image(None, image)),
            (None, None) => None,
        };
        messages.extend(turn.map(Message::user));

        let resolution = ModeResolution::resolve(form_mode);
        info!(
            thread = self.id.as_deref().unwrap_or("-"),
            display_mode = %resolution.display_mode,
            canonical_mode = %resolution.canonical,
            reasoning_effort = %resolution.options.reasoning_effort,
            temperature = resolution.options.temperature,
            "resolved thinking mode"
        );

        let request = CompletionRequest {
            messages: ensure_non_empty(messages),
            tools: self.tools,
            options: resolution.options,
        };
        (request, resolution)
    }
}

/// Where a request is in its recovery cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    FirstAttempt,
    Retried,
}

/// Sends completion requests, recovering once from tool-ordering rejections
#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Open the provider stream for `request`.
    ///
    /// A tool-ordering rejection on the first attempt triggers a single resubmission
    /// with all tool traffic removed. Any other failure, and any failure of the
    /// resubmission, is returned unchanged.
    pub async fn reply(
        &self,
        mut request: CompletionRequest,
        cancel: CancellationToken,
    ) -> ProviderResult<CompletionStream> {
        let mut attempt = Attempt::FirstAttempt;
        loop {
            match self.provider.stream(&request, cancel.clone()).await {
                Ok(stream) => return Ok(stream),
                Err(err)
                    if attempt == Attempt::FirstAttempt
                        && err.kind() == ErrorKind::ToolOrdering =>
                {
                    warn!(
                        error = %err,
                        "provider rejected tool ordering, retrying without tool messages"
                    );
                    request.messages = hard_sanitize(request.messages);
                    attempt = Attempt::Retried;
                }
                Err(err) => {
                    if err.kind() != ErrorKind::Cancelled {
                        tracing::error!(error = %err, attempt = ?attempt, "completion failed");
                    }
                    return Err(err);
                }
            }
        }
    }
}
