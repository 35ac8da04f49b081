use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::base::{CompletionEvent, CompletionRequest, CompletionStream, Provider};
use super::configs::ProviderConfig;
use super::sse::{SseDecoder, DONE};
use super::utils::{create_request_payload, extract_error_message};
use crate::errors::{ProviderError, ProviderResult};
use crate::models::tool::ToolCall;

const ABORT_MESSAGE: &str = "Chat aborted";

/// Where and how to send chat completions
#[derive(Debug, Clone)]
struct Endpoint {
    url: String,
    query: Vec<(&'static str, String)>,
    auth_header: &'static str,
    auth_value: String,
    /// Azure addresses the model through the deployment, so it is omitted there
    model: Option<String>,
    max_tokens: Option<i32>,
}

impl From<ProviderConfig> for Endpoint {
    fn from(config: ProviderConfig) -> Self {
        match config {
            ProviderConfig::OpenAi(config) => Endpoint {
                url: format!("{}/v1/chat/completions", config.host.trim_end_matches('/')),
                query: Vec::new(),
                auth_header: "Authorization",
                auth_value: format!("Bearer {}", config.api_key),
                model: Some(config.model),
                max_tokens: config.max_tokens,
            },
            ProviderConfig::Azure(config) => Endpoint {
                url: format!(
                    "{}/openai/deployments/{}/chat/completions",
                    config.endpoint.trim_end_matches('/'),
                    config.deployment
                ),
                query: vec![("api-version", config.api_version)],
                auth_header: "api-key",
                auth_value: config.api_key,
                model: None,
                max_tokens: config.max_tokens,
            },
        }
    }
}

/// Streaming client for OpenAI-compatible chat completions
pub struct OpenAiProvider {
    client: Client,
    endpoint: Endpoint,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        // every completion is a fresh POST, nothing is cached
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint: Endpoint::from(config),
        })
    }

    pub fn url(&self) -> &str {
        &self.endpoint.url
    }

    async fn post(&self, payload: &Value) -> ProviderResult<Response> {
        let response = self
            .client
            .post(&self.endpoint.url)
            .query(&self.endpoint.query)
            .header(self.endpoint.auth_header, &self.endpoint.auth_value)
            .header(ACCEPT, "text/event-stream")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Api {
            status: status.as_u16(),
            message: extract_error_message(&body),
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn stream(
        &self,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> ProviderResult<CompletionStream> {
        let payload = create_request_payload(
            request,
            self.endpoint.model.as_deref(),
            self.endpoint.max_tokens,
        )?;

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            response = self.post(&payload) => response?,
        };
        tracing::debug!(url = %self.endpoint.url, "completion stream opened");

        Ok(Box::pin(completion_events(response.bytes_stream(), cancel)))
    }
}

/// Tool call assembled from streamed fragments
#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Running totals of a streamed completion
#[derive(Debug, Default)]
struct StreamState {
    content: String,
    tool_calls: BTreeMap<u64, PartialToolCall>,
}

impl StreamState {
    fn apply(&mut self, data: &str) -> ProviderResult<Vec<CompletionEvent>> {
        let chunk: Value = serde_json::from_str(data)?;
        if let Some(error) = chunk.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(ProviderError::Stream(message));
        }

        let mut events = Vec::new();
        // content filter results arrive with an empty choices list
        let Some(delta) = chunk.pointer("/choices/0/delta") else {
            return Ok(events);
        };

        if let Some(text) = delta.get("content").and_then(Value::as_str) {
            if !text.is_empty() {
                self.content.push_str(text);
                events.push(CompletionEvent::Content {
                    delta: text.to_string(),
                    snapshot: self.content.clone(),
                });
            }
        }

        if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
            for call in calls {
                let index = call.get("index").and_then(Value::as_u64).unwrap_or(0);
                let entry = self.tool_calls.entry(index).or_default();
                if let Some(id) = call.get("id").and_then(Value::as_str) {
                    entry.id = id.to_string();
                }
                if let Some(function) = call.get("function") {
                    if let Some(name) = function.get("name").and_then(Value::as_str) {
                        entry.name.push_str(name);
                    }
                    if let Some(arguments) = function.get("arguments").and_then(Value::as_str) {
                        entry.arguments.push_str(arguments);
                    }
                }
            }
        }

        Ok(events)
    }

    fn finish(self) -> Vec<CompletionEvent> {
        let mut events: Vec<CompletionEvent> = self
            .tool_calls
            .into_values()
            .map(|call| {
                CompletionEvent::ToolCall(ToolCall::new(call.id, call.name, call.arguments))
            })
            .collect();
        events.push(CompletionEvent::FinalContent(self.content));
        events
    }
}

enum Step<T> {
    Cancelled,
    Chunk(Option<T>),
}

/// Turn the raw upstream body into completion events
fn completion_events<S, B>(
    body: S,
    cancel: CancellationToken,
) -> impl Stream<Item = ProviderResult<CompletionEvent>> + Send + 'static
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    async_stream::stream! {
        let mut body = Box::pin(body);
        let mut decoder = SseDecoder::new();
        let mut state = StreamState::default();
        let mut ended = false;

        'read: loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                chunk = body.next() => Step::Chunk(chunk),
            };

            let payloads = match step {
                Step::Cancelled => {
                    tracing::info!("completion stream cancelled by caller");
                    yield Ok(CompletionEvent::Abort(ABORT_MESSAGE.to_string()));
                    return;
                }
                Step::Chunk(Some(Ok(bytes))) => decoder.push(bytes.as_ref()),
                Step::Chunk(Some(Err(e))) => {
                    yield Err(ProviderError::Stream(e.to_string()));
                    return;
                }
                Step::Chunk(None) => {
                    ended = true;
                    decoder.finish().into_iter().collect()
                }
            };

            for data in payloads {
                if data == DONE {
                    break 'read;
                }
                match state.apply(&data) {
                    Ok(events) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            if ended {
                break;
            }
        }

        for event in state.finish() {
            yield Ok(event);
        }
    }
}
