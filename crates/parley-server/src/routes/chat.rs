use crate::state::AppState;
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::{stream::StreamExt, Stream};
use parley::{
    errors::ProviderError,
    orchestrator::ChatPrompt,
    providers::base::{CompletionEvent, CompletionStream},
};
use serde::Serialize;
use serde_json::json;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

/// Pasted images travel base64-encoded inside the form
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Rejections of the posted form, answered with 400
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidRequest {
    #[error("`content` must be a JSON string.")]
    MissingContent,

    #[error("`content` is not valid JSON.")]
    InvalidJson,
}

impl InvalidRequest {
    fn code(&self) -> &'static str {
        match self {
            InvalidRequest::MissingContent => "missing_content",
            InvalidRequest::InvalidJson => "invalid_json",
        }
    }
}

impl From<MultipartRejection> for InvalidRequest {
    fn from(rejection: MultipartRejection) -> Self {
        debug!("unreadable chat form: {}", rejection);
        InvalidRequest::MissingContent
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Invalid(#[from] InvalidRequest),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ChatError::Invalid(invalid) => (StatusCode::BAD_REQUEST, invalid.code()),
            ChatError::Provider(_) => (StatusCode::INTERNAL_SERVER_ERROR, "provider_error"),
        };
        let body = Json(json!({
            "error": code,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

// Fields of the multipart chat form
#[derive(Debug, Default)]
struct ChatForm {
    content: Option<String>,
    thinking_mode: Option<String>,
    image: Option<String>,
}

impl ChatForm {
    async fn read(mut multipart: Multipart) -> Result<Self, InvalidRequest> {
        let mut form = ChatForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| InvalidRequest::MissingContent)?
        {
            let name = field.name().unwrap_or_default().to_string();
            // An uploaded file is not a JSON string
            if name == "content" && field.file_name().is_some() {
                return Err(InvalidRequest::MissingContent);
            }

            let slot = match name.as_str() {
                "content" => &mut form.content,
                "thinkingMode" => &mut form.thinking_mode,
                "image-base64" => &mut form.image,
                _ => continue,
            };
            *slot = Some(
                field
                    .text()
                    .await
                    .map_err(|_| InvalidRequest::MissingContent)?,
            );
        }

        Ok(form)
    }

    fn prompt(&self) -> Result<ChatPrompt, InvalidRequest> {
        let content = self
            .content
            .as_deref()
            .ok_or(InvalidRequest::MissingContent)?;
        serde_json::from_str(content).map_err(|e| {
            debug!("rejected chat payload: {}", e);
            InvalidRequest::InvalidJson
        })
    }
}

#[derive(Serialize)]
struct ErrorData {
    #[serde(rename = "type")]
    kind: &'static str,
    response: String,
}

// Event stream framing for the browser client
struct ProtocolFormatter;

impl ProtocolFormatter {
    fn format_event(event: &CompletionEvent) -> String {
        let data = serde_json::to_string(event).unwrap_or_else(|_| String::from("{}"));
        Self::frame(event.name(), &data)
    }

    fn format_error(error: &ProviderError) -> String {
        let data = ErrorData {
            kind: "error",
            response: error.to_string(),
        };
        let data = serde_json::to_string(&data).unwrap_or_else(|_| String::from("{}"));
        Self::frame("error", &data)
    }

    fn frame(name: &str, data: &str) -> String {
        format!("event: {}\ndata: {}\n\n", name, data)
    }
}

// Server-sent events backed by the forwarding task's channel
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> Response {
        let body = axum::body::Body::from_stream(self);

        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
            ],
            body,
        )
            .into_response()
    }
}

// Copy provider events onto the channel until the stream ends or the client leaves.
// Dropping the guard on exit cancels any upstream work still in flight.
async fn forward_events(mut stream: CompletionStream, tx: mpsc::Sender<String>, guard: DropGuard) {
    loop {
        tokio::select! {
            _ = tx.closed() => {
                info!("client disconnected, cancelling completion");
                break;
            }
            next = stream.next() => match next {
                Some(Ok(event)) => {
                    if tx.send(ProtocolFormatter::format_event(&event)).await.is_err() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::error!("Error while streaming completion: {}", e);
                    let _ = tx.send(ProtocolFormatter::format_error(&e)).await;
                    break;
                }
                None => break,
            }
        }
    }
    drop(guard);
}

async fn handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<SseResponse, ChatError> {
    let form = ChatForm::read(multipart.map_err(InvalidRequest::from)?).await?;
    let prompt = form.prompt()?;
    let (request, _) = prompt.into_request(form.thinking_mode.as_deref(), form.image);

    // Cancelled when the handler or the forwarding task goes away
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let stream = state.orchestrator.reply(request, cancel).await?;

    let (tx, rx) = mpsc::channel(100);
    tokio::spawn(forward_events(stream, tx, guard));

    Ok(SseResponse::new(ReceiverStream::new(rx)))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
