//! Repairs for chat histories that would break the provider's tool-call contract.
//!
//! The provider rejects a whole request when a `tool` message does not answer one
//! of the calls made by the assistant turn right before it. Histories posted by
//! the browser can violate this after a failed or interrupted tool run, so every
//! history goes through [`fix_orphan_tools`] first and, if the provider still
//! complains, through [`hard_sanitize`].
use std::collections::HashSet;

use crate::models::message::Message;

/// Body of the message sent in place of a history that sanitized down to nothing
pub const PLACEHOLDER_CONTENT: &str = "(ignore tool output and continue)";

/// The user message that stands in for an empty history
pub fn placeholder_message() -> Message {
    Message::user(PLACEHOLDER_CONTENT)
}

/// Substitute the placeholder message when `messages` is empty
pub fn ensure_non_empty(messages: Vec<Message>) -> Vec<Message> {
    if messages.is_empty() {
        vec![placeholder_message()]
    } else {
        messages
    }
}

/// Drop every `tool` message that does not answer a call of the preceding assistant turn.
///
/// Relative order of the kept messages is preserved. An assistant message with an
/// empty `tool_calls` list is kept with the field removed. Dropped messages are not
/// reported to the caller. The output may be empty; see [`ensure_non_empty`].
pub fn fix_orphan_tools(messages: Vec<Message>) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len());
    let mut permitted: Option<HashSet<String>> = None;

    for message in messages {
        match message {
            Message::Assistant {
                content,
                tool_calls,
            } => {
                permitted = None;
                let tool_calls = match tool_calls {
                    Some(calls) if !calls.is_empty() => {
                        permitted = Some(
                            calls
                                .iter()
                                .filter(|call| !call.id.is_empty())
                                .map(|call| call.id.clone())
                                .collect(),
                        );
                        Some(calls)
                    }
                    _ => None,
                };
                out.push(Message::Assistant {
                    content,
                    tool_calls,
                });
            }
            Message::Tool {
                ref tool_call_id, ..
            } => {
                let answered = permitted
                    .as_ref()
                    .is_some_and(|ids| ids.contains(tool_call_id));
                if answered {
                    out.push(message);
                } else {
                    tracing::debug!(
                        tool_call_id = %tool_call_id,
                        output_bytes = message.text().len(),
                        "dropping orphan tool message"
                    );
                }
            }
            Message::User { .. } | Message::System { .. } => {
                permitted = None;
                out.push(message);
            }
        }
    }

    out
}

/// Strip all tool traffic from a history.
///
/// Every `tool` message is removed and every assistant turn loses its
/// `tool_calls` while keeping its content. Never returns an empty history.
pub fn hard_sanitize(messages: Vec<Message>) -> Vec<Message> {
    let out = messages
        .into_iter()
        .filter_map(|message| match message {
            Message::Tool { .. } => None,
            Message::Assistant { content, .. } => Some(Message::Assistant {
                content,
                tool_calls: None,
            }),
            other => Some(other),
        })
        .collect();

    ensure_non_empty(out)
}
