use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use super::content::Content;
use super::tool::ToolCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
/// A message to or from an LLM, one variant per role
pub enum Message {
    System {
        #[serde(default)]
        content: Content,
    },
    User {
        #[serde(default)]
        content: Content,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Assistant {
        /// May be null when the turn only carries tool calls
        #[serde(default)]
        content: Option<Content>,
        /// `Some(vec![])` and `None` are distinct on the wire, the validator folds the former
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
    },
    Tool {
        #[serde(default)]
        content: Content,
        /// An absent id deserializes to the empty string, which never matches a call
        #[serde(default)]
        tool_call_id: String,
    },
}

impl Message {
    pub fn system<C: Into<Content>>(content: C) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user<C: Into<Content>>(content: C) -> Self {
        Message::User {
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant<C: Into<Content>>(content: C) -> Self {
        Message::Assistant {
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    /// Create an assistant turn that requests the given tool calls
    pub fn assistant_with_tool_calls(content: Option<Content>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content,
            tool_calls: Some(tool_calls),
        }
    }

    /// Create a tool result answering the call with `tool_call_id`
    pub fn tool<S: Into<String>, C: Into<Content>>(tool_call_id: S, content: C) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant { .. } => Role::Assistant,
            Message::Tool { .. } => Role::Tool,
        }
    }

    /// The tool calls of an assistant message, if the field is present
    pub fn tool_calls(&self) -> Option<&[ToolCall]> {
        match self {
            Message::Assistant {
                tool_calls: Some(calls),
                ..
            } => Some(calls),
            _ => None,
        }
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Message::Tool { tool_call_id, .. } => Some(tool_call_id),
            _ => None,
        }
    }

    /// Text of the message body, empty when there is none
    pub fn text(&self) -> String {
        match self {
            Message::System { content }
            | Message::User { content, .. }
            | Message::Tool { content, .. } => content.as_text(),
            Message::Assistant { content, .. } => {
                content.as_ref().map(Content::as_text).unwrap_or_default()
            }
        }
    }
}
