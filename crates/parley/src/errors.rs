use thiserror::Error;

use crate::providers::utils::is_tool_ordering_violation;

/// Coarse classification of a provider failure, used to decide on recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The provider rejected the history because a tool message had no matching call
    ToolOrdering,
    /// The caller went away before the provider answered
    Cancelled,
    Other,
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Could not decode provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid completion request: {0}")]
    InvalidRequest(String),

    #[error("Request was cancelled")]
    Cancelled,
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Api { message, .. } | ProviderError::Stream(message)
                if is_tool_ordering_violation(message) =>
            {
                ErrorKind::ToolOrdering
            }
            ProviderError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Other,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
