use regex::Regex;
use serde_json::{json, Value};

use super::base::CompletionRequest;
use crate::errors::{ProviderError, ProviderResult};
use crate::models::tool::Tool;

/// Text the provider puts in its rejection of a tool message without a matching call.
///
/// The spelling "preceeding" is the provider's own.
pub const TOOL_ORDERING_MESSAGE: &str =
    "role 'tool' must be a response to a preceeding message with 'tool_calls'";

/// Longest slice of a non-JSON error body carried into an error message
const ERROR_BODY_LIMIT: usize = 400;

/// Whether a provider error message reports a tool message without a matching call.
///
/// This is a plain substring match on the provider's wording. It silently stops
/// matching if the provider rewords the message, so confirm the current text
/// against a live rejection before touching [`TOOL_ORDERING_MESSAGE`].
pub fn is_tool_ordering_violation(message: &str) -> bool {
    message.contains(TOOL_ORDERING_MESSAGE)
}

/// Pull a readable message out of an error response body
pub fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let message = value
            .get("error")
            .and_then(|error| error.get("message").or(Some(error)))
            .and_then(Value::as_str)
            .or_else(|| value.get("message").and_then(Value::as_str));
        if let Some(message) = message {
            return message.to_string();
        }
    }
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

/// Convert tool definitions to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> ProviderResult<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !is_valid_function_name(&tool.name) {
            return Err(ProviderError::InvalidRequest(format!(
                "Tool name '{}' must match [a-zA-Z0-9_-]+",
                tool.name
            )));
        }
        if !tool_names.insert(&tool.name) {
            return Err(ProviderError::InvalidRequest(format!(
                "Duplicate tool name: {}",
                tool.name
            )));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// Build a streaming chat completions body
pub fn create_request_payload(
    request: &CompletionRequest,
    model: Option<&str>,
    max_tokens: Option<i32>,
) -> ProviderResult<Value> {
    let mut payload = json!({
        "messages": request.messages,
        "stream": true,
        "reasoning_effort": request.options.reasoning_effort,
        "temperature": request.options.temperature,
    });
    let object = payload
        .as_object_mut()
        .ok_or_else(|| ProviderError::InvalidRequest("payload is not an object".to_string()))?;

    if let Some(model) = model {
        object.insert("model".to_string(), json!(model));
    }
    if let Some(tokens) = max_tokens {
        object.insert("max_tokens".to_string(), json!(tokens));
    }
    let tools = tools_to_openai_spec(&request.tools)?;
    if !tools.is_empty() {
        object.insert("tools".to_string(), json!(tools));
    }

    Ok(payload)
}

fn is_valid_function_name(name: &str) -> bool {
    Regex::new(r"^[a-zA-Z0-9_-]+$")
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Message;
    use crate::reasoning::{ReasoningOptions, ThinkingMode};

    fn weather_tool(name: &str) -> Tool {
        Tool::new(
            name,
            "Gets the weather",
            json!({
                "type": "object",
                "properties": {"location": {"type": "string"}},
                "required": ["location"]
            }),
        )
    }

    #[test]
    fn test_tool_ordering_predicate() {
        assert!(is_tool_ordering_violation(&format!(
            "Invalid parameter: messages with {}.",
            TOOL_ORDERING_MESSAGE
        )));
        assert!(!is_tool_ordering_violation("Invalid parameter: messages"));
        // the corrected spelling is not what the provider sends
        assert!(!is_tool_ordering_violation(
            "role 'tool' must be a response to a preceding message with 'tool_calls'"
        ));
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error": {"message": "bad things", "code": "x"}}"#;
        assert_eq!(extract_error_message(body), "bad things");

        let body = r#"{"error": "flat error"}"#;
        assert_eq!(extract_error_message(body), "flat error");

        let body = r#"{"message": "top level"}"#;
        assert_eq!(extract_error_message(body), "top level");

        assert_eq!(extract_error_message("gateway timeout"), "gateway timeout");

        let long = "x".repeat(1000);
        assert_eq!(extract_error_message(&long).len(), 400);
    }

    #[test]
    fn test_tools_to_openai_spec() -> anyhow::Result<()> {
        let spec = tools_to_openai_spec(&[weather_tool("get_weather")])?;

        assert_eq!(spec.len(), 1);
        assert_eq!(spec[0]["type"], "function");
        assert_eq!(spec[0]["function"]["name"], "get_weather");
        assert_eq!(spec[0]["function"]["parameters"]["required"][0], "location");
        Ok(())
    }

    #[test]
    fn test_tools_to_openai_spec_duplicate() {
        let result = tools_to_openai_spec(&[weather_tool("dup"), weather_tool("dup")]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Duplicate tool name"));
    }

    #[test]
    fn test_tools_to_openai_spec_invalid_name() {
        let result = tools_to_openai_spec(&[weather_tool("get weather")]);
        assert!(matches!(result, Err(ProviderError::InvalidRequest(_))));
    }

    #[test]
    fn test_create_request_payload() -> anyhow::Result<()> {
        let request = CompletionRequest {
            messages: vec![Message::user("hi")],
            tools: vec![],
            options: ReasoningOptions::for_mode(ThinkingMode::Fast),
        };

        let payload = create_request_payload(&request, Some("gpt-4o"), Some(512))?;
        assert_eq!(payload["model"], "gpt-4o");
        assert_eq!(payload["stream"], true);
        assert_eq!(payload["reasoning_effort"], "low");
        assert_eq!(payload["temperature"], 0.1);
        assert_eq!(payload["max_tokens"], 512);
        assert_eq!(payload["messages"], json!([{"role": "user", "content": "hi"}]));
        assert!(payload.get("tools").is_none());

        let payload = create_request_payload(&request, None, None)?;
        assert!(payload.get("model").is_none());
        assert!(payload.get("max_tokens").is_none());
        Ok(())
    }
}
