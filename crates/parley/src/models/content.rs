use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// One piece of a multimodal message body
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
/// Message body: either a plain string or a list of parts
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for Content {
    fn default() -> Self {
        Content::Text(String::new())
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl Content {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Content::Text(text.into())
    }

    /// Build a body holding an image URL, optionally preceded by text.
    ///
    /// The url is used as given, so a `data:` URL from the browser is passed
    /// through untouched.
    pub fn with_image<S: Into<String>>(text: Option<String>, url: S) -> Self {
        let mut parts = Vec::new();
        if let Some(text) = text {
            parts.push(ContentPart::Text { text });
        }
        parts.push(ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: None,
            },
        });
        Content::Parts(parts)
    }

    /// Concatenate the text of this body, skipping images
    pub fn as_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_string_content() {
        let content: Content = serde_json::from_value(json!("hello")).unwrap();
        assert_eq!(content, Content::text("hello"));
        assert_eq!(serde_json::to_value(&content).unwrap(), json!("hello"));
    }

    #[test]
    fn test_multimodal_content() {
        let value = json!([
            {"type": "text", "text": "what is this?"},
            {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
        ]);
        let content: Content = serde_json::from_value(value.clone()).unwrap();

        assert!(matches!(
            &content,
            Content::Parts(parts) if matches!(parts[1], ContentPart::ImageUrl { .. })
        ));
        assert_eq!(content.as_text(), "what is this?");
        assert_eq!(serde_json::to_value(&content).unwrap(), value);
    }

    #[test]
    fn test_with_image_keeps_url_verbatim() {
        let url = "data:image/jpeg;base64,/9j/4AAQ";
        let content = Content::with_image(Some("look".to_string()), url);

        assert_eq!(
            serde_json::to_value(&content).unwrap(),
            json!([
                {"type": "text", "text": "look"},
                {"type": "image_url", "image_url": {"url": url}}
            ])
        );
    }
}
