//! Wire types for the OpenAI-compatible `chat/completions` endpoint.
//!
//! Only the non-streaming shape is modelled: one request carrying a list of
//! role/content messages and one response carrying a list of choices.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ChatResponseChoice {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub message: ChatResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatResponseChoice>,
}

impl ChatResponse {
    /// Builds a response whose choices carry the given reply texts.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices = replies
            .into_iter()
            .enumerate()
            .map(|(index, reply)| ChatResponseChoice {
                index: Some(index as u32),
                message: ChatResponseMessage {
                    role: Some("assistant".to_string()),
                    content: Some(reply.into()),
                },
                finish_reason: Some("stop".to_string()),
            })
            .collect();
        Self { choices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_single_user_message() {
        let request = ChatRequest {
            model: "llama3-70b-8192".to_string(),
            messages: vec![ChatMessage::user("As Sherlock, continue")],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "llama3-70b-8192",
                "messages": [{"role": "user", "content": "As Sherlock, continue"}]
            })
        );
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let raw = r#"{"id":"x","choices":[{"message":{"content":"Elementary."}}],"usage":{}}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("Elementary.")
        );

        let empty: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.choices.is_empty());
    }
}
