//! Wire-facing message types shared by the provider clients

use serde::Serialize;

/// Fixed system prompt sent at the head of every chat request.
pub const SYSTEM_PROMPT: &str = "You are Auralis, a helpful and funny AI assistant who gives \
detailed responses. You can engage in conversations on a wide range of topics and help users \
with various tasks. Be friendly and informative in your responses.";

/// One entry in the message list sent to the chat completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: String,
}

impl ApiMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}
