//! Wire types for the chat relay
//!
//! Inbound bodies are validated by hand (see `ChatRequest::from_body`) so that
//! every malformed shape produces the same client-facing 400 instead of an
//! extractor rejection.

use serde::{Deserialize, Serialize};

/// Role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in conversation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[cfg(test)]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[cfg(test)]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Validated inbound chat request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct RawChatRequest {
    messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Parse and validate a raw request body.
    ///
    /// Returns `None` when the body is not JSON, `messages` is missing or not
    /// an array, the array is empty, or any item lacks a known `role` or a
    /// string `content`.
    pub fn from_body(body: &[u8]) -> Option<Self> {
        let raw: RawChatRequest = serde_json::from_slice(body).ok()?;
        if raw.messages.is_empty() {
            return None;
        }
        Some(Self {
            messages: raw.messages,
        })
    }

    /// Build the outbound conversation: the server prompt first, then every
    /// caller message that is not a system message, in original order.
    pub fn with_system_prompt(self, prompt: &str) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::system(prompt))
            .chain(
                self.messages
                    .into_iter()
                    .filter(|m| m.role != Role::System),
            )
            .collect()
    }
}

/// Successful relay response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub success: bool,
    pub content: String,
    pub processing_time_ms: u64,
}

impl ChatResponse {
    pub fn new(content: String, processing_time_ms: u64) -> Self {
        Self {
            success: true,
            content,
            processing_time_ms,
        }
    }
}

/// Failure body shared by every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
    pub environment: String,
}
