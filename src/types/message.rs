//! Chat message structure and role normalization.

use serde::{Deserialize, Serialize};

/// A single conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: text.into(),
        }
    }

    /// Build a message from a loosely-typed role string, normalizing the
    /// vocabulary at the boundary (see [`MessageRole::normalize`]).
    pub fn from_parts(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::normalize(role),
            content: content.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Normalize looser external vocabularies into the canonical roles:
    /// `prompt` maps to `user`, `response` maps to `assistant`. Anything
    /// unrecognized is treated as user input.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "system" => MessageRole::System,
            "assistant" | "response" => MessageRole::Assistant,
            _ => MessageRole::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}
