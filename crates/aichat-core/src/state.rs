//! UI-agnostic conversation types
//!
//! These are shared by every front end and don't depend on any UI framework.

use serde::{Deserialize, Serialize};

/// A single entry in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Who a chat message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Question,
    Answer,
}

impl ChatMessage {
    pub fn question(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Question,
            content: content.into(),
        }
    }

    pub fn answer(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Answer,
            content: content.into(),
        }
    }
}
