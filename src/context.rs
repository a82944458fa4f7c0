//! Bounded chat context used to enrich the planning prompt.
//!
//! The core does not persist conversations; callers hand over the recent
//! turns and this type caps them and renders the summary the planner
//! prepends to the user prompt.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Maximum number of turns carried into a prompt.
pub const MAX_CONTEXT_MESSAGES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One prior turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Ordered, bounded sequence of prior turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatContext {
    messages: VecDeque<ChatMessage>,
}

impl ChatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn, dropping the oldest once the cap is reached.
    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) {
        self.messages.push_back(ChatMessage {
            role,
            content: content.into(),
        });
        while self.messages.len() > MAX_CONTEXT_MESSAGES {
            self.messages.pop_front();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Render `role: content` lines for prompt enrichment.
    pub fn summary(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
