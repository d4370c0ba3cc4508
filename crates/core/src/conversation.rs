//! Conversation History and Context Windowing
//!
//! The full chat history is kept for display; only the most recent
//! [`CONTEXT_WINDOW`] turns are handed to the model on each request, to
//! cap request size and latency.

use crate::error::TutorError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of turns sent to the model per request.
pub const CONTEXT_WINDOW: usize = 10;

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in the chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only, strictly ordered chat history.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user turn. Blank or whitespace-only text is rejected
    /// before anything is recorded.
    pub fn append_user(&mut self, text: &str) -> Result<ChatTurn, TutorError> {
        if text.trim().is_empty() {
            return Err(TutorError::InvalidInput(
                "chat message must not be empty".to_string(),
            ));
        }
        let turn = ChatTurn::user(text);
        self.turns.push(turn.clone());
        Ok(turn)
    }

    /// Appends an assistant turn. Empty content is accepted here;
    /// callers supply a diagnostic placeholder on upstream failure.
    pub fn append_assistant(&mut self, text: impl Into<String>) -> ChatTurn {
        let turn = ChatTurn::assistant(text);
        self.turns.push(turn.clone());
        turn
    }

    /// The last [`CONTEXT_WINDOW`] turns in chronological order.
    pub fn window_for_prompt(&self) -> &[ChatTurn] {
        let start = self.turns.len().saturating_sub(CONTEXT_WINDOW);
        &self.turns[start..]
    }

    /// The full history, for rendering.
    pub fn history(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
