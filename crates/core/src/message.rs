//! Conversation, Turn and ContentBlock domain types.
//!
//! These are the provider-agnostic value objects that flow through the loop:
//! the operator's message opens a conversation, each provider reply becomes an
//! assistant turn, and every batch of tool results becomes a tool-result turn.
//! Adapters translate to and from their own wire shapes at the edge.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Argument map carried by a tool invocation.
pub type Arguments = serde_json::Map<String, serde_json::Value>;

/// Who contributed a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The operator
    User,
    /// The model
    Assistant,
    /// Results of tools the model asked for
    ToolResult,
}

/// A single piece of turn content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        value: String,
    },
    ToolInvocation {
        call_id: String,
        tool_name: String,
        arguments: Arguments,
    },
    ToolOutcome {
        call_id: String,
        content: String,
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    pub fn invocation(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: Arguments,
    ) -> Self {
        Self::ToolInvocation {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    pub fn outcome(call_id: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Self::ToolOutcome {
            call_id: call_id.into(),
            content: content.into(),
            is_error,
        }
    }

    pub fn is_invocation(&self) -> bool {
        matches!(self, Self::ToolInvocation { .. })
    }
}

/// Generate a call id for providers that do not assign their own.
pub fn new_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// Call ids handed out while parsing one provider response.
///
/// A provider id is kept unless it is missing, empty, or already used earlier
/// in the same response; those get a fresh [`new_call_id`] instead, so every
/// outcome can be paired with exactly one invocation.
#[derive(Debug, Default)]
pub struct CallIds {
    seen: HashSet<String>,
}

impl CallIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, candidate: Option<&str>) -> String {
        let id = candidate
            .filter(|id| !id.is_empty() && !self.seen.contains(*id))
            .map(String::from)
            .unwrap_or_else(new_call_id);
        self.seen.insert(id.clone());
        id
    }
}

/// One party's contribution to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    pub fn tool_results(outcomes: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::ToolResult,
            content: outcomes,
        }
    }

    /// All text blocks concatenated in order.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { value } => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// An ordered, append-only sequence of turns owned by a single chat request.
///
/// The first turn is always the operator's message; there is no way to build
/// a conversation that starts with anything else.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Start a conversation from the operator's message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::user(message)],
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Look up the tool name of an invocation made before turn `before` by its
    /// call id.
    ///
    /// Needed by wire formats that key tool feedback by function name.
    /// Providers may reuse ids across rounds, so the latest invocation wins.
    pub fn tool_name_for(&self, call_id: &str, before: usize) -> Option<&str> {
        self.turns[..before.min(self.turns.len())]
            .iter()
            .rev()
            .filter(|t| t.role == Role::Assistant)
            .flat_map(|t| t.content.iter())
            .find_map(|b| match b {
                ContentBlock::ToolInvocation {
                    call_id: id,
                    tool_name,
                    ..
                } if id == call_id => Some(tool_name.as_str()),
                _ => None,
            })
    }
}
