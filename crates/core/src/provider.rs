//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation, the tool catalog and a system
//! prompt to one LLM backend and translate the reply back into a
//! provider-agnostic [`ProviderResponse`].
//!
//! Implementations: Bedrock (Anthropic Messages), OpenAI chat completions, Gemini.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{Arguments, ContentBlock, Conversation};

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name, unique within a catalog
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's arguments
    pub input_schema: serde_json::Value,
}

/// Everything an adapter needs for one round-trip.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    pub conversation: &'a Conversation,
    pub tools: &'a [ToolDefinition],
    pub system_prompt: &'a str,
    pub model_id: &'a str,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Final answer
    Text,
    /// At least one tool invocation is pending
    ToolUse,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A classified reply from a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub stop_reason: StopReason,
    pub blocks: Vec<ContentBlock>,

    /// Token usage, when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ProviderResponse {
    /// Build a response, classifying the stop reason from the blocks.
    ///
    /// `ToolUse` whenever any block is an invocation, regardless of what the
    /// backend itself claimed.
    pub fn from_blocks(blocks: Vec<ContentBlock>) -> Self {
        let stop_reason = if blocks.iter().any(ContentBlock::is_invocation) {
            StopReason::ToolUse
        } else {
            StopReason::Text
        };
        Self {
            stop_reason,
            blocks,
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Convenience constructor for a plain text reply.
    pub fn text(value: impl Into<String>) -> Self {
        Self::from_blocks(vec![ContentBlock::text(value)])
    }

    /// All text blocks concatenated in order.
    pub fn text_content(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { value } => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The tool invocations in the order the model emitted them.
    pub fn invocations(&self) -> impl Iterator<Item = (&str, &str, &Arguments)> {
        self.blocks.iter().filter_map(|b| match b {
            ContentBlock::ToolInvocation {
                call_id,
                tool_name,
                arguments,
            } => Some((call_id.as_str(), tool_name.as_str(), arguments)),
            _ => None,
        })
    }
}

/// The core Provider trait.
///
/// Every LLM backend implements this. The conversation loop calls `send()`
/// without knowing which wire protocol sits behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "bedrock", "openai").
    fn name(&self) -> &str;

    /// Perform one round-trip.
    ///
    /// Missing credentials must fail with [`ProviderError::NotConfigured`]
    /// before any network call is made.
    async fn send(&self, request: ProviderRequest<'_>) -> Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_reason_follows_blocks() {
        let text = ProviderResponse::from_blocks(vec![ContentBlock::text("done")]);
        assert_eq!(text.stop_reason, StopReason::Text);

        let tools = ProviderResponse::from_blocks(vec![
            ContentBlock::text("let me check"),
            ContentBlock::invocation("c1", "get_host_groups", Arguments::new()),
        ]);
        assert_eq!(tools.stop_reason, StopReason::ToolUse);
        assert_eq!(tools.invocations().count(), 1);
    }

    #[test]
    fn empty_reply_is_text() {
        let resp = ProviderResponse::from_blocks(vec![]);
        assert_eq!(resp.stop_reason, StopReason::Text);
        assert_eq!(resp.text_content(), "");
    }

    #[test]
    fn text_content_concatenates_in_order() {
        let resp = ProviderResponse::from_blocks(vec![
            ContentBlock::text("A"),
            ContentBlock::text("B"),
        ]);
        assert_eq!(resp.text_content(), "AB");
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "get_templates".into(),
            description: "Search templates".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "search": { "type": "string" } },
                "required": ["search"]
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("input_schema"));
        assert!(json.contains("search"));
    }
}
