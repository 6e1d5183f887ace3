//! The conversation loop: bounded provider round-trips with tool execution.
//!
//! One [`ConversationLoop::run`] call owns one conversation from the
//! operator's message to a final string. The loop is an explicit state
//! machine:
//!
//! ```text
//! AwaitingProvider(n) --text--------> Done
//! AwaitingProvider(n) --tool_use----> ExecutingTools(n)
//! ExecutingTools(n)   --n < MAX-----> AwaitingProvider(n + 1)
//! ExecutingTools(n)   --n == MAX----> BoundExceeded
//! ```
//!
//! Only configuration and provider failures end the loop early. Tool
//! failures are fed back to the model as error outcomes.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use zabbot_core::agent::AgentConfig;
use zabbot_core::error::ProviderError;
use zabbot_core::message::{ContentBlock, Conversation, Turn};
use zabbot_core::provider::{Provider, ProviderRequest, ProviderResponse, StopReason};
use zabbot_core::tool::ToolRegistry;
use zabbot_providers::ProviderFactory;

use crate::prompt::{SituationalContext, SystemPromptBuilder};

/// Provider round-trips allowed per chat request.
pub const MAX_ROUND_TRIPS: usize = 5;

/// Reply text when the model keeps asking for tools past the bound.
pub const BOUND_EXCEEDED_REPLY: &str = "Error: Maximum conversation turns exceeded.";

const DEFAULT_ROUND_TRIP_TIMEOUT: Duration = Duration::from_secs(120);

/// How a chat request ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChatOutcome {
    /// The model answered with text.
    Reply { text: String },

    /// Credentials for the selected provider are missing.
    ConfigurationError { message: String },

    /// The provider call failed.
    ProviderFailure { provider: String, message: String },

    /// The model was still requesting tools after the last round-trip.
    BoundExceeded,
}

impl ChatOutcome {
    /// The string handed back to the caller, whatever happened.
    pub fn into_reply(self) -> String {
        match self {
            Self::Reply { text } => text,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ChatOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reply { text } => f.write_str(text),
            Self::ConfigurationError { message } => f.write_str(message),
            Self::ProviderFailure { provider, message } => {
                write!(f, "Error connecting to AI service ({provider}): {message}")
            }
            Self::BoundExceeded => f.write_str(BOUND_EXCEEDED_REPLY),
        }
    }
}

enum LoopState {
    AwaitingProvider { round: usize },
    ExecutingTools { round: usize },
    Done(String),
    BoundExceeded,
}

/// Drives one conversation per chat request.
///
/// The loop itself is stateless across requests: the tool registry and
/// prompt builder are shared, read-only, and every `run` gets its own
/// [`Conversation`].
pub struct ConversationLoop {
    factory: Arc<dyn ProviderFactory>,
    tools: Arc<ToolRegistry>,
    prompt: SystemPromptBuilder,
    round_trip_timeout: Duration,
}

impl ConversationLoop {
    pub fn new(factory: Arc<dyn ProviderFactory>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            factory,
            tools,
            prompt: SystemPromptBuilder::new(),
            round_trip_timeout: DEFAULT_ROUND_TRIP_TIMEOUT,
        }
    }

    pub fn with_prompt(mut self, prompt: SystemPromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_round_trip_timeout(mut self, timeout: Duration) -> Self {
        self.round_trip_timeout = timeout;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one chat exchange and flatten the outcome into reply text.
    pub async fn chat(
        &self,
        message: &str,
        context: Option<&SituationalContext>,
        config: &AgentConfig,
    ) -> String {
        self.run(message, context, config).await.into_reply()
    }

    /// Run one chat exchange.
    ///
    /// `config` is the snapshot for this request; it is used unchanged for
    /// every round-trip.
    pub async fn run(
        &self,
        message: &str,
        context: Option<&SituationalContext>,
        config: &AgentConfig,
    ) -> ChatOutcome {
        if let Some(message) = config.credentials_error() {
            warn!(provider = %config.provider(), "{message}");
            return ChatOutcome::ConfigurationError { message };
        }

        let provider = self.factory.build(config);
        let system_prompt = self.prompt.build(context);
        let definitions = self.tools.definitions();
        let mut conversation = Conversation::new(message);
        let mut state = LoopState::AwaitingProvider { round: 1 };

        loop {
            state = match state {
                LoopState::AwaitingProvider { round } => {
                    debug!(provider = %provider.name(), round, turns = conversation.len(), "Provider round-trip");
                    let request = ProviderRequest {
                        conversation: &conversation,
                        tools: &definitions,
                        system_prompt: &system_prompt,
                        model_id: &config.model_id,
                    };
                    let response = match self.round_trip(provider.as_ref(), request).await {
                        Ok(response) => response,
                        Err(e) => return failure(provider.name(), e),
                    };
                    if let Some(usage) = response.usage {
                        debug!(
                            prompt_tokens = usage.prompt_tokens,
                            completion_tokens = usage.completion_tokens,
                            "Token usage"
                        );
                    }

                    match response.stop_reason {
                        StopReason::Text => {
                            let reply = response.text_content();
                            conversation.push(Turn::assistant(response.blocks));
                            LoopState::Done(reply)
                        }
                        StopReason::ToolUse => {
                            conversation.push(Turn::assistant(response.blocks));
                            LoopState::ExecutingTools { round }
                        }
                    }
                }
                LoopState::ExecutingTools { round } => {
                    let outcomes = self.execute_tools(&conversation).await;
                    conversation.push(Turn::tool_results(outcomes));
                    if round < MAX_ROUND_TRIPS {
                        LoopState::AwaitingProvider { round: round + 1 }
                    } else {
                        LoopState::BoundExceeded
                    }
                }
                LoopState::Done(reply) => {
                    info!(provider = %provider.name(), turns = conversation.len(), "Chat complete");
                    return ChatOutcome::Reply { text: reply };
                }
                LoopState::BoundExceeded => {
                    warn!(provider = %provider.name(), rounds = MAX_ROUND_TRIPS, "Round-trip bound reached");
                    return ChatOutcome::BoundExceeded;
                }
            };
        }
    }

    async fn round_trip(
        &self,
        provider: &dyn Provider,
        request: ProviderRequest<'_>,
    ) -> Result<ProviderResponse, ProviderError> {
        match tokio::time::timeout(self.round_trip_timeout, provider.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "no response within {}s",
                self.round_trip_timeout.as_secs()
            ))),
        }
    }

    /// Run the invocations of the latest assistant turn, in order.
    async fn execute_tools(&self, conversation: &Conversation) -> Vec<ContentBlock> {
        let Some(turn) = conversation.last() else {
            return Vec::new();
        };
        let mut outcomes = Vec::new();
        for block in &turn.content {
            if let ContentBlock::ToolInvocation {
                call_id,
                tool_name,
                arguments,
            } = block
            {
                outcomes.push(self.tools.run(call_id, tool_name, arguments).await);
            }
        }
        outcomes
    }
}

fn failure(provider: &str, e: ProviderError) -> ChatOutcome {
    if e.is_configuration() {
        warn!(provider = %provider, "{e}");
        return ChatOutcome::ConfigurationError {
            message: e.to_string(),
        };
    }
    error!(provider = %provider, error = %e, "Chat error");
    ChatOutcome::ProviderFailure {
        provider: provider.to_string(),
        message: e.to_string(),
    }
}
