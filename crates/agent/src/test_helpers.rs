//! Shared test doubles for the conversation loop.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zabbot_core::agent::{AgentConfig, Credentials};
use zabbot_core::error::{ProviderError, ToolError};
use zabbot_core::message::{Arguments, ContentBlock, Conversation};
use zabbot_core::provider::{Provider, ProviderRequest, ProviderResponse};
use zabbot_core::tool::{Tool, ToolRegistry, str_arg};
use zabbot_providers::ProviderFactory;

/// A provider that replays scripted replies and records what it was sent.
///
/// Once the script runs dry the fallback reply (if any) is repeated;
/// otherwise the call panics.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    fallback: Option<ProviderResponse>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(Conversation, String)>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(replies: Vec<ProviderResponse>) -> Self {
        Self::new(replies.into_iter().map(Ok).collect())
    }

    /// Answer every call with the same reply.
    pub fn always(reply: ProviderResponse) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.fallback = Some(reply);
        provider
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Conversations as they were at each call.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.seen.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn system_prompts(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, request: ProviderRequest<'_>) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((request.conversation.clone(), request.system_prompt.to_string()));

        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.fallback {
            Some(reply) => Ok(reply.clone()),
            None => panic!("ScriptedProvider: script exhausted"),
        }
    }
}

/// Hands out the same provider for every request and counts builds.
pub struct FixedFactory {
    pub provider: Arc<ScriptedProvider>,
    builds: AtomicUsize,
}

impl FixedFactory {
    pub fn new(provider: Arc<ScriptedProvider>) -> Self {
        Self {
            provider,
            builds: AtomicUsize::new(0),
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ProviderFactory for FixedFactory {
    fn build(&self, _config: &AgentConfig) -> Arc<dyn Provider> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.provider.clone()
    }
}

/// Requires `text`; returns it upper-cased.
pub struct ShoutTool;

#[async_trait]
impl Tool for ShoutTool {
    fn name(&self) -> &str {
        "shout"
    }
    fn description(&self) -> &str {
        "Upper-cases the input"
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        })
    }
    async fn execute(&self, arguments: &Arguments) -> Result<String, ToolError> {
        Ok(str_arg(arguments, "text")?.to_uppercase())
    }
}

pub fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(ShoutTool));
    registry
}

pub fn openai_config(api_key: Option<&str>) -> AgentConfig {
    AgentConfig::new(
        Credentials::OpenAi {
            api_key: api_key.map(String::from),
        },
        "gpt-4o",
    )
}

pub fn call(call_id: &str, tool: &str, arguments: Value) -> ContentBlock {
    let arguments = arguments.as_object().cloned().unwrap_or_default();
    ContentBlock::invocation(call_id, tool, arguments)
}
