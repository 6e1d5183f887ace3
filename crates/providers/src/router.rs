//! Provider router: builds the adapter for a request's configuration snapshot.
//!
//! Providers are cheap to construct (they share one HTTP connection pool), so
//! a fresh adapter is built for every chat request. A settings change takes
//! effect on the next request without any cache to invalidate.

use std::collections::HashMap;
use std::sync::Arc;
use zabbot_core::agent::{AgentConfig, Credentials, ProviderKind};
use zabbot_core::provider::Provider;

use crate::bedrock::BedrockProvider;
use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;

/// Builds a provider for one request's [`AgentConfig`].
pub trait ProviderFactory: Send + Sync {
    fn build(&self, config: &AgentConfig) -> Arc<dyn Provider>;
}

/// Routes a configuration snapshot to the matching HTTP adapter.
pub struct ProviderRouter {
    client: reqwest::Client,
    endpoints: HashMap<ProviderKind, String>,
}

impl ProviderRouter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoints: HashMap::new(),
        }
    }

    /// Point one provider at a different base URL (proxies, VPC endpoints, tests).
    pub fn with_endpoint(mut self, kind: ProviderKind, url: impl Into<String>) -> Self {
        self.endpoints.insert(kind, url.into());
        self
    }

    fn endpoint(&self, kind: ProviderKind) -> Option<&str> {
        self.endpoints.get(&kind).map(String::as_str)
    }
}

impl Default for ProviderRouter {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl ProviderFactory for ProviderRouter {
    fn build(&self, config: &AgentConfig) -> Arc<dyn Provider> {
        let kind = config.provider();
        match &config.credentials {
            Credentials::Bedrock(credentials) => {
                let mut p = BedrockProvider::new(credentials.clone(), self.client.clone())
                    .with_sampling(config.max_tokens, config.temperature);
                if let Some(url) = self.endpoint(kind) {
                    p = p.with_endpoint(url);
                }
                Arc::new(p)
            }
            Credentials::OpenAi { api_key } => {
                let mut p = OpenAiProvider::new(api_key.clone(), self.client.clone())
                    .with_temperature(config.temperature);
                if let Some(url) = self.endpoint(kind) {
                    p = p.with_base_url(url);
                }
                Arc::new(p)
            }
            Credentials::Gemini { api_key } => {
                let mut p = GeminiProvider::new(api_key.clone(), self.client.clone())
                    .with_sampling(config.max_tokens, config.temperature);
                if let Some(url) = self.endpoint(kind) {
                    p = p.with_base_url(url);
                }
                Arc::new(p)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zabbot_core::agent::BedrockCredentials;

    #[test]
    fn builds_provider_matching_selection() {
        let router = ProviderRouter::default();

        let bedrock = AgentConfig::new(
            Credentials::Bedrock(BedrockCredentials {
                region: "us-east-1".into(),
                ..Default::default()
            }),
            "anthropic.claude",
        );
        assert_eq!(router.build(&bedrock).name(), "bedrock");

        let openai = AgentConfig::new(Credentials::OpenAi { api_key: None }, "gpt-4o");
        assert_eq!(router.build(&openai).name(), "openai");

        let gemini = AgentConfig::new(Credentials::Gemini { api_key: None }, "gemini-1.5-pro-latest");
        assert_eq!(router.build(&gemini).name(), "gemini");
    }
}
