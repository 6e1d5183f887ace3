//! Agent configuration snapshot.
//!
//! An [`AgentConfig`] is taken once per chat request and stays fixed for every
//! round-trip of that request.

use serde::{Deserialize, Serialize};

/// The supported LLM backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Bedrock,
    #[serde(rename = "openai")]
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::Bedrock, Self::OpenAi, Self::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bedrock => "bedrock",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bedrock" => Ok(Self::Bedrock),
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(format!("Unknown provider '{other}'")),
        }
    }
}

/// How Bedrock requests are authenticated.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BedrockCredentials {
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub session_token: Option<String>,
    /// Bedrock API key, sent as a bearer token instead of SigV4 signing
    pub api_key: Option<String>,
}

impl BedrockCredentials {
    /// The access key pair, when both halves are present and non-empty.
    pub fn key_pair(&self) -> Option<(&str, &str)> {
        match (non_empty(&self.access_key), non_empty(&self.secret_key)) {
            (Some(a), Some(s)) => Some((a, s)),
            _ => None,
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        non_empty(&self.api_key)
    }
}

/// Provider-specific credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Bedrock(BedrockCredentials),
    OpenAi { api_key: Option<String> },
    Gemini { api_key: Option<String> },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bedrock(c) => f
                .debug_struct("Bedrock")
                .field("region", &c.region)
                .field("access_key", &redact(&c.access_key))
                .field("secret_key", &redact(&c.secret_key))
                .field("session_token", &redact(&c.session_token))
                .field("api_key", &redact(&c.api_key))
                .finish(),
            Self::OpenAi { api_key } => f
                .debug_struct("OpenAi")
                .field("api_key", &redact(api_key))
                .finish(),
            Self::Gemini { api_key } => f
                .debug_struct("Gemini")
                .field("api_key", &redact(api_key))
                .finish(),
        }
    }
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Which backend to talk to, with what credentials and model.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub credentials: Credentials,
    pub model_id: String,
    /// Maximum tokens per reply (Bedrock requires it)
    pub max_tokens: u32,
    pub temperature: f32,
}

impl AgentConfig {
    pub fn new(credentials: Credentials, model_id: impl Into<String>) -> Self {
        Self {
            credentials,
            model_id: model_id.into(),
            max_tokens: 2000,
            temperature: 0.5,
        }
    }

    pub fn provider(&self) -> ProviderKind {
        match self.credentials {
            Credentials::Bedrock(_) => ProviderKind::Bedrock,
            Credentials::OpenAi { .. } => ProviderKind::OpenAi,
            Credentials::Gemini { .. } => ProviderKind::Gemini,
        }
    }

    /// The configuration error message for missing credentials, if any.
    pub fn credentials_error(&self) -> Option<String> {
        match &self.credentials {
            Credentials::Bedrock(c) if c.key_pair().is_none() && c.bearer_token().is_none() => {
                Some("AI Configuration Error: AWS credentials not configured.".into())
            }
            Credentials::OpenAi { api_key } if non_empty(api_key).is_none() => {
                Some("AI Configuration Error: OpenAI API Key not configured.".into())
            }
            Credentials::Gemini { api_key } if non_empty(api_key).is_none() => {
                Some("AI Configuration Error: Gemini API Key not configured.".into())
            }
            _ if self.model_id.trim().is_empty() => Some(format!(
                "AI Configuration Error: no model configured for {}.",
                self.provider()
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_parses_and_displays() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!("llama".parse::<ProviderKind>().is_err());
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn provider_kind_serde_names() {
        assert_eq!(serde_json::to_string(&ProviderKind::OpenAi).unwrap(), "\"openai\"");
        assert_eq!(serde_json::to_string(&ProviderKind::Bedrock).unwrap(), "\"bedrock\"");
    }

    #[test]
    fn missing_credentials_are_reported_per_provider() {
        let openai = AgentConfig::new(Credentials::OpenAi { api_key: None }, "gpt-4o");
        assert!(openai.credentials_error().unwrap().contains("OpenAI API Key"));

        let gemini = AgentConfig::new(
            Credentials::Gemini {
                api_key: Some("  ".into()),
            },
            "gemini-1.5-pro-latest",
        );
        assert!(gemini.credentials_error().unwrap().contains("Gemini API Key"));

        let bedrock = AgentConfig::new(
            Credentials::Bedrock(BedrockCredentials {
                region: "us-east-1".into(),
                access_key: Some("AKIA".into()),
                ..Default::default()
            }),
            "anthropic.claude",
        );
        assert!(bedrock.credentials_error().unwrap().contains("AWS credentials"));
    }

    #[test]
    fn bedrock_accepts_key_pair_or_bearer_token() {
        let pair = BedrockCredentials {
            region: "us-east-1".into(),
            access_key: Some("AKIA".into()),
            secret_key: Some("secret".into()),
            ..Default::default()
        };
        assert!(AgentConfig::new(Credentials::Bedrock(pair), "m").credentials_error().is_none());

        let bearer = BedrockCredentials {
            region: "us-east-1".into(),
            api_key: Some("bedrock-key".into()),
            ..Default::default()
        };
        assert!(AgentConfig::new(Credentials::Bedrock(bearer), "m").credentials_error().is_none());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = AgentConfig::new(
            Credentials::OpenAi {
                api_key: Some("sk-secret-value".into()),
            },
            "gpt-4o",
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-value"));
        assert!(debug.contains("REDACTED"));
    }
}
