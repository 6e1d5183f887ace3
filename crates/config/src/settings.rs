//! Agent settings: which provider to use and its credentials.
//!
//! Stored as TOML next to the main config. The store never caches: every
//! [`SettingsStore::snapshot`] reads the file again, so an operator can switch
//! providers or rotate keys while the gateway is running.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zabbot_core::agent::{AgentConfig, BedrockCredentials, Credentials, ProviderKind};

use crate::ConfigError;

const MASK: &str = "********";
const OPENAI_MASK_PREFIX: &str = "sk-...";

/// Persisted provider settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub provider: ProviderKind,

    #[serde(default = "default_aws_region")]
    pub aws_region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_access_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_secret_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_session_token: Option<String>,

    /// Bedrock API key (bearer token auth)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrock_api_key: Option<String>,

    #[serde(default = "default_bedrock_model")]
    pub bedrock_model_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
}

fn default_aws_region() -> String {
    "us-east-1".into()
}
fn default_bedrock_model() -> String {
    "us.anthropic.claude-3-5-sonnet-20241022-v2:0".into()
}
fn default_openai_model() -> String {
    "gpt-4o".into()
}
fn default_gemini_model() -> String {
    "gemini-1.5-pro-latest".into()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Bedrock,
            aws_region: default_aws_region(),
            aws_access_key: None,
            aws_secret_key: None,
            aws_session_token: None,
            bedrock_api_key: None,
            bedrock_model_id: default_bedrock_model(),
            openai_api_key: None,
            openai_model: default_openai_model(),
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
        }
    }
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AgentSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSettings")
            .field("provider", &self.provider)
            .field("aws_region", &self.aws_region)
            .field("aws_access_key", &redact(&self.aws_access_key))
            .field("aws_secret_key", &redact(&self.aws_secret_key))
            .field("aws_session_token", &redact(&self.aws_session_token))
            .field("bedrock_api_key", &redact(&self.bedrock_api_key))
            .field("bedrock_model_id", &self.bedrock_model_id)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_model", &self.openai_model)
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("gemini_model", &self.gemini_model)
            .finish()
    }
}

impl AgentSettings {
    /// Initial settings, seeded from the standard AWS variables.
    pub fn seeded(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            aws_region: lookup("AWS_REGION").unwrap_or_else(default_aws_region),
            aws_access_key: lookup("AWS_ACCESS_KEY_ID"),
            aws_secret_key: lookup("AWS_SECRET_ACCESS_KEY"),
            ..Self::default()
        }
    }

    /// Build the per-request agent snapshot for the selected provider.
    ///
    /// `bedrock_bearer` is the `BEDROCK_API_KEY` fallback captured at startup;
    /// it only applies when the file itself has no Bedrock API key.
    pub fn to_agent_config(
        &self,
        bedrock_bearer: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> AgentConfig {
        let (credentials, model_id) = match self.provider {
            ProviderKind::Bedrock => (
                Credentials::Bedrock(BedrockCredentials {
                    region: self.aws_region.clone(),
                    access_key: self.aws_access_key.clone(),
                    secret_key: self.aws_secret_key.clone(),
                    session_token: self.aws_session_token.clone(),
                    api_key: self
                        .bedrock_api_key
                        .clone()
                        .filter(|k| !k.trim().is_empty())
                        .or_else(|| bedrock_bearer.map(String::from)),
                }),
                &self.bedrock_model_id,
            ),
            ProviderKind::OpenAi => (
                Credentials::OpenAi {
                    api_key: self.openai_api_key.clone(),
                },
                &self.openai_model,
            ),
            ProviderKind::Gemini => (
                Credentials::Gemini {
                    api_key: self.gemini_api_key.clone(),
                },
                &self.gemini_model,
            ),
        };

        let mut config = AgentConfig::new(credentials, model_id.clone());
        config.max_tokens = max_tokens;
        config.temperature = temperature;
        config
    }

    /// A copy safe to show to operators: secrets are replaced by placeholders.
    pub fn masked(&self) -> Self {
        let mask = |s: &Option<String>| s.as_ref().filter(|v| !v.is_empty()).map(|_| MASK.to_string());
        Self {
            aws_secret_key: mask(&self.aws_secret_key),
            aws_session_token: mask(&self.aws_session_token),
            bedrock_api_key: mask(&self.bedrock_api_key),
            gemini_api_key: mask(&self.gemini_api_key),
            openai_api_key: self
                .openai_api_key
                .as_ref()
                .filter(|v| !v.is_empty())
                .map(|key| {
                    let chars: Vec<char> = key.chars().collect();
                    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
                    format!("{OPENAI_MASK_PREFIX}{tail}")
                }),
            ..self.clone()
        }
    }

    /// Merge a partial update. Empty values and masked placeholders are ignored
    /// so a masked form sent back unchanged never clobbers a stored secret.
    pub fn apply(&mut self, update: SettingsUpdate) {
        self.provider = update.provider;

        fn set(target: &mut String, value: Option<String>) {
            if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                *target = v;
            }
        }
        fn set_secret(target: &mut Option<String>, value: Option<String>, is_mask: fn(&str) -> bool) {
            if let Some(v) = value.filter(|v| !v.trim().is_empty() && !is_mask(v)) {
                *target = Some(v);
            }
        }
        let is_mask: fn(&str) -> bool = |v| v == MASK;
        let is_openai_mask: fn(&str) -> bool = |v| v.starts_with(OPENAI_MASK_PREFIX);

        set(&mut self.aws_region, update.aws_region);
        set_secret(&mut self.aws_access_key, update.aws_access_key, is_mask);
        set_secret(&mut self.aws_secret_key, update.aws_secret_key, is_mask);
        set_secret(&mut self.aws_session_token, update.aws_session_token, is_mask);
        set_secret(&mut self.bedrock_api_key, update.bedrock_api_key, is_mask);
        set(&mut self.bedrock_model_id, update.bedrock_model_id);
        set_secret(&mut self.openai_api_key, update.openai_api_key, is_openai_mask);
        set(&mut self.openai_model, update.openai_model);
        set_secret(&mut self.gemini_api_key, update.gemini_api_key, is_mask);
        set(&mut self.gemini_model, update.gemini_model);
    }
}

/// A partial settings update, as posted by the settings UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub provider: ProviderKind,
    #[serde(default)]
    pub aws_region: Option<String>,
    #[serde(default)]
    pub aws_access_key: Option<String>,
    #[serde(default)]
    pub aws_secret_key: Option<String>,
    #[serde(default)]
    pub aws_session_token: Option<String>,
    #[serde(default)]
    pub bedrock_api_key: Option<String>,
    #[serde(default)]
    pub bedrock_model_id: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub openai_model: Option<String>,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub gemini_model: Option<String>,
}

/// File-backed settings, read fresh on every access.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    bedrock_bearer: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl SettingsStore {
    /// Point at a settings file without touching the disk.
    ///
    /// `load` fails with `ReadError` until something creates the file.
    pub fn attach(path: impl Into<PathBuf>, tuning: &crate::AgentTuning) -> Self {
        Self {
            path: path.into(),
            bedrock_bearer: std::env::var("BEDROCK_API_KEY").ok().filter(|k| !k.is_empty()),
            max_tokens: tuning.max_tokens,
            temperature: tuning.temperature,
        }
    }

    /// Open the store, creating the file with seeded defaults if it is missing.
    pub fn open(path: impl Into<PathBuf>, tuning: &crate::AgentTuning) -> Result<Self, ConfigError> {
        let store = Self::attach(path, tuning);
        if !store.path.exists() {
            info!(path = %store.path.display(), "Creating default agent settings");
            store.save(&AgentSettings::seeded(|k| std::env::var(k).ok().filter(|v| !v.is_empty())))?;
        }
        Ok(store)
    }

    /// Override the `BEDROCK_API_KEY` fallback.
    pub fn with_bedrock_bearer(mut self, token: Option<String>) -> Self {
        self.bedrock_bearer = token;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the settings file.
    pub fn load(&self) -> Result<AgentSettings, ConfigError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::ReadError {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Read the current settings and turn them into an agent snapshot.
    pub fn snapshot(&self) -> Result<AgentConfig, ConfigError> {
        let settings = self.load()?;
        debug!(provider = %settings.provider, "Loaded agent settings");
        Ok(settings.to_agent_config(
            self.bedrock_bearer.as_deref(),
            self.max_tokens,
            self.temperature,
        ))
    }

    /// Persist settings, replacing the file atomically.
    pub fn save(&self, settings: &AgentSettings) -> Result<(), ConfigError> {
        let write_err = |e: &dyn std::fmt::Display| ConfigError::WriteError {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        let content = toml::to_string_pretty(settings).map_err(|e| write_err(&e))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(&e))?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, content).map_err(|e| write_err(&e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| write_err(&e))?;
        Ok(())
    }

    /// Load, merge an update, and save.
    pub fn update(&self, update: SettingsUpdate) -> Result<AgentSettings, ConfigError> {
        let mut settings = self.load()?;
        settings.apply(update);
        self.save(&settings)?;
        info!(provider = %settings.provider, "Agent settings updated");
        Ok(settings)
    }
}
