//! Google Gemini provider (`generateContent`, v1beta).
//!
//! Gemini keys tool feedback by function name rather than by call id, and
//! older models omit call ids entirely. Missing ids are synthesized so the
//! loop can still pair every invocation with its outcome; the name for a
//! `functionResponse` is recovered from the conversation.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;
use zabbot_core::error::ProviderError;
use zabbot_core::message::{CallIds, ContentBlock, Conversation, Role};
use zabbot_core::provider::*;

use crate::http::send_json;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    base_url: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key,
            max_tokens: 2000,
            temperature: 0.5,
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    fn to_contents(conversation: &Conversation) -> Vec<Value> {
        conversation
            .turns()
            .iter()
            .enumerate()
            .map(|(index, turn)| {
                let role = match turn.role {
                    Role::Assistant => "model",
                    Role::User | Role::ToolResult => "user",
                };
                let parts: Vec<Value> = turn
                    .content
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text { value } if value.is_empty() => None,
                        ContentBlock::Text { value } => Some(json!({ "text": value })),
                        ContentBlock::ToolInvocation {
                            call_id,
                            tool_name,
                            arguments,
                        } => Some(json!({
                            "functionCall": { "id": call_id, "name": tool_name, "args": arguments }
                        })),
                        ContentBlock::ToolOutcome {
                            call_id,
                            content,
                            is_error,
                        } => {
                            let name = conversation
                                .tool_name_for(call_id, index)
                                .unwrap_or(call_id);
                            let response = if *is_error {
                                json!({ "error": content })
                            } else {
                                json!({ "content": content })
                            };
                            Some(json!({
                                "functionResponse": {
                                    "id": call_id,
                                    "name": name,
                                    "response": response
                                }
                            }))
                        }
                    })
                    .collect();
                json!({ "role": role, "parts": parts })
            })
            .collect()
    }

    /// Gemini rejects empty `properties` / `required`; drop them.
    fn to_declaration(tool: &ToolDefinition) -> Value {
        let mut declaration = json!({
            "name": tool.name,
            "description": tool.description,
        });

        let mut schema = tool.input_schema.clone();
        if let Some(obj) = schema.as_object_mut() {
            if obj
                .get("required")
                .and_then(Value::as_array)
                .is_some_and(Vec::is_empty)
            {
                obj.remove("required");
            }
            let has_properties = obj
                .get("properties")
                .and_then(Value::as_object)
                .is_some_and(|p| !p.is_empty());
            if has_properties {
                declaration["parameters"] = schema;
            }
        }
        declaration
    }

    fn build_body(&self, request: &ProviderRequest<'_>) -> Value {
        let mut body = json!({
            "systemInstruction": { "parts": [{ "text": request.system_prompt }] },
            "contents": Self::to_contents(request.conversation),
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            },
        });
        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request.tools.iter().map(Self::to_declaration).collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }
        body
    }

    fn parse_response(json: &Value) -> Result<ProviderResponse, ProviderError> {
        if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
            return Err(ProviderError::InvalidResponse(format!(
                "prompt blocked by Gemini: {reason}"
            )));
        }

        let candidate = json["candidates"]
            .get(0)
            .ok_or_else(|| ProviderError::InvalidResponse("no candidates in response".into()))?;

        let parts = candidate["content"]["parts"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut blocks = Vec::with_capacity(parts.len());
        let mut call_ids = CallIds::new();
        for part in parts {
            if let Some(text) = part["text"].as_str() {
                if !text.is_empty() {
                    blocks.push(ContentBlock::text(text));
                }
            } else if let Some(call) = part.get("functionCall") {
                let name = call["name"].as_str().ok_or_else(|| {
                    ProviderError::InvalidResponse("functionCall without a name".into())
                })?;
                let arguments = match &call["args"] {
                    Value::Object(map) => map.clone(),
                    Value::Null => Default::default(),
                    other => {
                        return Err(ProviderError::InvalidResponse(format!(
                            "functionCall args for '{name}' are not an object: {other}"
                        )));
                    }
                };
                let call_id = call_ids.claim(call["id"].as_str());
                blocks.push(ContentBlock::invocation(call_id, name, arguments));
            }
        }

        debug!(finish_reason = ?candidate["finishReason"].as_str(), blocks = blocks.len(), "Gemini response");
        let response = ProviderResponse::from_blocks(blocks);
        let usage = &json["usageMetadata"];
        Ok(match (usage["promptTokenCount"].as_u64(), usage["candidatesTokenCount"].as_u64()) {
            (Some(prompt), Some(completion)) => response.with_usage(Usage {
                prompt_tokens: prompt as u32,
                completion_tokens: completion as u32,
            }),
            _ => response,
        })
    }
}

#[async_trait]
impl zabbot_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn send(&self, request: ProviderRequest<'_>) -> Result<ProviderResponse, ProviderError> {
        let Some(api_key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
        else {
            return Err(ProviderError::NotConfigured(
                "AI Configuration Error: Gemini API Key not configured.".into(),
            ));
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, request.model_id
        );
        debug!(provider = "gemini", model = %request.model_id, "Sending generateContent request");

        let builder = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&self.build_body(&request));

        let json: Value = send_json("gemini", builder).await?;
        Self::parse_response(&json)
    }
}
