//! Amazon Bedrock provider implementation.
//!
//! Talks to Anthropic models through Bedrock's `InvokeModel` endpoint using the
//! Anthropic Messages body format.
//!
//! Features:
//! - SigV4 signing with an access key pair (plus optional session token)
//! - Bearer authentication with a Bedrock API key
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zabbot_core::agent::BedrockCredentials;
use zabbot_core::error::ProviderError;
use zabbot_core::message::{Arguments, CallIds, ContentBlock, Conversation, Role};
use zabbot_core::provider::*;

use crate::http::send_json;
use crate::sigv4::{self, SigningParams, SigningRequest};

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const SERVICE: &str = "bedrock";

/// Bedrock `InvokeModel` provider for Anthropic models.
pub struct BedrockProvider {
    credentials: BedrockCredentials,
    endpoint: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl BedrockProvider {
    pub fn new(credentials: BedrockCredentials, client: reqwest::Client) -> Self {
        let endpoint = format!("https://bedrock-runtime.{}.amazonaws.com", credentials.region);
        Self {
            credentials,
            endpoint,
            max_tokens: 2000,
            temperature: 0.5,
            client,
        }
    }

    /// Override the runtime endpoint (e.g., for a VPC endpoint or tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// Path of the invoke call, with the model id percent-encoded.
    fn invoke_path(model_id: &str) -> String {
        format!("/model/{}/invoke", sigv4::uri_encode(model_id, true))
    }

    /// Convert the conversation to Anthropic messages.
    fn to_api_messages(conversation: &Conversation) -> Vec<ApiMessage> {
        conversation
            .turns()
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::Assistant => "assistant",
                    Role::User | Role::ToolResult => "user",
                };
                let content = turn
                    .content
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text { value } if value.is_empty() => None,
                        ContentBlock::Text { value } => Some(ApiBlock::Text {
                            text: value.clone(),
                        }),
                        ContentBlock::ToolInvocation {
                            call_id,
                            tool_name,
                            arguments,
                        } => Some(ApiBlock::ToolUse {
                            id: call_id.clone(),
                            name: tool_name.clone(),
                            input: serde_json::Value::Object(arguments.clone()),
                        }),
                        ContentBlock::ToolOutcome {
                            call_id,
                            content,
                            is_error,
                        } => Some(ApiBlock::ToolResult {
                            tool_use_id: call_id.clone(),
                            content: content.clone(),
                            is_error: *is_error,
                        }),
                    })
                    .collect();
                ApiMessage {
                    role: role.into(),
                    content,
                }
            })
            .collect()
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiTool> {
        tools
            .iter()
            .map(|t| ApiTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect()
    }

    fn build_body(&self, request: &ProviderRequest<'_>) -> serde_json::Value {
        let mut body = serde_json::json!({
            "anthropic_version": ANTHROPIC_VERSION,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": request.system_prompt,
            "messages": Self::to_api_messages(request.conversation),
        });
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(request.tools));
        }
        body
    }

    /// Convert an Anthropic response into blocks, preserving order.
    fn parse_response(resp: ApiResponse) -> Result<ProviderResponse, ProviderError> {
        let mut blocks = Vec::with_capacity(resp.content.len());
        let mut call_ids = CallIds::new();
        for block in resp.content {
            match block {
                ResponseBlock::Text { text } => blocks.push(ContentBlock::text(text)),
                ResponseBlock::ToolUse { id, name, input } => {
                    let arguments = into_arguments(input).ok_or_else(|| {
                        ProviderError::InvalidResponse(format!(
                            "tool_use input for '{name}' is not an object"
                        ))
                    })?;
                    let call_id = call_ids.claim(Some(id.as_str()));
                    blocks.push(ContentBlock::invocation(call_id, name, arguments));
                }
                ResponseBlock::Other => {}
            }
        }

        debug!(stop_reason = ?resp.stop_reason, blocks = blocks.len(), "Bedrock response");
        let response = ProviderResponse::from_blocks(blocks);
        Ok(match resp.usage {
            Some(u) => response.with_usage(Usage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
            }),
            None => response,
        })
    }

    fn host(&self) -> Result<String, ProviderError> {
        let url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| ProviderError::NotConfigured(format!("Invalid Bedrock endpoint: {e}")))?;
        let host = url.host_str().ok_or_else(|| {
            ProviderError::NotConfigured(format!("Invalid Bedrock endpoint: {}", self.endpoint))
        })?;
        Ok(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

fn into_arguments(input: serde_json::Value) -> Option<Arguments> {
    match input {
        serde_json::Value::Object(map) => Some(map),
        serde_json::Value::Null => Some(Arguments::new()),
        _ => None,
    }
}

#[async_trait]
impl zabbot_core::Provider for BedrockProvider {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn send(&self, request: ProviderRequest<'_>) -> Result<ProviderResponse, ProviderError> {
        let bearer = self.credentials.bearer_token();
        let key_pair = self.credentials.key_pair();
        if bearer.is_none() && key_pair.is_none() {
            return Err(ProviderError::NotConfigured(
                "AI Configuration Error: AWS credentials not configured.".into(),
            ));
        }

        let path = Self::invoke_path(request.model_id);
        let url = format!("{}{}", self.endpoint, path);
        let payload = serde_json::to_vec(&self.build_body(&request))
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        debug!(provider = "bedrock", model = %request.model_id, "Sending invoke request");

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");

        builder = match (bearer, key_pair) {
            (Some(token), _) => builder.bearer_auth(token),
            (None, Some((access_key, secret_key))) => {
                let params = SigningParams {
                    access_key,
                    secret_key,
                    region: &self.credentials.region,
                    service: SERVICE,
                    time: chrono::Utc::now(),
                };
                let amz_date = params.amz_date();
                let mut headers = vec![
                    ("content-type".to_string(), "application/json".to_string()),
                    ("host".to_string(), self.host()?),
                    ("x-amz-date".to_string(), amz_date.clone()),
                ];
                if let Some(token) = self.credentials.session_token.as_deref() {
                    headers.push(("x-amz-security-token".to_string(), token.to_string()));
                    builder = builder.header("X-Amz-Security-Token", token);
                }
                // The canonical path encodes each segment a second time
                let canonical_uri = path
                    .split('/')
                    .map(|segment| sigv4::uri_encode(segment, true))
                    .collect::<Vec<_>>()
                    .join("/");
                let signing = SigningRequest {
                    method: "POST",
                    canonical_uri: &canonical_uri,
                    canonical_query: "",
                    headers,
                    payload: &payload,
                };
                builder
                    .header("X-Amz-Date", amz_date)
                    .header("Authorization", sigv4::authorization_header(&signing, &params))
            }
            (None, None) => builder,
        };

        let api_resp: ApiResponse = send_json("bedrock", builder.body(payload)).await?;
        Self::parse_response(api_resp)
    }
}

// --- Anthropic Messages wire types ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: Vec<ApiBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zabbot_core::message::Turn;
    use zabbot_core::Provider;

    fn provider(credentials: BedrockCredentials) -> BedrockProvider {
        BedrockProvider::new(credentials, reqwest::Client::new())
    }

    fn key_pair() -> BedrockCredentials {
        BedrockCredentials {
            region: "us-west-2".into(),
            access_key: Some("AKIDEXAMPLE".into()),
            secret_key: Some("secret".into()),
            ..Default::default()
        }
    }

    #[test]
    fn endpoint_follows_region() {
        let p = provider(key_pair());
        assert_eq!(p.endpoint, "https://bedrock-runtime.us-west-2.amazonaws.com");
        assert_eq!(p.host().unwrap(), "bedrock-runtime.us-west-2.amazonaws.com");
    }

    #[test]
    fn model_id_is_percent_encoded_in_path() {
        assert_eq!(
            BedrockProvider::invoke_path("us.anthropic.claude-3-5-sonnet-20241022-v2:0"),
            "/model/us.anthropic.claude-3-5-sonnet-20241022-v2%3A0/invoke"
        );
    }

    #[test]
    fn body_uses_messages_format() {
        let mut conv = Conversation::new("List host groups");
        conv.push(Turn::assistant(vec![
            ContentBlock::text("Checking."),
            ContentBlock::invocation("toolu_1", "get_host_groups", Arguments::new()),
        ]));
        conv.push(Turn::tool_results(vec![ContentBlock::outcome(
            "toolu_1",
            "[{\"groupid\":\"2\"}]",
            false,
        )]));
        let tools = vec![ToolDefinition {
            name: "get_host_groups".into(),
            description: "List host groups".into(),
            input_schema: json!({"type": "object", "properties": {}, "required": []}),
        }];
        let request = ProviderRequest {
            conversation: &conv,
            tools: &tools,
            system_prompt: "You are a monitoring assistant.",
            model_id: "anthropic.claude",
        };

        let body = provider(key_pair()).build_body(&request);
        assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["system"], "You are a monitoring assistant.");
        assert_eq!(body["tools"][0]["name"], "get_host_groups");
        assert!(body["tools"][0].get("input_schema").is_some());

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"][1]["type"], "tool_use");
        assert_eq!(messages[1]["content"][1]["id"], "toolu_1");
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"][0]["type"], "tool_result");
        assert_eq!(messages[2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(messages[2]["content"][0]["is_error"], false);
    }

    #[test]
    fn parse_text_and_tool_use_in_order() {
        let raw = json!({
            "id": "msg_1",
            "content": [
                {"type": "text", "text": "Looking up templates."},
                {"type": "tool_use", "id": "toolu_a", "name": "get_templates", "input": {"search": "Linux"}},
                {"type": "tool_use", "id": "toolu_b", "name": "get_host_groups", "input": {}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 120, "output_tokens": 40}
        });
        let resp = BedrockProvider::parse_response(serde_json::from_value(raw).unwrap()).unwrap();
        assert_eq!(resp.stop_reason, StopReason::ToolUse);
        let calls: Vec<_> = resp.invocations().map(|(id, name, _)| (id, name)).collect();
        assert_eq!(calls, vec![("toolu_a", "get_templates"), ("toolu_b", "get_host_groups")]);
        assert_eq!(resp.usage.unwrap().prompt_tokens, 120);
    }

    #[test]
    fn repeated_or_empty_tool_use_ids_are_replaced() {
        let raw = json!({
            "content": [
                {"type": "tool_use", "id": "toolu_a", "name": "get_templates", "input": {}},
                {"type": "tool_use", "id": "toolu_a", "name": "get_host_groups", "input": {}},
                {"type": "tool_use", "id": "", "name": "get_host_groups", "input": {}}
            ],
            "stop_reason": "tool_use"
        });
        let resp = BedrockProvider::parse_response(serde_json::from_value(raw).unwrap()).unwrap();
        let ids: Vec<&str> = resp.invocations().map(|(id, _, _)| id).collect();
        assert_eq!(ids[0], "toolu_a");
        assert!(ids[1].starts_with("call_") && ids[2].starts_with("call_"));
        assert_ne!(ids[1], ids[2]);
    }

    #[test]
    fn parse_plain_text() {
        let raw = json!({
            "content": [{"type": "text", "text": "All hosts are healthy."}],
            "stop_reason": "end_turn"
        });
        let resp = BedrockProvider::parse_response(serde_json::from_value(raw).unwrap()).unwrap();
        assert_eq!(resp.stop_reason, StopReason::Text);
        assert_eq!(resp.text_content(), "All hosts are healthy.");
    }

    #[test]
    fn non_object_tool_input_is_invalid() {
        let raw = json!({
            "content": [{"type": "tool_use", "id": "t", "name": "get_templates", "input": "Linux"}]
        });
        let err = BedrockProvider::parse_response(serde_json::from_value(raw).unwrap()).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_network() {
        let p = provider(BedrockCredentials {
            region: "us-east-1".into(),
            ..Default::default()
        })
        .with_endpoint("http://127.0.0.1:1");
        let conv = Conversation::new("hi");
        let err = p
            .send(ProviderRequest {
                conversation: &conv,
                tools: &[],
                system_prompt: "",
                model_id: "m",
            })
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
