//! OpenAI chat completions provider.
//!
//! Supports:
//! - Tool use / function calling with `tool_choice: "auto"`
//! - A custom base URL for compatible gateways

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zabbot_core::error::ProviderError;
use zabbot_core::message::{Arguments, CallIds, ContentBlock, Conversation, Role};
use zabbot_core::provider::*;

use crate::http::send_json;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// An OpenAI chat completions provider.
pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key,
            temperature: 0.5,
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Convert the conversation to OpenAI messages, system prompt first.
    ///
    /// A tool-result turn fans out into one `tool` message per outcome.
    fn to_api_messages(system_prompt: &str, conversation: &Conversation) -> Vec<ApiMessage> {
        let mut messages = vec![ApiMessage::text("system", system_prompt)];

        for turn in conversation.turns() {
            match turn.role {
                Role::User => messages.push(ApiMessage::text("user", turn.text())),
                Role::Assistant => {
                    let tool_calls: Vec<ApiToolCall> = turn
                        .content
                        .iter()
                        .filter_map(|b| match b {
                            ContentBlock::ToolInvocation {
                                call_id,
                                tool_name,
                                arguments,
                            } => Some(ApiToolCall {
                                id: call_id.clone(),
                                call_type: "function".into(),
                                function: ApiFunctionCall {
                                    name: tool_name.clone(),
                                    arguments: serde_json::Value::Object(arguments.clone())
                                        .to_string(),
                                },
                            }),
                            _ => None,
                        })
                        .collect();
                    let text = turn.text();
                    messages.push(ApiMessage {
                        role: "assistant".into(),
                        content: (!text.is_empty() || tool_calls.is_empty()).then_some(text),
                        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                        tool_call_id: None,
                    });
                }
                Role::ToolResult => {
                    for block in &turn.content {
                        if let ContentBlock::ToolOutcome {
                            call_id, content, ..
                        } = block
                        {
                            messages.push(ApiMessage {
                                role: "tool".into(),
                                content: Some(content.clone()),
                                tool_calls: None,
                                tool_call_id: Some(call_id.clone()),
                            });
                        }
                    }
                }
            }
        }

        messages
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                tool_type: "function".into(),
                function: ApiFunctionDef {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect()
    }

    fn build_body(&self, request: &ProviderRequest<'_>) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model_id,
            "messages": Self::to_api_messages(request.system_prompt, request.conversation),
            "temperature": self.temperature,
        });
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(request.tools));
            body["tool_choice"] = serde_json::json!("auto");
        }
        body
    }

    fn parse_response(resp: ApiResponse) -> Result<ProviderResponse, ProviderError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".into()))?;

        let mut blocks = Vec::new();
        let mut call_ids = CallIds::new();
        if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
            blocks.push(ContentBlock::text(text));
        }
        for call in choice.message.tool_calls.unwrap_or_default() {
            let arguments: Arguments = if call.function.arguments.trim().is_empty() {
                Arguments::new()
            } else {
                serde_json::from_str(&call.function.arguments).map_err(|e| {
                    ProviderError::InvalidResponse(format!(
                        "arguments for '{}' are not a JSON object: {e}",
                        call.function.name
                    ))
                })?
            };
            let call_id = call_ids.claim(Some(call.id.as_str()));
            blocks.push(ContentBlock::invocation(call_id, call.function.name, arguments));
        }

        debug!(finish_reason = ?choice.finish_reason, blocks = blocks.len(), "OpenAI response");
        let response = ProviderResponse::from_blocks(blocks);
        Ok(match resp.usage {
            Some(u) => response.with_usage(Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
            None => response,
        })
    }
}

#[async_trait]
impl zabbot_core::Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn send(&self, request: ProviderRequest<'_>) -> Result<ProviderResponse, ProviderError> {
        let Some(api_key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
        else {
            return Err(ProviderError::NotConfigured(
                "AI Configuration Error: OpenAI API Key not configured.".into(),
            ));
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(provider = "openai", model = %request.model_id, "Sending completion request");

        let builder = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.build_body(&request));

        let api_resp: ApiResponse = send_json("openai", builder).await?;
        Self::parse_response(api_resp)
    }
}

// --- OpenAI API types ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: ApiFunctionCall,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    #[serde(rename = "type")]
    tool_type: String,
    function: ApiFunctionDef,
}

#[derive(Debug, Serialize)]
struct ApiFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zabbot_core::message::Turn;
    use zabbot_core::Provider;

    fn parse(raw: serde_json::Value) -> Result<ProviderResponse, ProviderError> {
        OpenAiProvider::parse_response(serde_json::from_value(raw).unwrap())
    }

    #[test]
    fn constructor_with_base_url() {
        let p = OpenAiProvider::new(Some("sk-test".into()), reqwest::Client::new())
            .with_base_url("http://localhost:4000/v1/");
        assert_eq!(p.base_url, "http://localhost:4000/v1");
        assert_eq!(p.name(), "openai");
    }

    #[test]
    fn system_prompt_leads_and_tool_results_fan_out() {
        let mut args = Arguments::new();
        args.insert("search".into(), json!("Linux"));
        let mut conv = Conversation::new("Which templates exist?");
        conv.push(Turn::assistant(vec![
            ContentBlock::invocation("call_1", "get_templates", args),
            ContentBlock::invocation("call_2", "get_host_groups", Arguments::new()),
        ]));
        conv.push(Turn::tool_results(vec![
            ContentBlock::outcome("call_1", "[]", false),
            ContentBlock::outcome("call_2", "boom", true),
        ]));

        let messages = OpenAiProvider::to_api_messages("SYSTEM", &conv);
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content.as_deref(), Some("SYSTEM"));
        assert_eq!(messages[1].role, "user");

        let assistant = &messages[2];
        assert!(assistant.content.is_none());
        let calls = assistant.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.arguments, r#"{"search":"Linux"}"#);

        assert_eq!(messages[3].role, "tool");
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(messages[4].tool_call_id.as_deref(), Some("call_2"));
    }

    #[test]
    fn body_requests_automatic_tool_choice() {
        let conv = Conversation::new("hi");
        let tools = vec![ToolDefinition {
            name: "get_host_groups".into(),
            description: "List host groups".into(),
            input_schema: json!({"type": "object", "properties": {}}),
        }];
        let p = OpenAiProvider::new(Some("sk".into()), reqwest::Client::new());
        let body = p.build_body(&ProviderRequest {
            conversation: &conv,
            tools: &tools,
            system_prompt: "S",
            model_id: "gpt-4o",
        });
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "get_host_groups");
        assert!(body["tools"][0]["function"].get("parameters").is_some());
    }

    #[test]
    fn parse_tool_calls_with_string_arguments() {
        let resp = parse(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "acknowledge_problem", "arguments": "{\"eventid\":\"42\",\"message\":\"on it\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }))
        .unwrap();

        assert_eq!(resp.stop_reason, StopReason::ToolUse);
        let (id, name, args) = resp.invocations().next().unwrap();
        assert_eq!(id, "call_abc");
        assert_eq!(name, "acknowledge_problem");
        assert_eq!(args["eventid"], "42");
    }

    #[test]
    fn empty_tool_call_ids_get_distinct_replacements() {
        let resp = parse(json!({
            "choices": [{
                "message": {
                    "tool_calls": [
                        {"id": "", "type": "function", "function": {"name": "get_host_groups", "arguments": "{}"}},
                        {"id": "", "type": "function", "function": {"name": "get_templates", "arguments": "{}"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let ids: Vec<&str> = resp.invocations().map(|(id, _, _)| id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| id.starts_with("call_")));
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn unparseable_arguments_are_invalid_response() {
        let err = parse(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call_x",
                        "type": "function",
                        "function": {"name": "create_host", "arguments": "{not json"}
                    }]
                }
            }]
        }))
        .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn empty_choices_are_invalid_response() {
        assert!(matches!(
            parse(json!({"choices": []})),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn parse_plain_text() {
        let resp = parse(json!({
            "choices": [{"message": {"content": "Done."}, "finish_reason": "stop"}]
        }))
        .unwrap();
        assert_eq!(resp.stop_reason, StopReason::Text);
        assert_eq!(resp.text_content(), "Done.");
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let p = OpenAiProvider::new(None, reqwest::Client::new()).with_base_url("http://127.0.0.1:1");
        let conv = Conversation::new("hi");
        let err = p
            .send(ProviderRequest {
                conversation: &conv,
                tools: &[],
                system_prompt: "",
                model_id: "gpt-4o",
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "AI Configuration Error: OpenAI API Key not configured.");
    }
}
