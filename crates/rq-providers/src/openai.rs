//! OpenAI-compatible chat completions client.
//!
//! Mistral (the default endpoint) and most self-hosted servers speak this
//! wire format, so a single provider covers them all.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use rq_core::{
    CompletionRequest, CompletionResponse, Error, FinishReason, Message, Provider, Role, ToolCall,
    ToolDefinition, Usage,
};

pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: Option<String>,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Request body for `request`. The request's model wins over the default;
    /// with neither, the field is omitted and the server picks.
    fn wire_request(&self, request: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: request.model.clone().or_else(|| self.default_model.clone()),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools: request.tools.iter().map(WireTool::from).collect(),
            extra: request.extra.clone(),
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        let body = self.wire_request(&request);
        debug!(
            model = ?body.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "Sending chat completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::network(e.to_string()))?;
        trace!(status = status.as_u16(), body = %text, "Chat completion response");

        if !status.is_success() {
            return Err(error_from_status(status.as_u16(), &text));
        }

        let reply: ChatResponse = serde_json::from_str(&text)?;
        reply.into_completion()
    }
}

/// Map an unsuccessful HTTP answer to an [`Error`].
fn error_from_status(status: u16, body: &str) -> Error {
    // Both `{"error": {"message": ..}}` and Mistral's flat `{"message": ..}`.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorBody {
        Nested { error: ErrorMessage },
        Flat(ErrorMessage),
    }

    #[derive(Deserialize)]
    struct ErrorMessage {
        message: String,
    }

    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody::Nested { error }) | Ok(ErrorBody::Flat(error)) => error.message,
        Err(_) => return Error::api(status, body),
    };

    match status {
        400 => Error::invalid_request(message),
        401 => Error::auth(message),
        429 => Error::rate_limit(message),
        _ => Error::api(status, message),
    }
}

fn finish_reason(raw: Option<&str>) -> FinishReason {
    match raw {
        Some("length") | Some("model_length") => FinishReason::Length,
        Some("tool_calls") => FinishReason::ToolCalls,
        Some("content_filter") => FinishReason::ContentFilter,
        Some("error") => FinishReason::Error,
        _ => FinishReason::Stop,
    }
}

// Wire format

#[derive(Debug, Serialize)]
struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: Some(message.content.clone()),
            tool_calls: message.tool_calls.iter().map(WireToolCall::from).collect(),
            tool_call_id: message.tool_call_id.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: function_kind(),
            function: WireFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.to_string(),
            },
        }
    }
}

impl WireToolCall {
    /// Arguments arrive as a JSON string; malformed ones become `null` and the
    /// tool reports the problem back to the model.
    fn into_tool_call(self) -> ToolCall {
        let arguments = serde_json::from_str(&self.function.arguments).unwrap_or(Value::Null);
        ToolCall::new(self.id, self.function.name, arguments)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

impl From<&ToolDefinition> for WireTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: serde_json::to_value(&tool.parameters).unwrap_or(Value::Null),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatResponse {
    fn into_completion(self) -> Result<CompletionResponse, Error> {
        let Some(choice) = self.choices.into_iter().next() else {
            return Err(Error::api(500, "Response contained no choices"));
        };

        let content = choice.message.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .into_iter()
            .map(WireToolCall::into_tool_call)
            .collect();

        let message = if tool_calls.is_empty() {
            Message::assistant(content)
        } else {
            Message::assistant_with_tool_calls(content, tool_calls)
        };

        Ok(CompletionResponse {
            message,
            usage: self
                .usage
                .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
                .unwrap_or_default(),
            model: self.model,
            finish_reason: finish_reason(choice.finish_reason.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rq_core::{PropertySchema, ToolParameters};

    #[test]
    fn test_defaults() {
        let provider = OpenAIProvider::new("key");
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.default_model(), None);
        assert_eq!(provider.endpoint(), "https://api.mistral.ai/v1/chat/completions");

        let local = OpenAIProvider::new("key").with_base_url("http://localhost:8080/v1/");
        assert_eq!(local.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_wire_request_with_tools() {
        let provider = OpenAIProvider::new("key").with_default_model("codestral-latest");
        let tool = ToolDefinition::new("wikipedia", "Encyclopedia lookup").with_parameters(
            ToolParameters::new().add_property("query", PropertySchema::string("Terms"), true),
        );
        let request = CompletionRequest::new(vec![Message::system("Be brief"), Message::user("Rust")])
            .with_tools(vec![tool]);

        let json = serde_json::to_value(provider.wire_request(&request)).unwrap();
        assert_eq!(json["model"], "codestral-latest");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Rust");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "wikipedia");
        assert_eq!(json["tools"][0]["function"]["parameters"]["required"][0], "query");
    }

    #[test]
    fn test_wire_request_minimal() {
        let provider = OpenAIProvider::new("key");
        let request = CompletionRequest::new(vec![Message::user("Hi")]).with_model("mistral-small");
        let json = serde_json::to_value(provider.wire_request(&request)).unwrap();

        assert_eq!(json["model"], "mistral-small");
        assert!(json.get("tools").is_none());
        assert!(json.get("temperature").is_none());
        assert!(json["messages"][0].get("tool_calls").is_none());
    }

    #[test]
    fn test_extra_is_flattened() {
        let provider = OpenAIProvider::new("key");
        let mut extra = HashMap::new();
        extra.insert("response_format".to_string(), serde_json::json!({"type": "json_object"}));
        let request = CompletionRequest::new(vec![Message::user("Hi")]).with_extra(extra);

        let json = serde_json::to_value(provider.wire_request(&request)).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_tool_messages_on_the_wire() {
        let call = ToolCall::new("call-1", "wikipedia", serde_json::json!({"query": "Rust"}));
        let assistant = WireMessage::from(&Message::assistant_with_tool_calls("", vec![call]));
        assert_eq!(assistant.tool_calls[0].function.arguments, r#"{"query":"Rust"}"#);

        let json = serde_json::to_value(WireMessage::from(&Message::tool_result("call-1", "Page: Rust"))).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call-1");
    }

    #[test]
    fn test_response_with_tool_calls() {
        let body = r#"{
            "model": "codestral-latest",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "id": "abc",
                        "function": {"name": "web_search", "arguments": "{\"query\":\"rust\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        }"#;
        let completion = serde_json::from_str::<ChatResponse>(body)
            .unwrap()
            .into_completion()
            .unwrap();

        assert_eq!(completion.finish_reason, FinishReason::ToolCalls);
        assert_eq!(completion.message.tool_calls[0].name, "web_search");
        assert_eq!(completion.message.tool_calls[0].arguments["query"], "rust");
        assert_eq!(completion.usage.total_tokens, 15);
    }

    #[test]
    fn test_response_null_content() {
        let body = r#"{"model": "m", "choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let completion = serde_json::from_str::<ChatResponse>(body)
            .unwrap()
            .into_completion()
            .unwrap();
        assert_eq!(completion.message.content, "");
        assert_eq!(completion.finish_reason, FinishReason::Stop);
    }

    #[test]
    fn test_response_without_choices() {
        let reply: ChatResponse = serde_json::from_str(r#"{"model": "m", "choices": []}"#).unwrap();
        assert!(reply.into_completion().is_err());
    }

    #[test]
    fn test_error_from_status() {
        let nested = r#"{"error": {"message": "bad key", "type": "auth"}}"#;
        assert!(matches!(error_from_status(401, nested), Error::Auth(m) if m == "bad key"));
        assert!(matches!(error_from_status(429, nested), Error::RateLimit(_)));
        assert!(matches!(error_from_status(400, nested), Error::InvalidRequest(_)));
        assert!(matches!(
            error_from_status(401, r#"{"message": "Unauthorized"}"#),
            Error::Auth(m) if m == "Unauthorized"
        ));
        assert!(matches!(
            error_from_status(503, "upstream down"),
            Error::Api { status: 503, .. }
        ));
    }
}
