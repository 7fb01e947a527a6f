//! Test utilities shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::Error;
use crate::gateway::{AgentGateway, GatewayOutput};
use crate::message::{Message, ToolCall, Usage};
use crate::provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
use crate::report::ResearchResponse;
use crate::tool::{PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

/// Provider replaying queued completions in FIFO order.
pub struct MockProvider {
    responses: Mutex<VecDeque<CompletionResponse>>,
    /// Every request received, oldest first.
    pub captured_requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            captured_requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a final text answer.
    pub fn queue_response(&self, content: &str) {
        self.queue_raw_response(CompletionResponse {
            message: Message::assistant(content),
            usage: Usage::new(0, 0),
            model: "mock-model".to_string(),
            finish_reason: FinishReason::Stop,
        });
    }

    /// Queue a response asking for a single tool call.
    pub fn queue_tool_call(&self, id: &str, name: &str, arguments: serde_json::Value) {
        self.queue_raw_response(CompletionResponse {
            message: Message::assistant_with_tool_calls("", vec![ToolCall::new(id, name, arguments)]),
            usage: Usage::new(0, 0),
            model: "mock-model".to_string(),
            finish_reason: FinishReason::ToolCalls,
        });
    }

    pub fn queue_raw_response(&self, response: CompletionResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.captured_requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> Option<&str> {
        None
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        self.captured_requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Unknown("No mock response queued".to_string()))
    }
}

/// A tool that always answers with the same text.
pub struct StaticTool {
    name: String,
    output: String,
}

impl StaticTool {
    pub fn new(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
        }
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Returns canned text"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new().add_property("query", PropertySchema::string("Query"), true),
        )
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        Ok(ToolOutput::success(self.output.as_str()))
    }
}

/// A gateway that replays scripted outputs and records every transcript.
pub struct ScriptedGateway {
    outputs: Mutex<VecDeque<Result<GatewayOutput, Error>>>,
    transcripts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            outputs: Mutex::new(VecDeque::new()),
            transcripts: Mutex::new(Vec::new()),
        }
    }

    /// Queue an output (FIFO).
    pub fn push(&self, output: Result<GatewayOutput, Error>) {
        self.outputs.lock().unwrap().push_back(output);
    }

    /// Queue a structured report, ending on an assistant message carrying its JSON.
    pub fn push_structured(&self, response: ResearchResponse) {
        let json = serde_json::to_string(&response).unwrap();
        self.push(Ok(GatewayOutput {
            structured: Some(response),
            messages: vec![Message::assistant(json)],
        }));
    }

    /// Queue a free-text answer with no structured result.
    pub fn push_text(&self, text: &str) {
        self.push(Ok(GatewayOutput {
            structured: None,
            messages: vec![Message::assistant(text)],
        }));
    }

    /// Queue an output with no messages at all.
    pub fn push_empty(&self) {
        self.push(Ok(GatewayOutput::default()));
    }

    /// Queue an output whose last message is a tool result.
    pub fn push_tool_ending(&self) {
        self.push(Ok(GatewayOutput {
            structured: None,
            messages: vec![Message::tool_result("call-1", "Page: Rust")],
        }));
    }

    pub fn push_error(&self, error: Error) {
        self.push(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.transcripts.lock().unwrap().len()
    }

    /// Transcripts received, one per invocation.
    pub fn transcripts(&self) -> Vec<Vec<Message>> {
        self.transcripts.lock().unwrap().clone()
    }
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentGateway for ScriptedGateway {
    async fn invoke(&self, transcript: &[Message]) -> Result<GatewayOutput, Error> {
        self.transcripts.lock().unwrap().push(transcript.to_vec());
        self.outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Unknown("No scripted output queued".to_string())))
    }
}
