//! Tool-calling agent loop.
//!
//! An [`Agent`] sends the conversation plus the tool capability list to a
//! [`Provider`], executes any tool calls the model asks for, feeds the results
//! back, and stops at the first assistant message that requests no tools.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::message::{Message, Role, ToolCall, Usage};
use crate::provider::{CompletionRequest, Provider};
use crate::tool::ToolRegistry;

/// Unique identifier for an agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentId(pub String);

impl AgentId {
    /// Create a new agent ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Configuration for an agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Unique agent identifier.
    pub id: AgentId,
    /// System prompt for the agent.
    pub system_prompt: Option<String>,
    /// Maximum agentic loop iterations.
    pub max_iterations: usize,
    /// Model override; the provider default is used when unset.
    pub model: Option<String>,
    /// Extra request parameters passed through to the provider.
    pub extra: HashMap<String, serde_json::Value>,
}

impl AgentConfig {
    /// Create a new agent configuration.
    pub fn new(id: impl Into<AgentId>) -> Self {
        Self {
            id: id.into(),
            system_prompt: None,
            max_iterations: 20,
            model: None,
            extra: HashMap::new(),
        }
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the maximum iterations.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the model override.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add an extra request parameter.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Everything produced by one agent run.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// The input context followed by every message the run produced
    /// (tool calls, tool results, final answer). The system prompt is omitted.
    pub messages: Vec<Message>,
    /// Token usage summed over all iterations.
    pub usage: Usage,
    /// Number of model calls made.
    pub iterations: usize,
}

impl AgentRun {
    /// Content of the final assistant message, if the run ended on one.
    pub fn final_content(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.is_assistant())
            .map(|m| m.content.as_str())
    }
}

/// An LLM-powered agent with access to a tool registry.
pub struct Agent {
    /// Agent configuration.
    pub config: AgentConfig,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
}

impl Agent {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            config,
            provider,
            tools,
        }
    }

    /// Get the agent's ID.
    pub fn id(&self) -> &AgentId {
        &self.config.id
    }

    /// Run the agent over `context` until the model answers without tool calls.
    pub async fn run(&self, context: &[Message]) -> Result<AgentRun, Error> {
        let config = &self.config;

        debug!(
            agent = %config.id,
            context_messages = context.len(),
            tools_available = self.tools.len(),
            "Agent run starting"
        );

        let mut messages = Vec::with_capacity(context.len() + 1);
        if let Some(system) = &config.system_prompt {
            messages.push(Message::system(system.as_str()));
        }
        messages.extend_from_slice(context);

        let mut usage = Usage::default();

        for iteration in 0..config.max_iterations {
            debug!(
                agent = %config.id,
                iteration = iteration,
                message_count = messages.len(),
                "Agent iteration starting"
            );

            let mut request = CompletionRequest::new(messages.clone())
                .with_tools(self.tools.definitions())
                .with_extra(config.extra.clone());
            if let Some(model) = &config.model {
                request = request.with_model(model.as_str());
            }

            let response = self.provider.complete(request).await?;
            usage = Usage::new(
                usage.prompt_tokens + response.usage.prompt_tokens,
                usage.completion_tokens + response.usage.completion_tokens,
            );

            let tool_calls = response.message.tool_calls;
            if !tool_calls.is_empty() {
                debug!(
                    agent = %config.id,
                    tool_count = tool_calls.len(),
                    "Agent executing tools"
                );

                messages.push(Message::assistant_with_tool_calls(
                    response.message.content,
                    tool_calls.clone(),
                ));

                for tool_call in &tool_calls {
                    debug!(agent = %config.id, tool = %tool_call.name, "Executing tool");
                    let result = execute_tool(&self.tools, tool_call).await;
                    messages.push(Message::tool_result(&tool_call.id, result));
                }

                continue;
            }

            let content = response.message.content;
            debug!(
                agent = %config.id,
                iterations = iteration + 1,
                response_len = content.len(),
                "Agent completed"
            );
            messages.push(Message::assistant(content));

            if messages.first().is_some_and(|m| m.role == Role::System) {
                messages.remove(0);
            }

            return Ok(AgentRun {
                messages,
                usage,
                iterations: iteration + 1,
            });
        }

        Err(Error::MaxIterations {
            agent: config.id.to_string(),
            max: config.max_iterations,
        })
    }
}

/// Execute a single tool call, rendering failures as text for the model.
async fn execute_tool(registry: &ToolRegistry, tool_call: &ToolCall) -> String {
    let Some(tool) = registry.get(&tool_call.name) else {
        return format!("Error: Unknown tool '{}'", tool_call.name);
    };

    match tool.execute(tool_call.arguments.clone()).await {
        Ok(output) => output.content,
        Err(e) => format!("Error executing tool: {}", e),
    }
}
