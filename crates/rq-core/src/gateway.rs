//! Agent Gateway: the seam between the research loop and a tool-using model.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::agent::{Agent, AgentConfig};
use crate::error::Error;
use crate::message::Message;
use crate::prompt::research_system_prompt;
use crate::provider::Provider;
use crate::report::ResearchResponse;
use crate::tool::ToolRegistry;

/// What one gateway invocation produced.
#[derive(Debug, Clone, Default)]
pub struct GatewayOutput {
    /// The final answer coerced into the report schema, if it fit.
    pub structured: Option<ResearchResponse>,
    /// Messages of the run, ending with the model's last message.
    pub messages: Vec<Message>,
}

/// Given a transcript, return a structured report or the raw conversation.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    async fn invoke(&self, transcript: &[Message]) -> Result<GatewayOutput, Error>;
}

/// Production gateway: runs a tool-calling [`Agent`] and parses its answer.
pub struct ToolAgentGateway {
    agent: Agent,
}

impl ToolAgentGateway {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            agent: Agent::new(provider, tools, config),
        }
    }

    /// Default research configuration: research prompt, 20 tool iterations.
    pub fn research_config() -> AgentConfig {
        AgentConfig::new("researcher").with_system_prompt(research_system_prompt())
    }
}

#[async_trait]
impl AgentGateway for ToolAgentGateway {
    async fn invoke(&self, transcript: &[Message]) -> Result<GatewayOutput, Error> {
        let run = self.agent.run(transcript).await?;
        let structured = run.final_content().and_then(parse_structured);

        debug!(
            agent = %self.agent.id(),
            iterations = run.iterations,
            total_tokens = run.usage.total_tokens,
            structured = structured.is_some(),
            "Gateway invocation finished"
        );

        Ok(GatewayOutput {
            structured,
            messages: run.messages,
        })
    }
}

/// Coerce model output into a [`ResearchResponse`].
///
/// Takes the outermost `{...}` span, which also unwraps Markdown code fences
/// and leading chatter. Anything that does not deserialize yields `None`.
pub fn parse_structured(content: &str) -> Option<ResearchResponse> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}
