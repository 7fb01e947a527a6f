//! rq-core: Core types and the research loop for research-query
//!
//! This crate provides the message and tool types shared by the workspace,
//! the tool-calling agent, the Agent Gateway, the report validator and the
//! research orchestrator.

pub mod agent;
pub mod error;
pub mod gateway;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod report;
pub mod research;
pub mod tool;
pub mod validate;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::{Agent, AgentConfig, AgentId, AgentRun};
pub use error::Error;
pub use gateway::{parse_structured, AgentGateway, GatewayOutput, ToolAgentGateway};
pub use message::{Message, Role, ToolCall, Usage};
pub use prompt::research_system_prompt;
pub use provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
pub use report::{ResearchResponse, ResearchResult, NO_RESPONSE};
pub use research::{ResearchRun, Researcher, MAX_ATTEMPTS};
pub use tool::{PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters, ToolRegistry};
pub use validate::{validate, ReportChecks, ValidationVerdict};

pub type Result<T> = std::result::Result<T, Error>;
