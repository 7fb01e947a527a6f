//! Research Orchestrator: bounded retry loop around the Agent Gateway.
//!
//! Each attempt invokes the gateway with the current transcript. A structured
//! report that passes [`validate`] ends the loop; anything else appends a
//! corrective user message and tries again, up to [`MAX_ATTEMPTS`] times. The
//! most recent candidate is returned when attempts run out.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Error;
use crate::gateway::{AgentGateway, GatewayOutput};
use crate::message::Message;
use crate::report::ResearchResult;
use crate::validate::{validate, ReportChecks};

/// Gateway calls per research request.
pub const MAX_ATTEMPTS: usize = 3;

/// Sent when an attempt ended without any assistant answer.
pub const RETRY_INSTRUCTION: &str = "No final answer was received. Finish the research and \
answer with the JSON report.";

/// Result of a research request plus how it was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRun {
    pub result: ResearchResult,
    /// Gateway calls made, at most [`MAX_ATTEMPTS`].
    pub attempts: usize,
    /// Whether `result` passed validation. Exhausted runs return `false`.
    pub validated: bool,
}

#[derive(Clone)]
pub struct Researcher {
    gateway: Arc<dyn AgentGateway>,
}

impl Researcher {
    pub fn new(gateway: Arc<dyn AgentGateway>) -> Self {
        Self { gateway }
    }

    /// Research `query`, returning only the final result.
    pub async fn research(&self, query: &str) -> Result<ResearchResult, Error> {
        self.run(query).await.map(|run| run.result)
    }

    /// Research `query`. Gateway errors abort the loop and are returned as-is.
    pub async fn run(&self, query: &str) -> Result<ResearchRun, Error> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let mut transcript = vec![Message::user(query)];
        let mut best: Option<ResearchResult> = None;
        let mut attempts = 0;

        while attempts < MAX_ATTEMPTS {
            attempts += 1;

            let output = self.gateway.invoke(&transcript).await?;
            let candidate = candidate_from(output);

            let correction = match &candidate {
                Some(result) => {
                    let verdict = validate(result);
                    match result {
                        ResearchResult::Structured(response) => {
                            let checks = ReportChecks::of(response);
                            info!(
                                attempt = attempts,
                                passed = verdict.passed,
                                uses_encyclopedia = checks.uses_encyclopedia,
                                word_count = checks.word_count,
                                distinct_sources = checks.distinct_source_count,
                                raw_snippet = checks.looks_like_raw_snippet,
                                "Structured report received"
                            );
                        }
                        ResearchResult::Unstructured(text) => {
                            info!(attempt = attempts, len = text.len(), "Unstructured answer received");
                        }
                    }
                    if verdict.passed {
                        return Ok(ResearchRun {
                            result: result.clone(),
                            attempts,
                            validated: true,
                        });
                    }
                    verdict.correction
                }
                None => {
                    info!(attempt = attempts, "No answer received");
                    RETRY_INSTRUCTION.to_string()
                }
            };

            // The latest candidate always wins, even over an earlier structured one.
            if candidate.is_some() {
                best = candidate;
            }

            if attempts < MAX_ATTEMPTS {
                transcript.push(Message::user(correction));
            }
        }

        warn!(
            attempts,
            has_candidate = best.is_some(),
            "Research attempts exhausted without a validated report"
        );

        Ok(ResearchRun {
            result: best.unwrap_or_else(ResearchResult::no_response),
            attempts,
            validated: false,
        })
    }
}

/// Structured output if present, else the last assistant message as raw text.
fn candidate_from(output: GatewayOutput) -> Option<ResearchResult> {
    let GatewayOutput {
        structured,
        mut messages,
    } = output;
    if let Some(response) = structured {
        return Some(ResearchResult::Structured(response));
    }
    messages
        .pop()
        .filter(|m| m.is_assistant())
        .map(|m| ResearchResult::Unstructured(m.content))
}
