//! Research report types.

use serde::{Deserialize, Serialize};

/// Returned when no attempt produced any usable response.
pub const NO_RESPONSE: &str = "No response.";

/// Schema-conformant research output requested from the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub topic: String,
    pub report: String,
    pub sources: Vec<String>,
    pub tools_used: Vec<String>,
}

/// Outcome of a research request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchResult {
    /// Parsed output matching [`ResearchResponse`].
    Structured(ResearchResponse),
    /// Raw assistant text, kept when structured parsing failed.
    Unstructured(String),
}

impl ResearchResult {
    pub fn no_response() -> Self {
        ResearchResult::Unstructured(NO_RESPONSE.to_string())
    }

    /// True for the sentinel returned when no attempt produced a candidate.
    pub fn is_no_response(&self) -> bool {
        matches!(self, ResearchResult::Unstructured(text) if text == NO_RESPONSE)
    }

    pub fn as_structured(&self) -> Option<&ResearchResponse> {
        match self {
            ResearchResult::Structured(response) => Some(response),
            ResearchResult::Unstructured(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResearchResult::Structured(_) => "structured",
            ResearchResult::Unstructured(_) => "unstructured",
        }
    }
}
