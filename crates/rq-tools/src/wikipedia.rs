//! Encyclopedia lookup via the MediaWiki API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use rq_core::{Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// Maximum characters of article text returned to the agent.
pub const MAX_CHARS: usize = 1000;

const NO_RESULT: &str = "No good Wikipedia Search Result was found";

pub struct WikipediaTool {
    client: Client,
    endpoint: String,
}

impl Default for WikipediaTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WikipediaTool {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(crate::USER_AGENT)
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Point at another MediaWiki installation (e.g. another language edition).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Deserialize)]
struct WikipediaArgs {
    query: String,
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Look up a topic on Wikipedia. Returns the title and a short summary of the best matching article."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new()
                .add_property("query", PropertySchema::string("Topic or search terms"), true),
        )
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error> {
        let args: WikipediaArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool("wikipedia", format!("Invalid arguments: {}", e)))?;

        // generator=search feeds the top hit straight into the extracts query.
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", args.query.as_str()),
                ("gsrlimit", "1"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
            ])
            .send()
            .await
            .map_err(|e| Error::tool("wikipedia", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::tool(
                "wikipedia",
                format!("Wikipedia API error {}", response.status()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::tool("wikipedia", format!("Failed to parse response: {}", e)))?;

        Ok(ToolOutput::success(
            summarize(&body).unwrap_or_else(|| NO_RESULT.to_string()),
        ))
    }
}

/// Render the top page of a query response as `Page: ...\nSummary: ...`.
fn summarize(body: &Value) -> Option<String> {
    let pages = body.get("query")?.get("pages")?.as_object()?;

    let page = pages
        .values()
        .min_by_key(|p| p.get("index").and_then(Value::as_u64).unwrap_or(u64::MAX))?;

    let title = page.get("title")?.as_str()?;
    let extract = page.get("extract").and_then(Value::as_str).unwrap_or_default();

    let text = format!("Page: {}\nSummary: {}", title, extract.trim());
    Some(truncate_chars(&text, MAX_CHARS))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_summarize_picks_top_hit() {
        let body = json!({
            "query": {"pages": {
                "2": {"title": "Rust (fungus)", "index": 2, "extract": "A plant disease."},
                "1": {"title": "Rust (programming language)", "index": 1,
                      "extract": "Rust is a general-purpose programming language.\n"}
            }}
        });

        let summary = summarize(&body).unwrap();
        assert_eq!(
            summary,
            "Page: Rust (programming language)\nSummary: Rust is a general-purpose programming language."
        );
    }

    #[test]
    fn test_summarize_no_results() {
        assert!(summarize(&json!({"batchcomplete": ""})).is_none());
    }

    #[test]
    fn test_summary_truncated() {
        let long = "é".repeat(3 * MAX_CHARS);
        let body = json!({"query": {"pages": {"1": {"title": "Long", "index": 1, "extract": long}}}});
        let summary = summarize(&body).unwrap();
        assert_eq!(summary.chars().count(), MAX_CHARS);
    }

    #[tokio::test]
    async fn test_execute_against_endpoint() {
        let endpoint = crate::fixture::serve(|params| {
            assert_eq!(params.get("generator").map(String::as_str), Some("search"));
            let title = params["gsrsearch"].clone();
            let body = json!({"query": {"pages": {
                "7": {"title": title, "index": 1, "extract": "Found by search."}
            }}});
            (StatusCode::OK, body)
        })
        .await;

        let tool = WikipediaTool::new().with_endpoint(endpoint);
        let output = tool.execute(json!({"query": "Ferris"})).await.unwrap();
        assert_eq!(output.content, "Page: Ferris\nSummary: Found by search.");
    }

    #[tokio::test]
    async fn test_execute_without_hits() {
        let endpoint =
            crate::fixture::serve(|_| (StatusCode::OK, json!({"batchcomplete": ""}))).await;
        let output = WikipediaTool::new()
            .with_endpoint(endpoint)
            .execute(json!({"query": "qwzx"}))
            .await
            .unwrap();
        assert_eq!(output.content, NO_RESULT);
    }

    #[test]
    fn test_truncate_chars_short_input() {
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
