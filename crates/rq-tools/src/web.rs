//! Web search tool backed by the DuckDuckGo instant-answer API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use rq_core::{Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

const DEFAULT_ENDPOINT: &str = "https://api.duckduckgo.com/";
const MAX_RESULTS: usize = 5;

pub struct WebSearchTool {
    client: Client,
    endpoint: String,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSearchTool {
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

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Deserialize)]
struct WebSearchArgs {
    query: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Returns short text snippets about the query."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new().add_property("query", PropertySchema::string("The search query"), true),
        )
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error> {
        let args: WebSearchArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool("web_search", format!("Invalid arguments: {}", e)))?;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", args.query.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| Error::tool("web_search", format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::tool(
                "web_search",
                format!("Search API error {}", response.status()),
            ));
        }

        // DuckDuckGo answers with content-type application/x-javascript.
        let body = response
            .text()
            .await
            .map_err(|e| Error::tool("web_search", format!("Failed to read response: {}", e)))?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| Error::tool("web_search", format!("Failed to parse search response: {}", e)))?;

        let snippets = collect_snippets(&json, MAX_RESULTS);
        if snippets.is_empty() {
            Ok(ToolOutput::success(format!("No results found for '{}'", args.query)))
        } else {
            Ok(ToolOutput::success(snippets.join("\n\n")))
        }
    }
}

/// Abstract first, then related topics (flattening topic groups).
fn collect_snippets(body: &Value, max: usize) -> Vec<String> {
    let mut snippets = Vec::new();

    if let Some(text) = body.get("AbstractText").and_then(Value::as_str) {
        if !text.is_empty() {
            let source = body
                .get("AbstractSource")
                .and_then(Value::as_str)
                .unwrap_or("Unknown");
            snippets.push(format!("{} (source: {})", text, source));
        }
    }

    let mut topics: Vec<&Value> = Vec::new();
    if let Some(related) = body.get("RelatedTopics").and_then(Value::as_array) {
        for entry in related {
            match entry.get("Topics").and_then(Value::as_array) {
                Some(group) => topics.extend(group),
                None => topics.push(entry),
            }
        }
    }

    for topic in topics {
        if snippets.len() >= max {
            break;
        }
        if let Some(text) = topic.get("Text").and_then(Value::as_str) {
            if !text.is_empty() {
                snippets.push(text.to_string());
            }
        }
    }

    snippets
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_collect_snippets() {
        let body = json!({
            "AbstractText": "Rust is a general-purpose programming language.",
            "AbstractSource": "Wikipedia",
            "RelatedTopics": [
                {"Text": "Cargo - the Rust package manager"},
                {"Name": "Tools", "Topics": [
                    {"Text": "rustc - the compiler"},
                    {"Text": ""}
                ]}
            ]
        });

        let snippets = collect_snippets(&body, 5);
        assert_eq!(snippets.len(), 3);
        assert!(snippets[0].ends_with("(source: Wikipedia)"));
        assert_eq!(snippets[2], "rustc - the compiler");
    }

    #[test]
    fn test_collect_snippets_limit() {
        let topics: Vec<Value> = (0..10).map(|i| json!({"Text": format!("topic {}", i)})).collect();
        let body = json!({"AbstractText": "", "RelatedTopics": topics});
        assert_eq!(collect_snippets(&body, 5).len(), 5);
    }

    #[test]
    fn test_collect_snippets_empty() {
        assert!(collect_snippets(&json!({}), 5).is_empty());
    }

    #[tokio::test]
    async fn test_execute_against_endpoint() {
        let endpoint = crate::fixture::serve(|params| {
            assert_eq!(params.get("format").map(String::as_str), Some("json"));
            let body = json!({
                "AbstractText": format!("About {}", params["q"]),
                "AbstractSource": "Fixture",
                "RelatedTopics": []
            });
            (StatusCode::OK, body)
        })
        .await;

        let tool = WebSearchTool::new().with_endpoint(endpoint);
        let output = tool.execute(json!({"query": "rust lang"})).await.unwrap();
        assert_eq!(output.content, "About rust lang (source: Fixture)");
    }

    #[tokio::test]
    async fn test_execute_empty_and_failing_endpoint() {
        let empty = crate::fixture::serve(|_| (StatusCode::OK, json!({"RelatedTopics": []}))).await;
        let output = WebSearchTool::new()
            .with_endpoint(empty)
            .execute(json!({"query": "zzzz"}))
            .await
            .unwrap();
        assert_eq!(output.content, "No results found for 'zzzz'");

        let failing =
            crate::fixture::serve(|_| (StatusCode::SERVICE_UNAVAILABLE, json!({}))).await;
        let err = WebSearchTool::new()
            .with_endpoint(failing)
            .execute(json!({"query": "rust"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let tool = WebSearchTool::new();
        let err = tool.execute(json!({"q": "missing field"})).await.unwrap_err();
        assert!(err.to_string().contains("Invalid arguments"));
    }
}
