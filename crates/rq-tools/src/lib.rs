//! rq-tools: Research tools for research-query
//!
//! This crate provides the capability set the research agent can call:
//! - Web: DuckDuckGo instant-answer search
//! - Wikipedia: encyclopedia lookup
//! - Notes: append timestamped text to a local file

pub mod notes;
pub mod web;
pub mod wikipedia;

use std::path::PathBuf;
use std::sync::Arc;

use rq_core::{Tool, ToolRegistry};

pub use notes::SaveToTxtTool;
pub use web::WebSearchTool;
pub use wikipedia::WikipediaTool;

const USER_AGENT: &str = concat!("rq/", env!("CARGO_PKG_VERSION"));

/// Create all research tools. `notes_dir` is where `save_to_txt` writes.
pub fn create_research_tools(notes_dir: impl Into<PathBuf>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(WebSearchTool::new()),
        Arc::new(WikipediaTool::new()),
        Arc::new(SaveToTxtTool::new(notes_dir)),
    ]
}

/// Registry holding every research tool.
pub fn research_registry(notes_dir: impl Into<PathBuf>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in create_research_tools(notes_dir) {
        registry.register(tool);
    }
    registry
}

/// Local HTTP stand-in for the search APIs.
#[cfg(test)]
pub(crate) mod fixture {
    use std::collections::HashMap;

    use axum::{extract::Query, http::StatusCode, routing::get, Router};
    use serde_json::Value;

    /// Serve `respond` at `/` on an ephemeral port and return the base URL.
    pub async fn serve<F>(respond: F) -> String
    where
        F: Fn(HashMap<String, String>) -> (StatusCode, Value) + Clone + Send + Sync + 'static,
    {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let (status, body) = respond(params);
                async move { (status, body.to_string()) }
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_registry() {
        let registry = research_registry(".");
        assert_eq!(registry.names(), vec!["save_to_txt", "web_search", "wikipedia"]);
        for def in registry.definitions() {
            assert!(def.parameters.properties.contains_key(if def.name == "save_to_txt" {
                "data"
            } else {
                "query"
            }));
        }
    }
}
