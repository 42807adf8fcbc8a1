//! WebSearchAdapter - server-side web search tool.
//!
//! Deterministic stand-in for a real search provider (SerpAPI, Brave,
//! etc.); it honors the web_search output contract so downstream bindings
//! like `$.search0.output.data.total_results` work against it unchanged.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::application::ToolAdapter;
use crate::domain::task::{JsonMap, TaskError};

const DEFAULT_MAX_RESULTS: u64 = 10;

pub struct WebSearchAdapter;

#[async_trait]
impl ToolAdapter for WebSearchAdapter {
    fn name(&self) -> &str {
        "web_search"
    }

    async fn run(&self, inputs: &JsonMap) -> Result<JsonMap, TaskError> {
        let query = inputs
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TaskError::execution("web_search requires a 'query' input"))?;
        let max_results = inputs
            .get("max_results")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_RESULTS) as usize;

        debug!(query, "running web search");
        let started = Instant::now();

        let results = vec![
            json!({
                "title": format!("Search result for '{}' - 1", query),
                "url": format!("https://example.com/search?q={}", query),
                "snippet": format!("This is a search result about {}", query),
                "relevance_score": 0.95
            }),
            json!({
                "title": format!("Search result for '{}' - 2", query),
                "url": "https://example.com/result2",
                "snippet": format!("More information about {}", query),
                "relevance_score": 0.87
            }),
        ];
        let results: Vec<_> = results.into_iter().take(max_results).collect();

        let mut data = JsonMap::new();
        data.insert("query".into(), json!(query));
        data.insert("total_results".into(), json!(results.len()));
        data.insert(
            "formatted_results".into(),
            json!(format_results(query, &results)),
        );
        data.insert("results".into(), json!(results));
        data.insert(
            "search_time_ms".into(),
            json!(started.elapsed().as_secs_f64() * 1000.0),
        );

        Ok(data)
    }
}

fn format_results(query: &str, results: &[serde_json::Value]) -> String {
    let mut lines = vec![format!("Search results for: '{}'", query), String::new()];
    for (i, result) in results.iter().enumerate() {
        let title = result["title"].as_str().unwrap_or_default();
        let url = result["url"].as_str().unwrap_or_default();
        let snippet = result["snippet"].as_str().unwrap_or_default();
        lines.push(format!("{}. {}", i + 1, title));
        lines.push(format!("   {}", url));
        lines.push(format!("   {}", snippet));
        lines.push(String::new());
    }
    lines.push(format!("Total results: {}", results.len()));
    lines.join("\n")
}
