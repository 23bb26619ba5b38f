//! Navigation handler
//!
//! Loads a URL in the session page and waits until the page has finished
//! loading and its network activity has settled.

use async_trait::async_trait;
use rmcp::model::{Content, Tool};
use serde_json::{Map, Value, json};

use crate::{
    error::{BrowserError, Result},
    tools::{ToolContext, ToolHandler, input_schema, required_str},
};

pub struct NavigateTool;

#[async_trait]
impl ToolHandler for NavigateTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "navigate",
            "Navigate to a URL and wait until the page's network activity is idle",
            input_schema(json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Absolute URL to navigate to (e.g. https://example.com)"
                    }
                },
                "required": ["url"]
            })),
        )
    }

    async fn call(&self, ctx: &ToolContext<'_>, args: &Map<String, Value>) -> Result<Vec<Content>> {
        let url = required_str(args, "url")?;

        let parsed = url::Url::parse(url).map_err(|e| BrowserError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!("Navigating to {}", parsed);
        ctx.page.goto(parsed.as_str()).await?;
        ctx.page
            .wait_for_network_idle(ctx.config.page_load_timeout())
            .await?;

        Ok(vec![Content::text(format!("Navigated to {url}"))])
    }
}
