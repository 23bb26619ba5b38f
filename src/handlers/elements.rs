//! Element interaction handlers
//!
//! Both tools wait for the selector to match, up to the configured element
//! timeout, before acting on the first matching element.

use async_trait::async_trait;
use rmcp::model::{Content, Tool};
use serde_json::{Map, Value, json};

use crate::{
    error::Result,
    tools::{ToolContext, ToolHandler, input_schema, required_str},
};

pub struct ClickTool;

#[async_trait]
impl ToolHandler for ClickTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "click",
            "Click an element on the page",
            input_schema(json!({
                "type": "object",
                "properties": {
                    "selector": {
                        "type": "string",
                        "description": "CSS selector of element to click"
                    }
                },
                "required": ["selector"]
            })),
        )
    }

    async fn call(&self, ctx: &ToolContext<'_>, args: &Map<String, Value>) -> Result<Vec<Content>> {
        let selector = required_str(args, "selector")?;
        ctx.page
            .click(selector, ctx.config.element_timeout())
            .await?;
        Ok(vec![Content::text(format!("Clicked: {selector}"))])
    }
}

pub struct FillTool;

#[async_trait]
impl ToolHandler for FillTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "fill",
            "Fill out an input field",
            input_schema(json!({
                "type": "object",
                "properties": {
                    "selector": {
                        "type": "string",
                        "description": "CSS selector for input field"
                    },
                    "value": {
                        "type": "string",
                        "description": "Value to fill"
                    }
                },
                "required": ["selector", "value"]
            })),
        )
    }

    async fn call(&self, ctx: &ToolContext<'_>, args: &Map<String, Value>) -> Result<Vec<Content>> {
        let selector = required_str(args, "selector")?;
        let value = required_str(args, "value")?;
        ctx.page
            .fill(selector, value, ctx.config.element_timeout())
            .await?;
        Ok(vec![Content::text(format!("Filled {selector} with: {value}"))])
    }
}
