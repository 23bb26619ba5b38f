//! Page content handlers
//!
//! Handles page-level operations:
//! - Taking (and storing) screenshots
//! - Executing JavaScript
//! - Reading the page markup

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use rmcp::model::{Content, Tool};
use serde_json::{Map, Value, json};

use crate::{
    error::{BrowserError, Result},
    tools::{ToolContext, ToolHandler, bool_arg, input_schema, required_str},
};

const PNG_SIGNATURE: &[u8] = b"\x89PNG";

pub struct ScreenshotTool;

#[async_trait]
impl ToolHandler for ScreenshotTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "screenshot",
            "Take a screenshot of the current page. The image is also kept as the resource screenshot://<name>",
            input_schema(json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Name for the screenshot"
                    },
                    "fullPage": {
                        "type": "boolean",
                        "description": "Capture the whole scrollable page instead of the viewport",
                        "default": true
                    }
                },
                "required": ["name"]
            })),
        )
    }

    async fn call(&self, ctx: &ToolContext<'_>, args: &Map<String, Value>) -> Result<Vec<Content>> {
        let name = required_str(args, "name")?;
        let full_page = bool_arg(args, "fullPage", true);

        let png_data = ctx.page.screenshot(full_page).await?;

        if png_data.is_empty() {
            return Err(BrowserError::Generic(anyhow::anyhow!("Screenshot data is empty")));
        }
        if !png_data.starts_with(PNG_SIGNATURE) {
            return Err(BrowserError::Generic(anyhow::anyhow!(
                "Screenshot data is not valid PNG format"
            )));
        }

        let base64_data = general_purpose::STANDARD.encode(&png_data);
        let size = png_data.len();
        ctx.screenshots.insert(name, png_data, full_page);

        Ok(vec![
            Content::image(base64_data, "image/png"),
            Content::text(format!(
                "Screenshot '{name}' taken ({size} bytes, {})",
                if full_page { "full page" } else { "viewport" }
            )),
        ])
    }
}

pub struct EvaluateTool;

#[async_trait]
impl ToolHandler for EvaluateTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "evaluate",
            "Execute JavaScript in the page context and return the result as JSON",
            input_schema(json!({
                "type": "object",
                "properties": {
                    "script": {
                        "type": "string",
                        "description": "JavaScript expression or statements to evaluate; the last value is returned"
                    }
                },
                "required": ["script"]
            })),
        )
    }

    async fn call(&self, ctx: &ToolContext<'_>, args: &Map<String, Value>) -> Result<Vec<Content>> {
        let script = required_str(args, "script")?;
        let result = ctx.page.evaluate(script).await?;
        let serialized = serde_json::to_string_pretty(&result)
            .map_err(|e| BrowserError::Script(format!("Result is not serializable: {e}")))?;
        Ok(vec![Content::text(format!("Execution result:\n{serialized}"))])
    }
}

pub struct GetContentTool;

#[async_trait]
impl ToolHandler for GetContentTool {
    fn definition(&self) -> Tool {
        Tool::new(
            "get_content",
            "Get the full HTML markup of the current page",
            input_schema(json!({
                "type": "object",
                "properties": {}
            })),
        )
    }

    async fn call(&self, ctx: &ToolContext<'_>, _args: &Map<String, Value>) -> Result<Vec<Content>> {
        let html = ctx.page.content().await?;
        Ok(vec![Content::text(html)])
    }
}
