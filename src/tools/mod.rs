mod arguments;

pub use arguments::*;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use serde_json::{Map, Value};

use crate::{
    browser::BrowserPage,
    config::Config,
    error::{BrowserError, Result},
    handlers::{
        elements::{ClickTool, FillTool},
        navigation::NavigateTool,
        page::{EvaluateTool, GetContentTool, ScreenshotTool},
    },
    screenshots::ScreenshotStore,
};

/// Everything a handler may touch while it runs
pub struct ToolContext<'a> {
    pub page: &'a dyn BrowserPage,
    pub config: &'a Config,
    pub screenshots: &'a ScreenshotStore,
}

/// One invokable operation: its descriptor plus the logic behind it.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> Tool;

    /// Run against the session page. `args` has already been checked
    /// against the descriptor's schema and has defaults filled in.
    async fn call(&self, ctx: &ToolContext<'_>, args: &Map<String, Value>) -> Result<Vec<Content>>;
}

pub struct CatalogEntry {
    pub definition: Tool,
    pub handler: Arc<dyn ToolHandler>,
}

/// Ordered registry of tools. Descriptors are captured once at registration
/// and never change afterwards.
#[derive(Default)]
pub struct ToolCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        let defaults: [Arc<dyn ToolHandler>; 6] = [
            Arc::new(NavigateTool),
            Arc::new(ScreenshotTool),
            Arc::new(ClickTool),
            Arc::new(FillTool),
            Arc::new(EvaluateTool),
            Arc::new(GetContentTool),
        ];
        for handler in defaults {
            if let Err(e) = catalog.register(handler) {
                tracing::error!("Skipping built-in tool: {}", e);
            }
        }
        catalog
    }

    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let definition = handler.definition();
        let name = definition.name.to_string();
        if self.index.contains_key(&name) {
            return Err(BrowserError::Generic(anyhow::anyhow!(
                "Tool '{name}' is already registered"
            )));
        }

        self.index.insert(name, self.entries.len());
        self.entries.push(CatalogEntry {
            definition,
            handler,
        });
        Ok(())
    }

    pub fn list(&self) -> Vec<Tool> {
        self.entries
            .iter()
            .map(|entry| entry.definition.clone())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.definition.name.to_string())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Turn a `json!` literal into a tool input schema.
pub fn input_schema(schema: Value) -> Arc<JsonObject> {
    match schema {
        Value::Object(map) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

pub fn error_response(message: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message)])
}
