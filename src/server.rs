use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use rmcp::{ErrorData as McpError, ServerHandler, model::*};
use serde_json::json;

use crate::{
    browser::{BrowserLauncher, WebDriverLauncher},
    config::Config,
    dispatcher::Dispatcher,
    screenshots::{ScreenshotStore, StoredScreenshot},
    session::SessionManager,
    tools::ToolCatalog,
};

pub const CONSOLE_LOGS_URI: &str = "console://logs";

#[derive(Clone)]
pub struct BrowserServer {
    dispatcher: Arc<Dispatcher>,
}

impl BrowserServer {
    pub fn new() -> crate::error::Result<Self> {
        Self::with_config(Config::from_env())
    }

    pub fn with_config(config: Config) -> crate::error::Result<Self> {
        let launcher = WebDriverLauncher::new(config.clone())?;
        Ok(Self::with_launcher(config, Arc::new(launcher)))
    }

    /// Build a server around any browser launcher.
    pub fn with_launcher(config: Config, launcher: Arc<dyn BrowserLauncher>) -> Self {
        let dispatcher = Dispatcher::new(
            ToolCatalog::with_defaults(),
            Arc::new(SessionManager::new(launcher)),
            Arc::new(ScreenshotStore::new()),
            config,
        );
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        self.dispatcher.sessions()
    }

    /// Close the browser session and stop any WebDriver process we started.
    pub async fn cleanup(&self) {
        tracing::info!("Browser automation MCP server shutting down...");
        self.dispatcher.sessions().release().await;
        tracing::debug!("Cleanup completed");
    }

    fn screenshot_resource(shot: &StoredScreenshot) -> Resource {
        let mut raw = RawResource::new(shot.uri(), format!("Screenshot: {}", shot.name));
        raw.description = Some(format!(
            "{} capture, {} bytes",
            if shot.full_page { "Full page" } else { "Viewport" },
            shot.png.len()
        ));
        raw.mime_type = Some("image/png".to_string());
        raw.no_annotation()
    }

    fn console_resource() -> Resource {
        let mut raw = RawResource::new(CONSOLE_LOGS_URI, "Browser console logs");
        raw.description = Some("Console messages captured from the current page".to_string());
        raw.mime_type = Some("application/json".to_string());
        raw.no_annotation()
    }

    /// Resources currently exposed: the console log plus one per screenshot.
    pub fn resources(&self) -> Vec<Resource> {
        let mut resources = vec![Self::console_resource()];
        resources.extend(
            self.dispatcher
                .screenshots()
                .list()
                .iter()
                .map(Self::screenshot_resource),
        );
        resources
    }

    pub async fn read_resource_uri(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        if uri == CONSOLE_LOGS_URI {
            self.read_console_logs().await
        } else {
            self.read_screenshot(uri)
        }
    }

    async fn read_console_logs(&self) -> Result<ReadResourceResult, McpError> {
        let guard = self.dispatcher.sessions().lock().await;
        let logs = match guard.current() {
            Some(session) => session.page().console_logs().await.map_err(|e| {
                McpError::internal_error(format!("Failed to read console logs: {e}"), None)
            })?,
            None => Vec::new(),
        };
        drop(guard);

        let text = serde_json::to_string_pretty(&logs)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, CONSOLE_LOGS_URI)],
        })
    }

    fn read_screenshot(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        let shot = self
            .dispatcher
            .screenshots()
            .get_by_uri(uri)
            .ok_or_else(|| {
                McpError::resource_not_found(
                    format!("Resource not found: {uri}"),
                    Some(json!({ "uri": uri })),
                )
            })?;

        let blob: ResourceContents = serde_json::from_value(json!({
            "uri": uri,
            "mimeType": "image/png",
            "blob": general_purpose::STANDARD.encode(&shot.png),
        }))
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(ReadResourceResult {
            contents: vec![blob],
        })
    }
}

impl ServerHandler for BrowserServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Browser automation over a single headless browser session. \
                 Screenshots are available as screenshot://<name> resources and \
                 page console output as console://logs."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.dispatcher.handle_list(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self
            .dispatcher
            .handle_invoke(request.name.as_ref(), request.arguments)
            .await)
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: self.resources(),
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read_resource_uri(&request.uri).await
    }
}
