use std::{sync::Arc, time::Instant};

use rmcp::model::{CallToolResult, Content, Tool};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
    config::Config,
    error::{BrowserError, Result},
    screenshots::ScreenshotStore,
    session::SessionManager,
    tools::{ToolCatalog, ToolContext, error_response, validate_arguments},
};

/// Routes tool invocations to their handlers against the shared session.
///
/// Invocations are serialized: the session lock is held from acquisition
/// until the handler returns, so a second call waits for the first.
pub struct Dispatcher {
    catalog: ToolCatalog,
    sessions: Arc<SessionManager>,
    screenshots: Arc<ScreenshotStore>,
    config: Config,
}

impl Dispatcher {
    pub fn new(
        catalog: ToolCatalog,
        sessions: Arc<SessionManager>,
        screenshots: Arc<ScreenshotStore>,
        config: Config,
    ) -> Self {
        Self {
            catalog,
            sessions,
            screenshots,
            config,
        }
    }

    pub fn handle_list(&self) -> Vec<Tool> {
        self.catalog.list()
    }

    /// Run one tool. Failures of any kind come back as an error-flagged
    /// result carrying the error message.
    pub async fn handle_invoke(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> CallToolResult {
        let start = Instant::now();

        match self.invoke(name, arguments).await {
            Ok(content) => {
                info!(tool = name, elapsed_ms = start.elapsed().as_millis() as u64, "tool succeeded");
                CallToolResult::success(content)
            }
            Err(e) => {
                warn!(
                    tool = name,
                    kind = e.kind(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "tool failed: {}",
                    e
                );
                error_response(e.to_string())
            }
        }
    }

    async fn invoke(&self, name: &str, arguments: Option<Map<String, Value>>) -> Result<Vec<Content>> {
        let entry = self.catalog.get(name).ok_or_else(|| BrowserError::UnknownTool {
            name: name.to_string(),
        })?;

        let args = validate_arguments(&entry.definition.input_schema, arguments)?;

        let mut guard = self.sessions.lock().await;
        let session = guard.acquire().await?;

        let ctx = ToolContext {
            page: session.page(),
            config: &self.config,
            screenshots: &self.screenshots,
        };
        entry.handler.call(&ctx, &args).await
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn screenshots(&self) -> &Arc<ScreenshotStore> {
        &self.screenshots
    }
}
