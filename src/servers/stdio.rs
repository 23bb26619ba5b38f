use anyhow::Result;
use rmcp::{ServiceExt, transport::stdio};
use browser_automation_mcp::BrowserServer;

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

pub async fn run_stdio_server(server: BrowserServer) -> Result<()> {
    tracing::info!("Browser automation MCP server listening on stdio (Ctrl+C to stop)");

    let service = server.clone().serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Failed to establish stdio transport: {}", e);
    })?;

    let outcome = tokio::select! {
        result = service.waiting() => match result {
            Ok(reason) => {
                tracing::info!("Client disconnected: {:?}", reason);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Service error: {}", e);
                Err(e.into())
            }
        },
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal, stopping server...");
            Ok(())
        }
    };

    // the browser must not outlive the server
    server.cleanup().await;
    tracing::info!("Browser automation MCP server stopped");
    outcome
}
