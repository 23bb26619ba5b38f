use anyhow::Result;
use clap::{Parser, ValueEnum};
use browser_automation_mcp::{BrowserServer, Config};

mod servers;
use servers::run_stdio_server;

#[derive(Parser)]
#[command(name = "browser-automation-mcp")]
#[command(about = "Browser automation MCP server backed by a single headless browser session")]
#[command(version)]
struct Cli {
    /// Browser driver to use (defaults to WEBDRIVER_PREFERRED_DRIVER, then auto-detection)
    #[arg(short, long)]
    browser: Option<BrowserType>,

    /// Existing WebDriver endpoint instead of auto-starting one
    #[arg(long)]
    webdriver_endpoint: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,
}

#[derive(Clone, ValueEnum)]
enum BrowserType {
    /// Google Chrome browser
    Chrome,
    /// Mozilla Firefox browser
    Firefox,
    /// Microsoft Edge browser
    Edge,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let mut config = Config::from_env();
    if let Some(browser) = cli.browser {
        config.preferred_driver = Some(
            match browser {
                BrowserType::Chrome => "chrome",
                BrowserType::Firefox => "firefox",
                BrowserType::Edge => "edge",
            }
            .to_string(),
        );
    }
    if let Some(endpoint) = cli.webdriver_endpoint {
        config.webdriver_endpoint = endpoint;
    }
    if cli.headed {
        config.headless = false;
    }

    let server = BrowserServer::with_config(config).inspect_err(|e| {
        tracing::error!("Failed to create browser automation server: {}", e);
    })?;

    run_stdio_server(server).await
}
