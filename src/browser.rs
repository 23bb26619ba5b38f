//! Browser layer
//!
//! `BrowserLauncher` starts one browser and hands back its single page;
//! `BrowserPage` is the set of primitives the tool handlers drive. The
//! WebDriver implementation below talks to chromedriver/geckodriver through
//! fantoccini.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator, wd::TimeoutConfiguration};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    driver::{DriverManager, DriverType},
    error::{BrowserError, Result},
};

/// Largest window edge used when stretching the window for full-page captures
const MAX_CAPTURE_DIMENSION: u64 = 10_000;

/// How long the resource count must stay flat before the network counts as idle
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);

const NETWORK_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdleState {
    Idle,
    Waiting,
    TimedOut,
}

/// Decides network idleness from periodic `(readyState, resource count)`
/// samples. Idle needs a complete document and a resource count that has
/// not moved for `NETWORK_QUIET_WINDOW`.
struct NetworkIdleTracker {
    started: Instant,
    timeout: Duration,
    last_count: Option<u64>,
    quiet_since: Instant,
}

impl NetworkIdleTracker {
    fn new(now: Instant, timeout: Duration) -> Self {
        Self {
            started: now,
            timeout,
            last_count: None,
            quiet_since: now,
        }
    }

    fn observe(
        &mut self,
        now: Instant,
        document_complete: bool,
        resource_count: Option<u64>,
    ) -> IdleState {
        if resource_count != self.last_count {
            self.last_count = resource_count;
            self.quiet_since = now;
        } else if document_complete
            && now.saturating_duration_since(self.quiet_since) >= NETWORK_QUIET_WINDOW
        {
            return IdleState::Idle;
        }

        if now.saturating_duration_since(self.started) >= self.timeout {
            IdleState::TimedOut
        } else {
            IdleState::Waiting
        }
    }
}

/// Window size that fits the whole document plus the browser chrome,
/// clamped to `1..=MAX_CAPTURE_DIMENSION` on both edges.
fn full_page_window_size(document: (u64, u64), chrome: (u64, u64)) -> (u32, u32) {
    let edge = |doc: u64, extra: u64| {
        doc.saturating_add(extra).clamp(1, MAX_CAPTURE_DIMENSION) as u32
    };
    (edge(document.0, chrome.0), edge(document.1, chrome.1))
}

/// One console message captured in the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub url: String,
}

#[async_trait]
pub trait BrowserPage: Send + Sync {
    async fn goto(&self, url: &str) -> Result<()>;

    /// Resolve once the document has loaded and no new resources have
    /// started for a short quiet window.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()>;

    /// PNG bytes of the viewport, or of the whole document when `full_page`.
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>>;

    async fn click(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn fill(&self, selector: &str, value: &str, timeout: Duration) -> Result<()>;

    async fn evaluate(&self, script: &str) -> Result<Value>;

    async fn content(&self) -> Result<String>;

    async fn current_url(&self) -> Result<String>;

    async fn console_logs(&self) -> Result<Vec<ConsoleEntry>>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start a browser and open its page. On error nothing is left running.
    async fn launch(&self) -> Result<Box<dyn BrowserPage>>;

    /// Tear down anything the launcher started outside the page itself.
    async fn shutdown(&self);
}

/// JavaScript that mirrors console output into `window.__mcpConsoleLogs`
const CONSOLE_MONITOR_SCRIPT: &str = r#"
    try {
        if (!window.__mcpConsoleLogs) {
            window.__mcpConsoleLogs = [];
            ['log', 'error', 'warn', 'info', 'debug'].forEach(level => {
                const original = console[level];
                console[level] = function(...args) {
                    original.apply(console, args);
                    window.__mcpConsoleLogs.push({
                        level: level,
                        message: args.map(arg => {
                            if (typeof arg === 'object') {
                                try { return JSON.stringify(arg); } catch (e) { return String(arg); }
                            }
                            return String(arg);
                        }).join(' '),
                        timestamp: Date.now(),
                        url: window.location.href
                    });
                };
            });
            window.addEventListener('error', function(event) {
                window.__mcpConsoleLogs.push({
                    level: 'error',
                    message: event.message + ' at ' + event.filename + ':' + event.lineno,
                    timestamp: Date.now(),
                    url: window.location.href
                });
            });
        }
        return true;
    } catch (e) {
        return false;
    }
"#;

const CONSOLE_RETRIEVE_SCRIPT: &str = "return window.__mcpConsoleLogs || [];";

const NETWORK_PROBE_SCRIPT: &str =
    "return [document.readyState, performance.getEntriesByType('resource').length];";

const DOCUMENT_SIZE_SCRIPT: &str = r#"
    const doc = document.documentElement;
    const body = document.body || doc;
    return [
        Math.max(doc.scrollWidth, body.scrollWidth, window.innerWidth),
        Math.max(doc.scrollHeight, body.scrollHeight, window.innerHeight),
        Math.max(window.outerWidth - window.innerWidth, 0),
        Math.max(window.outerHeight - window.innerHeight, 0)
    ];
"#;

/// Indirect eval so both expressions and statement lists yield a value
const EVALUATE_WRAPPER: &str = "return (0, eval)(arguments[0]);";

pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn install_console_monitor(&self) {
        if let Err(e) = self.client.execute(CONSOLE_MONITOR_SCRIPT, vec![]).await {
            warn!("Failed to set up console monitoring: {}", e);
        }
    }

    async fn document_size(&self) -> Result<(u64, u64, u64, u64)> {
        let dims = self.client.execute(DOCUMENT_SIZE_SCRIPT, vec![]).await?;
        let dims: Vec<u64> = serde_json::from_value(dims)
            .map_err(|e| anyhow::anyhow!("Unexpected document size result: {e}"))?;
        match dims.as_slice() {
            [w, h, dw, dh] => Ok((*w, *h, *dw, *dh)),
            _ => Err(anyhow::anyhow!("Unexpected document size result: {dims:?}").into()),
        }
    }
}

#[async_trait]
impl BrowserPage for WebDriverPage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.client.goto(url).await?;
        self.install_console_monitor().await;
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        let mut tracker = NetworkIdleTracker::new(start, timeout);

        loop {
            let probe = self.client.execute(NETWORK_PROBE_SCRIPT, vec![]).await?;
            let complete = probe.get(0).and_then(Value::as_str) == Some("complete");
            let count = probe.get(1).and_then(Value::as_u64);

            match tracker.observe(Instant::now(), complete, count) {
                IdleState::Idle => {
                    debug!("Network idle after {:?}", start.elapsed());
                    return Ok(());
                }
                IdleState::TimedOut => {
                    return Err(anyhow::anyhow!(
                        "Timed out after {timeout:?} waiting for network idle"
                    )
                    .into());
                }
                IdleState::Waiting => tokio::time::sleep(NETWORK_POLL_INTERVAL).await,
            }
        }
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        if !full_page {
            return Ok(self.client.screenshot().await?);
        }

        let (orig_width, orig_height) = self.client.get_window_size().await?;
        let (doc_width, doc_height, chrome_width, chrome_height) = self.document_size().await?;

        let (width, height) =
            full_page_window_size((doc_width, doc_height), (chrome_width, chrome_height));
        self.client.set_window_size(width, height).await?;

        let shot = self.client.screenshot().await;

        if let Err(e) = self
            .client
            .set_window_size(orig_width as u32, orig_height as u32)
            .await
        {
            warn!("Failed to restore window size after full-page capture: {}", e);
        }

        Ok(shot?)
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<()> {
        let element = self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
            .map_err(|e| BrowserError::from_element_wait(e, selector))?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str, timeout: Duration) -> Result<()> {
        let element = self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
            .map_err(|e| BrowserError::from_element_wait(e, selector))?;
        element.clear().await?;
        element.send_keys(value).await?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        self.client
            .execute(EVALUATE_WRAPPER, vec![Value::String(script.to_string())])
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn content(&self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn console_logs(&self) -> Result<Vec<ConsoleEntry>> {
        let raw = self.client.execute(CONSOLE_RETRIEVE_SCRIPT, vec![]).await?;
        serde_json::from_value(raw)
            .map_err(|e| anyhow::anyhow!("Malformed console log entries: {e}").into())
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().close().await?;
        Ok(())
    }
}

/// Launches a headless browser through a WebDriver service
pub struct WebDriverLauncher {
    config: Config,
    driver_manager: DriverManager,
}

impl WebDriverLauncher {
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

        Ok(Self {
            config,
            driver_manager: DriverManager::new(),
        })
    }

    async fn driver_type(&self) -> DriverType {
        if let Some(preferred) = self
            .config
            .preferred_driver
            .as_deref()
            .and_then(DriverType::from_string)
        {
            return preferred;
        }

        if let Some(from_endpoint) = DriverType::from_endpoint(&self.config.webdriver_endpoint) {
            return from_endpoint;
        }

        self.driver_manager
            .detect_available_drivers()
            .await
            .first()
            .map(|(driver_type, _)| *driver_type)
            .unwrap_or(DriverType::Chrome)
    }

    async fn resolve_webdriver_endpoint(&self, driver_type: DriverType) -> Result<String> {
        if self.config.webdriver_endpoint == "auto" && self.config.auto_start_driver {
            info!(
                "Auto-starting {} WebDriver service...",
                driver_type.browser_name()
            );
            self.driver_manager.ensure_running(driver_type).await
        } else {
            Ok(self.config.webdriver_endpoint.clone())
        }
    }

    /// Capabilities for a fresh headless session. Chrome and Edge run
    /// incognito on the throwaway profile their driver creates per session;
    /// Firefox runs in private browsing.
    pub fn capabilities(&self, driver_type: DriverType) -> Map<String, Value> {
        let mut caps = Map::new();
        let window_size = format!(
            "--window-size={},{}",
            self.config.window_width, self.config.window_height
        );

        match driver_type {
            DriverType::Firefox => {
                caps.insert("browserName".to_string(), json!("firefox"));
                let mut args = vec![
                    format!("--width={}", self.config.window_width),
                    format!("--height={}", self.config.window_height),
                ];
                if self.config.headless {
                    args.push("-headless".to_string());
                }
                args.push("-private".to_string());
                caps.insert("moz:firefoxOptions".to_string(), json!({ "args": args }));
            }
            DriverType::Chrome | DriverType::Edge => {
                let (browser_name, options_key) = if driver_type == DriverType::Edge {
                    ("MicrosoftEdge", "ms:edgeOptions")
                } else {
                    ("chrome", "goog:chromeOptions")
                };
                caps.insert("browserName".to_string(), json!(browser_name));

                let mut args = vec![
                    "--no-sandbox".to_string(),
                    "--disable-dev-shm-usage".to_string(),
                    "--disable-extensions".to_string(),
                    "--incognito".to_string(),
                    window_size,
                ];
                if self.config.headless {
                    args.push("--headless=new".to_string());
                    args.push("--disable-gpu".to_string());
                }
                caps.insert(options_key.to_string(), json!({ "args": args }));
            }
        }

        caps
    }

    async fn connect(&self, endpoint: &str, driver_type: DriverType) -> Result<Client> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities(driver_type));

        match tokio::time::timeout(self.config.connect_timeout(), builder.connect(endpoint)).await {
            Ok(Ok(client)) => Ok(client),
            Ok(Err(e)) => Err(BrowserError::Startup(format!(
                "Failed to connect to WebDriver at '{endpoint}': {e}"
            ))),
            Err(_) => Err(BrowserError::Startup(format!(
                "Timed out after {:?} connecting to WebDriver at '{endpoint}'",
                self.config.connect_timeout()
            ))),
        }
    }

    async fn configure(&self, client: &Client) -> Result<()> {
        let timeouts = TimeoutConfiguration::new(
            Some(self.config.page_load_timeout()),
            Some(self.config.page_load_timeout()),
            None,
        );
        client.update_timeouts(timeouts).await?;
        client
            .set_window_size(self.config.window_width, self.config.window_height)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>> {
        let driver_type = self.driver_type().await;
        let endpoint = self.resolve_webdriver_endpoint(driver_type).await?;

        let client = match self.connect(&endpoint, driver_type).await {
            Ok(client) => client,
            Err(e) => {
                self.driver_manager.stop_all_drivers().await;
                return Err(e);
            }
        };

        if let Err(e) = self.configure(&client).await {
            warn!("Failed to configure new browser session: {}", e);
            if let Err(close_err) = client.close().await {
                debug!("Closing unconfigured session failed: {}", close_err);
            }
            self.driver_manager.stop_all_drivers().await;
            return Err(BrowserError::Startup(format!(
                "Browser session could not be configured: {e}"
            )));
        }

        info!(
            "{} session ready via {} (headless: {})",
            driver_type.browser_name(),
            endpoint,
            self.config.headless
        );
        Ok(Box::new(WebDriverPage::new(client)))
    }

    async fn shutdown(&self) {
        self.driver_manager.stop_all_drivers().await;
    }
}
