#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use browser_automation_mcp::{
    BrowserError, BrowserLauncher, BrowserPage, BrowserServer, Config, ConsoleEntry, Dispatcher,
    Result, ScreenshotStore, SessionManager, tools::ToolCatalog,
};
use rmcp::model::CallToolResult;
use serde_json::Value;

pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-bytes";
pub const FAKE_HTML: &str = "<html><head><title>Fake</title></head><body><p>hello</p></body></html>";

/// Observable state of one fake page
#[derive(Default)]
pub struct PageState {
    pub visited: Mutex<Vec<String>>,
    pub clicked: Mutex<Vec<String>>,
    pub filled: Mutex<Vec<(String, String)>>,
    pub screenshot_modes: Mutex<Vec<bool>>,
    pub closed: AtomicBool,
    pub dead: AtomicBool,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

pub struct FakePage {
    state: Arc<PageState>,
    selectors: Vec<String>,
    eval_result: Value,
    goto_delay: Duration,
}

impl FakePage {
    fn has(&self, selector: &str) -> bool {
        self.selectors.iter().any(|s| s == selector)
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.goto_delay).await;
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

        if url.contains("unreachable.invalid") {
            return Err(anyhow::anyhow!("net::ERR_NAME_NOT_RESOLVED at {url}").into());
        }
        self.state.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        self.state.screenshot_modes.lock().unwrap().push(full_page);
        Ok(FAKE_PNG.to_vec())
    }

    async fn click(&self, selector: &str, _timeout: Duration) -> Result<()> {
        if !self.has(selector) {
            return Err(BrowserError::ElementTimeout {
                selector: selector.to_string(),
            });
        }
        self.state.clicked.lock().unwrap().push(selector.to_string());
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str, _timeout: Duration) -> Result<()> {
        if !self.has(selector) {
            return Err(BrowserError::ElementTimeout {
                selector: selector.to_string(),
            });
        }
        self.state
            .filled
            .lock()
            .unwrap()
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        if script.contains("throw") {
            return Err(BrowserError::Script(format!("Uncaught Error in: {script}")));
        }
        Ok(self.eval_result.clone())
    }

    async fn content(&self) -> Result<String> {
        Ok(FAKE_HTML.to_string())
    }

    async fn current_url(&self) -> Result<String> {
        if self.state.dead.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("session deleted").into());
        }
        Ok(self
            .state
            .visited
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn console_logs(&self) -> Result<Vec<ConsoleEntry>> {
        Ok(vec![ConsoleEntry {
            level: "log".to_string(),
            message: "hello from the page".to_string(),
            timestamp: 0.0,
            url: "about:blank".to_string(),
        }])
    }

    async fn close(&self) -> Result<()> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher handing out `FakePage`s, with knobs for failure and slowness
pub struct FakeLauncher {
    pub launches: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub fail_startup: AtomicBool,
    pub pages: Mutex<Vec<Arc<PageState>>>,
    pub selectors: Vec<String>,
    pub eval_result: Value,
    pub goto_delay: Duration,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            launches: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
            fail_startup: AtomicBool::new(false),
            pages: Mutex::new(Vec::new()),
            selectors: vec!["#submit".to_string(), "input[name=q]".to_string()],
            eval_result: Value::Null,
            goto_delay: Duration::ZERO,
        }
    }

    pub fn with_eval_result(mut self, value: Value) -> Self {
        self.eval_result = value;
        self
    }

    pub fn with_goto_delay(mut self, delay: Duration) -> Self {
        self.goto_delay = delay;
        self
    }

    pub fn failing() -> Self {
        let launcher = Self::new();
        launcher.fail_startup.store(true, Ordering::SeqCst);
        launcher
    }

    pub fn last_page(&self) -> Arc<PageState> {
        self.pages
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no page launched yet")
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserPage>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_startup.load(Ordering::SeqCst) {
            return Err(BrowserError::Startup("chromedriver not found".to_string()));
        }

        let state = Arc::new(PageState::default());
        self.pages.lock().unwrap().push(state.clone());
        Ok(Box::new(FakePage {
            state,
            selectors: self.selectors.clone(),
            eval_result: self.eval_result.clone(),
            goto_delay: self.goto_delay,
        }))
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn dispatcher_with(launcher: Arc<FakeLauncher>) -> Dispatcher {
    Dispatcher::new(
        ToolCatalog::with_defaults(),
        Arc::new(SessionManager::new(launcher)),
        Arc::new(ScreenshotStore::new()),
        Config::default(),
    )
}

pub fn server_with(launcher: Arc<FakeLauncher>) -> BrowserServer {
    BrowserServer::with_launcher(Config::default(), launcher)
}

/// The wire form of a tool result, which is what a client would see.
pub fn wire(result: &CallToolResult) -> Value {
    serde_json::to_value(result).expect("tool results serialize")
}

pub fn is_error(result: &CallToolResult) -> bool {
    wire(result)["isError"] == Value::Bool(true)
}

pub fn content_types(result: &CallToolResult) -> Vec<String> {
    wire(result)["content"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["type"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn texts(result: &CallToolResult) -> Vec<String> {
    wire(result)["content"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["text"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
