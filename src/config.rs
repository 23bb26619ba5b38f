use std::{env, time::Duration};

#[derive(Clone, Debug)]
pub struct Config {
    pub webdriver_endpoint: String,
    /// Upper bound on creating a WebDriver session (browser startup included)
    pub connect_timeout_ms: u64,
    pub auto_start_driver: bool,
    pub preferred_driver: Option<String>,
    pub headless: bool,
    /// How long click/fill wait for a selector to match before giving up
    pub element_timeout_ms: u64,
    pub page_load_timeout_ms: u64,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webdriver_endpoint: "auto".to_string(),
            connect_timeout_ms: 30_000,
            auto_start_driver: true,
            preferred_driver: None,
            headless: true,
            element_timeout_ms: 30_000,
            page_load_timeout_ms: 30_000,
            window_width: 1280,
            window_height: 800,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(default)
}

fn env_number<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            webdriver_endpoint: env::var("WEBDRIVER_ENDPOINT")
                .unwrap_or(defaults.webdriver_endpoint),
            connect_timeout_ms: env_number("WEBDRIVER_TIMEOUT_MS", defaults.connect_timeout_ms),
            auto_start_driver: env_flag("WEBDRIVER_AUTO_START", defaults.auto_start_driver),
            preferred_driver: env::var("WEBDRIVER_PREFERRED_DRIVER").ok(),
            headless: env_flag("WEBDRIVER_HEADLESS", defaults.headless),
            element_timeout_ms: env_number(
                "BROWSER_ELEMENT_TIMEOUT_MS",
                defaults.element_timeout_ms,
            ),
            page_load_timeout_ms: env_number(
                "BROWSER_PAGE_LOAD_TIMEOUT_MS",
                defaults.page_load_timeout_ms,
            ),
            window_width: env_number("BROWSER_WINDOW_WIDTH", defaults.window_width),
            window_height: env_number("BROWSER_WINDOW_HEIGHT", defaults.window_height),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.webdriver_endpoint != "auto"
            && !self.webdriver_endpoint.starts_with("http://")
            && !self.webdriver_endpoint.starts_with("https://")
        {
            return Err(format!(
                "Invalid WebDriver endpoint '{}'. Must be 'auto' or start with http:// or https://",
                self.webdriver_endpoint
            ));
        }

        if self.webdriver_endpoint == "auto" && !self.auto_start_driver {
            return Err(
                "WEBDRIVER_ENDPOINT=auto requires WEBDRIVER_AUTO_START to be enabled".to_string(),
            );
        }

        if self.connect_timeout_ms == 0 {
            return Err("WebDriver timeout must be greater than 0".to_string());
        }

        if self.element_timeout_ms == 0 || self.page_load_timeout_ms == 0 {
            return Err("Element and page load timeouts must be greater than 0".to_string());
        }

        if self.window_width == 0 || self.window_height == 0 {
            return Err("Window dimensions must be positive".to_string());
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_millis(self.page_load_timeout_ms)
    }

    pub fn setup_guidance() -> &'static str {
        r#"
Browser Automation MCP Server Setup:

1. Install a WebDriver (choose one):
   - ChromeDriver: brew install chromedriver / sudo apt-get install chromium-chromedriver
   - GeckoDriver:  brew install geckodriver / sudo apt-get install firefox-geckodriver
   - EdgeDriver:   https://developer.microsoft.com/microsoft-edge/tools/webdriver/

2. Environment Variables (all optional):
   - WEBDRIVER_ENDPOINT: 'auto' (default) or specific URL
   - WEBDRIVER_AUTO_START: true (default) or false
   - WEBDRIVER_PREFERRED_DRIVER: chrome, firefox, or edge
   - WEBDRIVER_TIMEOUT_MS: Session startup timeout in ms (default: 30000)
   - WEBDRIVER_HEADLESS: true (default) or false for GUI mode
   - BROWSER_ELEMENT_TIMEOUT_MS: Wait for selectors in ms (default: 30000)
   - BROWSER_PAGE_LOAD_TIMEOUT_MS: Navigation timeout in ms (default: 30000)
   - BROWSER_WINDOW_WIDTH / BROWSER_WINDOW_HEIGHT: Viewport (default: 1280x800)

3. Manual Setup (if auto-start disabled):
   - Chrome: chromedriver --port=9515
   - Firefox: geckodriver --port=4444
   - Set WEBDRIVER_ENDPOINT to the appropriate URL
"#
    }
}
