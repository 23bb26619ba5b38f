use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tokio::{process::Child as TokioChild, time::sleep};
use tracing::{debug, info, warn};

use crate::error::{BrowserError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverType {
    Chrome,
    Firefox,
    Edge,
}

impl DriverType {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "chrome" | "chromium" => Some(DriverType::Chrome),
            "firefox" | "gecko" => Some(DriverType::Firefox),
            "edge" => Some(DriverType::Edge),
            _ => None,
        }
    }

    pub fn executable_name(&self) -> &'static str {
        match self {
            DriverType::Chrome => {
                if cfg!(windows) {
                    "chromedriver.exe"
                } else {
                    "chromedriver"
                }
            }
            DriverType::Firefox => {
                if cfg!(windows) {
                    "geckodriver.exe"
                } else {
                    "geckodriver"
                }
            }
            DriverType::Edge => {
                if cfg!(windows) {
                    "msedgedriver.exe"
                } else {
                    "msedgedriver"
                }
            }
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            DriverType::Chrome => 9515,
            DriverType::Firefox => 4444,
            DriverType::Edge => 9516,
        }
    }

    pub fn browser_name(&self) -> &'static str {
        match self {
            DriverType::Chrome => "Chrome",
            DriverType::Firefox => "Firefox",
            DriverType::Edge => "Edge",
        }
    }

    /// Driver implied by a WebDriver endpoint's port, if it is one of the defaults.
    pub fn from_endpoint(endpoint: &str) -> Option<Self> {
        let port = url::Url::parse(endpoint).ok()?.port()?;
        [DriverType::Chrome, DriverType::Firefox, DriverType::Edge]
            .into_iter()
            .find(|driver| driver.default_port() == port)
    }
}

struct ManagedProcess {
    driver_type: DriverType,
    process: TokioChild,
    port: u16,
    pid: u32,
}

/// Spawns and tracks the WebDriver services this server started itself.
pub struct DriverManager {
    running_processes: Mutex<Vec<ManagedProcess>>,
}

impl DriverManager {
    pub fn new() -> Self {
        Self {
            running_processes: Mutex::new(Vec::new()),
        }
    }

    /// Auto-detect available WebDriver executables on the system
    pub async fn detect_available_drivers(&self) -> Vec<(DriverType, PathBuf)> {
        let driver_types = [DriverType::Chrome, DriverType::Firefox, DriverType::Edge];
        let mut available = Vec::new();

        for driver_type in driver_types {
            if let Some(path) = self.find_driver_executable(&driver_type).await {
                debug!("Found {} at: {:?}", driver_type.browser_name(), path);
                available.push((driver_type, path));
            }
        }

        available
    }

    /// Make sure a driver of `driver_type` is serving on its default port,
    /// starting one if needed. Returns the endpoint URL.
    pub async fn ensure_running(&self, driver_type: DriverType) -> Result<String> {
        let port = driver_type.default_port();
        let endpoint = format!("http://localhost:{port}");

        if self.is_service_running(port).await {
            info!("{} already running on port {}", driver_type.browser_name(), port);
            return Ok(endpoint);
        }

        let driver_path = self.find_driver_executable(&driver_type).await.ok_or_else(|| {
            BrowserError::Startup(format!(
                "Could not find {} executable. Please install {} or set a custom WEBDRIVER_ENDPOINT.\n\n{}",
                driver_type.executable_name(),
                driver_type.browser_name(),
                crate::config::Config::setup_guidance()
            ))
        })?;

        info!(
            "Starting {} from {:?} on port {}",
            driver_type.browser_name(),
            driver_path,
            port
        );
        self.start_driver(&driver_type, &driver_path, port).await?;

        if let Err(e) = self
            .wait_for_service_ready(&endpoint, Duration::from_secs(10))
            .await
        {
            self.stop_all_drivers().await;
            return Err(e);
        }

        Ok(endpoint)
    }

    /// Find the executable path for a specific driver type
    async fn find_driver_executable(&self, driver_type: &DriverType) -> Option<PathBuf> {
        let exe_name = driver_type.executable_name();

        let which_cmd = if cfg!(windows) { "where" } else { "which" };
        if let Ok(output) = tokio::process::Command::new(which_cmd)
            .arg(exe_name)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
        {
            if output.status.success() {
                let output_str = String::from_utf8_lossy(&output.stdout);
                if let Some(first_path) = output_str.lines().map(str::trim).find(|l| !l.is_empty())
                {
                    return Some(PathBuf::from(first_path));
                }
            }
        }

        self.get_common_driver_paths(driver_type)
            .into_iter()
            .find(|path| path.exists())
    }

    fn get_common_driver_paths(&self, driver_type: &DriverType) -> Vec<PathBuf> {
        let exe_name = driver_type.executable_name();

        if cfg!(target_os = "macos") {
            vec![
                PathBuf::from("/usr/local/bin").join(exe_name),
                PathBuf::from("/opt/homebrew/bin").join(exe_name),
            ]
        } else if cfg!(windows) {
            vec![
                PathBuf::from(format!(
                    "C:\\Program Files\\{}\\{}",
                    driver_type.browser_name(),
                    exe_name
                )),
                PathBuf::from("C:\\WebDrivers").join(exe_name),
            ]
        } else {
            vec![
                PathBuf::from("/usr/bin").join(exe_name),
                PathBuf::from("/usr/local/bin").join(exe_name),
                PathBuf::from("/snap/bin").join(exe_name),
                PathBuf::from("/usr/lib/chromium-browser").join(exe_name),
            ]
        }
    }

    async fn is_service_running(&self, port: u16) -> bool {
        let endpoint = format!("http://localhost:{port}/status");

        match reqwest::Client::new()
            .get(&endpoint)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn start_driver(
        &self,
        driver_type: &DriverType,
        driver_path: &Path,
        port: u16,
    ) -> Result<()> {
        let mut command = tokio::process::Command::new(driver_path);

        match driver_type {
            DriverType::Chrome | DriverType::Edge => {
                command
                    .arg(format!("--port={port}"))
                    .arg("--allowed-ips=127.0.0.1");
            }
            DriverType::Firefox => {
                command
                    .arg("--port")
                    .arg(port.to_string())
                    .arg("--host")
                    .arg("127.0.0.1");
            }
        }

        // stdout is the MCP channel; the driver must never write to it
        let process = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BrowserError::Startup(format!(
                    "Failed to start {}: {}",
                    driver_type.executable_name(),
                    e
                ))
            })?;

        let pid = process.id().ok_or_else(|| {
            BrowserError::Startup(format!(
                "Failed to get PID for {}",
                driver_type.executable_name()
            ))
        })?;

        self.running_processes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ManagedProcess {
                driver_type: *driver_type,
                process,
                port,
                pid,
            });

        Ok(())
    }

    async fn wait_for_service_ready(&self, endpoint: &str, timeout: Duration) -> Result<()> {
        let status_endpoint = format!("{endpoint}/status");
        let client = reqwest::Client::new();
        let start = std::time::Instant::now();

        while start.elapsed() < timeout {
            match client
                .get(&status_endpoint)
                .timeout(Duration::from_secs(1))
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    info!("WebDriver service ready at: {}", endpoint);
                    return Ok(());
                }
                _ => {
                    debug!("Waiting for WebDriver service...");
                    sleep(Duration::from_millis(250)).await;
                }
            }
        }

        Err(BrowserError::Startup(format!(
            "WebDriver service did not become ready within {timeout:?}"
        )))
    }

    pub fn managed_process_count(&self) -> usize {
        self.running_processes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Stop all managed driver processes
    pub async fn stop_all_drivers(&self) {
        let processes: Vec<ManagedProcess> = self
            .running_processes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for mut managed_process in processes {
            info!(
                "Stopping {} driver (PID: {}) on port {}",
                managed_process.driver_type.browser_name(),
                managed_process.pid,
                managed_process.port
            );

            if let Err(e) = managed_process.process.kill().await {
                warn!(
                    "Failed to kill {} process: {}",
                    managed_process.driver_type.browser_name(),
                    e
                );
            }
        }
    }
}

impl Default for DriverManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_names_and_ports() {
        assert_eq!(DriverType::Firefox.executable_name().trim_end_matches(".exe"), "geckodriver");
        assert_eq!(DriverType::Firefox.default_port(), 4444);
        assert_eq!(DriverType::Chrome.default_port(), 9515);
        assert_eq!(DriverType::Chrome.browser_name(), "Chrome");
    }

    #[test]
    fn parses_driver_aliases() {
        assert_eq!(DriverType::from_string("Chromium"), Some(DriverType::Chrome));
        assert_eq!(DriverType::from_string("gecko"), Some(DriverType::Firefox));
        assert_eq!(DriverType::from_string("safari"), None);
    }

    #[test]
    fn infers_driver_from_endpoint_port() {
        assert_eq!(
            DriverType::from_endpoint("http://localhost:4444"),
            Some(DriverType::Firefox)
        );
        assert_eq!(
            DriverType::from_endpoint("http://127.0.0.1:9515/"),
            Some(DriverType::Chrome)
        );
        assert_eq!(DriverType::from_endpoint("http://localhost:1234"), None);
    }

    #[tokio::test]
    async fn detected_drivers_point_at_their_executables() {
        let manager = DriverManager::new();
        for (driver_type, path) in manager.detect_available_drivers().await {
            assert!(path.to_string_lossy().contains(driver_type.executable_name()));
        }
    }

    #[tokio::test]
    async fn stopping_with_nothing_running_is_noop() {
        let manager = DriverManager::new();
        manager.stop_all_drivers().await;
        assert_eq!(manager.managed_process_count(), 0);
    }
}
