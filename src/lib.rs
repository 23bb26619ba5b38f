mod browser;
mod config;
mod dispatcher;
mod driver;
mod error;
pub mod handlers;
mod screenshots;
mod server;
mod session;
pub mod tools;

pub use browser::{BrowserLauncher, BrowserPage, ConsoleEntry, WebDriverLauncher, WebDriverPage};
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use driver::{DriverManager, DriverType};
pub use error::{BrowserError, Result};
pub use screenshots::{ScreenshotStore, StoredScreenshot, screenshot_uri};
pub use server::{BrowserServer, CONSOLE_LOGS_URI};
pub use session::{Session, SessionGuard, SessionManager};
