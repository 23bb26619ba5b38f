use std::fmt;

#[derive(Debug)]
pub enum BrowserError {
    UnknownTool { name: String },
    InvalidArguments(String),
    Startup(String),
    InvalidUrl { url: String, reason: String },
    Automation(fantoccini::error::CmdError),
    ElementTimeout { selector: String },
    Script(String),
    Generic(anyhow::Error),
}

impl BrowserError {
    /// Short machine-friendly label, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool { .. } => "unknown_tool",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::Startup(_) => "startup",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::Automation(_) => "automation",
            Self::ElementTimeout { .. } => "element_timeout",
            Self::Script(_) => "script",
            Self::Generic(_) => "generic",
        }
    }

    /// Wraps a WebDriver error raised while waiting for `selector`.
    pub fn from_element_wait(err: fantoccini::error::CmdError, selector: &str) -> Self {
        match err {
            fantoccini::error::CmdError::WaitTimeout => Self::ElementTimeout {
                selector: selector.to_string(),
            },
            other => Self::Automation(other),
        }
    }
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool { name } => write!(f, "Unknown tool: {name}"),
            Self::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            Self::Startup(msg) => write!(f, "Failed to start browser session: {msg}"),
            Self::InvalidUrl { url, reason } => {
                write!(f, "Failed to navigate to '{url}': {reason}")
            }
            Self::Automation(e) => write!(f, "Browser automation error: {e}"),
            Self::ElementTimeout { selector } => {
                write!(f, "Timeout waiting for element: {selector}")
            }
            Self::Script(msg) => write!(f, "Script error: {msg}"),
            Self::Generic(e) => write!(f, "Generic error: {e}"),
        }
    }
}

impl std::error::Error for BrowserError {}

impl From<fantoccini::error::CmdError> for BrowserError {
    fn from(err: fantoccini::error::CmdError) -> Self {
        Self::Automation(err)
    }
}

impl From<anyhow::Error> for BrowserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Generic(err)
    }
}

impl From<fantoccini::error::NewSessionError> for BrowserError {
    fn from(err: fantoccini::error::NewSessionError) -> Self {
        Self::Startup(format!("WebDriver session creation error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, BrowserError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_wait_timeout_names_selector() {
        let err = BrowserError::from_element_wait(
            fantoccini::error::CmdError::WaitTimeout,
            "#missing",
        );
        assert_eq!(err.kind(), "element_timeout");
        assert_eq!(err.to_string(), "Timeout waiting for element: #missing");
    }

    #[test]
    fn invalid_url_has_its_own_kind() {
        let err = BrowserError::InvalidUrl {
            url: "not a url".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert_eq!(err.kind(), "invalid_url");
        assert_eq!(
            err.to_string(),
            "Failed to navigate to 'not a url': relative URL without a base"
        );
    }

    #[test]
    fn unknown_tool_message() {
        let err = BrowserError::UnknownTool {
            name: "teleport".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown tool: teleport");
    }
}
