use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Navigation {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Timed out after {elapsed:?} while {operation}")]
    Timeout {
        operation: String,
        elapsed: Duration,
    },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Playwright error: {0}")]
    Driver(String),

    #[error("Browser session error: {0}")]
    Session(String),

    #[error("Screenshot data is not a PNG image: {0}")]
    InvalidImage(String),
}

impl DocshotError {
    pub fn config(message: impl Into<String>) -> Self {
        DocshotError::Config(message.into())
    }

    pub fn timeout(operation: impl Into<String>, elapsed: Duration) -> Self {
        DocshotError::Timeout {
            operation: operation.into(),
            elapsed,
        }
    }

    /// Fatal errors abort the run before or instead of capture work.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DocshotError::Config(_) | DocshotError::Launch(_) | DocshotError::Serialization(_)
        )
    }

    /// True when the helper process or its protocol is broken, as opposed to
    /// a page-level failure the page itself reported.
    pub fn is_session_failure(&self) -> bool {
        matches!(self, DocshotError::Session(_) | DocshotError::Io(_))
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            DocshotError::Io(e) => ErrorPayload::new(
                ErrorCategory::Io,
                e.to_string(),
                "Check file paths/permissions for the config file and output directory.",
            ),
            DocshotError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check the configuration document is valid JSON.",
            ),
            DocshotError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("playwright npm package is missing") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Install Playwright (e.g., `npm install playwright` and `npx playwright install chromium`).",
                    )
                } else if lower.contains("not found on path") || lower.contains("node command") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Install Node.js and ensure the node binary is on PATH, or pass --node.",
                    )
                } else if lower.contains("screenshots") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Declare a `screenshots` list of jobs, each with a `name` and `url`.",
                    )
                } else if lower.contains("config file not found") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Pass --config with the path to the screenshot configuration file.",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check the configuration values and CLI flags (e.g., --viewport WIDTHxHEIGHT).",
                    )
                }
            }
            DocshotError::Launch(msg) => {
                let remediation = if msg.to_ascii_lowercase().contains("executable") {
                    "Run `npx playwright install chromium` to download the browser."
                } else {
                    "Re-run with --verbose; check that Playwright can launch Chromium on this machine."
                };
                ErrorPayload::new(ErrorCategory::Browser, msg.to_string(), remediation)
            }
            DocshotError::Navigation { .. } => ErrorPayload::new(
                ErrorCategory::Capture,
                self.to_string(),
                "Check the job URL is reachable and the server returns a success status.",
            ),
            DocshotError::Timeout { .. } => ErrorPayload::new(
                ErrorCategory::Capture,
                self.to_string(),
                "Try increasing --nav-timeout/--network-idle-timeout or the timeouts in the config.",
            ),
            DocshotError::ElementNotFound(_) => ErrorPayload::new(
                ErrorCategory::Capture,
                self.to_string(),
                "Verify the job selector matches an element on the page.",
            ),
            DocshotError::Driver(msg) | DocshotError::Session(msg) => ErrorPayload::new(
                ErrorCategory::Browser,
                msg.to_string(),
                "Re-run with --verbose; file an issue if persistent.",
            ),
            DocshotError::InvalidImage(msg) => ErrorPayload::new(
                ErrorCategory::Capture,
                msg.to_string(),
                "Re-run the job; the browser returned unexpected screenshot data.",
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, DocshotError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Config,
    Io,
    Browser,
    Capture,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_payload_includes_playwright_remediation() {
        let err = DocshotError::config(
            "Playwright npm package is missing; install with `npm install playwright`.",
        );
        let payload = err.to_payload();
        assert_eq!(payload.category, ErrorCategory::Config);
        let remediation = payload.remediation.unwrap_or_default();
        assert!(
            remediation.contains("npm install playwright"),
            "expected remediation to mention npm install playwright, got: {remediation}"
        );
    }

    #[test]
    fn config_payload_includes_node_hint() {
        let err = DocshotError::config(
            "Unable to spawn Playwright helper; 'node' was not found on PATH",
        );
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(
            remediation.contains("--node"),
            "expected node remediation, got: {remediation}"
        );
    }

    #[test]
    fn config_payload_uses_default_remediation_for_other_messages() {
        let err = DocshotError::config("retries must be at least 1");
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(remediation.contains("Check the configuration values"));
    }

    #[test]
    fn navigation_display_includes_status_when_present() {
        let err = DocshotError::Navigation {
            url: "https://example.com".to_string(),
            status: Some(404),
            message: "non-success response".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Navigation to https://example.com failed (status 404): non-success response"
        );

        let err = DocshotError::Navigation {
            url: "https://example.com".to_string(),
            status: None,
            message: "net::ERR_CONNECTION_REFUSED".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Navigation to https://example.com failed: net::ERR_CONNECTION_REFUSED"
        );
    }

    #[test]
    fn tiers_are_classified() {
        assert!(DocshotError::config("bad").is_fatal());
        assert!(DocshotError::Launch("no chromium".into()).is_fatal());
        assert!(!DocshotError::ElementNotFound("#hero".into()).is_fatal());
        assert!(!DocshotError::timeout("waiting", Duration::from_secs(1)).is_fatal());

        assert!(DocshotError::Session("helper exited".into()).is_session_failure());
        assert!(!DocshotError::Driver("strict mode violation".into()).is_session_failure());
    }
}
