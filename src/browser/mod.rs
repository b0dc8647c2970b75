//! Browser automation for documentation screenshots.
//!
//! The orchestrator talks to the browser only through [`BrowserSession`], a
//! capability interface over one page: navigate, wait, act, capture. The
//! shipped backend drives Playwright through a long-lived Node.js helper.
//!
//! # Module Structure
//!
//! - [`manager`] - Helper process launch and the Playwright-backed session
//! - [`playwright`] - Driver script, error mapping and availability checks
//! - [`protocol`] - Line-delimited JSON messages exchanged with the driver
//!
//! # Example
//!
//! ```no_run
//! use docshot_lib::{BrowserOptions, BrowserSession, PlaywrightLauncher, SessionLauncher, SessionSetup};
//! use std::time::Duration;
//!
//! # async fn example() -> docshot_lib::Result<()> {
//! let launcher = PlaywrightLauncher::new(BrowserOptions::default());
//! let mut session = launcher.launch(&SessionSetup::default()).await?;
//! session.navigate("https://example.com", Duration::from_secs(30)).await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

mod manager;
mod playwright;
mod protocol;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{RunConfig, ScreenshotJob, Timeouts};
use crate::{Result, Viewport};

pub use manager::{
    BrowserOptions, PlaywrightLauncher, PlaywrightSession, DEFAULT_LAUNCH_TIMEOUT,
    DRIVER_GRACE_PERIOD,
};

/// Page-wide settings applied once when the session is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSetup {
    pub viewport: Viewport,
    pub device_scale_factor: f64,
    pub custom_css: Option<String>,
    pub headless: bool,
}

impl Default for SessionSetup {
    fn default() -> Self {
        SessionSetup::from(&RunConfig::default())
    }
}

impl From<&RunConfig> for SessionSetup {
    fn from(config: &RunConfig) -> Self {
        Self {
            viewport: config.viewport,
            device_scale_factor: config.device_scale_factor,
            custom_css: config.custom_css.clone(),
            headless: config.headless,
        }
    }
}

/// Result of a navigation that produced a response (or none, for
/// same-document navigations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationOutcome {
    pub status: Option<u16>,
    pub success: bool,
}

impl NavigationOutcome {
    /// Same rule as Playwright's `response.ok()`: 2xx only.
    pub fn from_status(status: u16) -> Self {
        Self {
            status: Some(status),
            success: (200..300).contains(&status),
        }
    }
}

/// What part of the page a screenshot covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
    Viewport,
    FullPage,
    Element(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotRequest {
    pub target: CaptureTarget,
    pub disable_animations: bool,
    /// Bound on locating the element (if any) and taking the capture.
    pub timeout: Duration,
}

impl ScreenshotRequest {
    pub fn for_job(job: &ScreenshotJob, timeouts: &Timeouts) -> Self {
        let target = match (&job.selector, job.full_page) {
            (Some(selector), _) => CaptureTarget::Element(selector.clone()),
            (None, true) => CaptureTarget::FullPage,
            (None, false) => CaptureTarget::Viewport,
        };
        Self {
            target,
            disable_animations: job.disable_animations,
            timeout: timeouts.selector,
        }
    }
}

/// Capabilities the capture orchestrator needs from one browser page.
///
/// Every operation is bounded by its timeout and either succeeds or returns
/// an error; implementations must not hang past the bound.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationOutcome>;

    async fn wait_for_network_idle(&mut self, timeout: Duration) -> Result<()>;

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    async fn click(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    async fn type_text(&mut self, selector: &str, text: &str, timeout: Duration) -> Result<()>;

    /// Captures the requested region and returns encoded PNG bytes.
    async fn screenshot(&mut self, request: &ScreenshotRequest) -> Result<Vec<u8>>;

    /// Releases the browser. Calling it more than once is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Opens the single session used for a run.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self, setup: &SessionSetup) -> Result<Self::Session>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(selector: Option<&str>, full_page: bool) -> ScreenshotJob {
        ScreenshotJob {
            name: "job".into(),
            url: "https://example.com".into(),
            wait_for_selector: None,
            wait_time: None,
            before_screenshot: Vec::new(),
            selector: selector.map(str::to_string),
            full_page,
            disable_animations: true,
        }
    }

    #[test]
    fn screenshot_target_prefers_element_selector() {
        let timeouts = Timeouts::default();
        let req = ScreenshotRequest::for_job(&job(Some("#hero"), true), &timeouts);
        assert_eq!(req.target, CaptureTarget::Element("#hero".into()));
        assert!(req.disable_animations);
        assert_eq!(req.timeout, timeouts.selector);

        let req = ScreenshotRequest::for_job(&job(None, true), &timeouts);
        assert_eq!(req.target, CaptureTarget::FullPage);

        let req = ScreenshotRequest::for_job(&job(None, false), &timeouts);
        assert_eq!(req.target, CaptureTarget::Viewport);
    }

    #[test]
    fn session_setup_follows_run_config() {
        let config = RunConfig {
            custom_css: Some("body { background: white; }".into()),
            device_scale_factor: 2.0,
            headless: false,
            ..RunConfig::default()
        };
        let setup = SessionSetup::from(&config);
        assert_eq!(setup.viewport, config.viewport);
        assert_eq!(setup.custom_css, config.custom_css);
        assert!((setup.device_scale_factor - 2.0).abs() < f64::EPSILON);
        assert!(!setup.headless);
    }

    #[test]
    fn navigation_outcome_classifies_status() {
        assert!(NavigationOutcome::from_status(200).success);
        assert!(NavigationOutcome::from_status(204).success);
        assert!(!NavigationOutcome::from_status(404).success);
        assert!(!NavigationOutcome::from_status(503).success);
    }
}
