//! Docshot Library
//!
//! Captures documentation screenshots from web pages. A configuration
//! document declares an ordered list of jobs; each job is captured in one
//! shared headless browser session (Playwright via Node.js), with retries,
//! optional pre-capture interactions and element/full-page targets.
//!
//! # Module Overview
//!
//! - [`config`] - Configuration document loading and validation
//! - [`browser`] - Browser session capability and the Playwright backend
//! - [`capture`] - Per-job capture steps and the retry loop
//! - [`pipeline`] - End-to-end run with scoped session lifetime
//! - [`report`] - Per-job results and the run summary
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use docshot_lib::{run, BrowserOptions, PlaywrightLauncher};
//! use std::path::Path;
//!
//! # async fn example() -> docshot_lib::Result<()> {
//! let launcher = PlaywrightLauncher::new(BrowserOptions::default());
//! let report = run(Path::new("tools/screenshot_config.json"), &launcher, None).await?;
//! println!("{}", report.summary_line());
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod capture;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod viewport;

pub use browser::{
    BrowserOptions, BrowserSession, CaptureTarget, NavigationOutcome, PlaywrightLauncher,
    PlaywrightSession, ScreenshotRequest, SessionLauncher, SessionSetup, DEFAULT_LAUNCH_TIMEOUT,
};
pub use capture::CaptureOrchestrator;
pub use config::{
    load_config, Action, ConfigDocument, ConfigFormat, LoadedConfig, RunConfig, ScreenshotJob,
    Timeouts, DEFAULT_CONFIG_PATH,
};
pub use error::{DocshotError, ErrorCategory, ErrorPayload, Result};
pub use output::{CaptureOutput, DocshotOutput, ErrorOutput, DOCSHOT_OUTPUT_VERSION};
pub use pipeline::{run, run_capture};
pub use progress::{CaptureEvent, ProgressCallback};
pub use report::{JobResult, RunReport};
pub use viewport::Viewport;
