//! Playwright-backed browser session.
//!
//! This module launches one Node.js helper running the Playwright driver
//! script and exposes it as a [`BrowserSession`]. Requests are written one
//! at a time and each is bounded by its operation timeout plus a grace
//! period, so a wedged helper cannot hang the run.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::playwright::{
    ensure_node_available, ensure_playwright_available, map_driver_failure, map_launch_failure,
    map_spawn_error, PLAYWRIGHT_DRIVER_SCRIPT,
};
use super::protocol::{DriverCommand, DriverFailure, DriverReply, DriverRequest, FailureKind};
use super::{
    BrowserSession, CaptureTarget, NavigationOutcome, ScreenshotRequest, SessionLauncher,
    SessionSetup,
};
use crate::{DocshotError, Result};

/// Default timeout for starting Chromium and opening the page.
pub const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(45);

/// Extra time allowed on top of an operation's own timeout before the
/// helper is considered unresponsive.
pub const DRIVER_GRACE_PERIOD: Duration = Duration::from_secs(5);

const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration options for the Playwright helper.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// The Node.js command to use (default: "node").
    pub node_command: String,
    /// Timeout for launching the browser and opening the page.
    pub launch_timeout: Duration,
    /// Extra time on top of each operation's timeout before the helper is
    /// considered unresponsive.
    pub grace_period: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            launch_timeout: DEFAULT_LAUNCH_TIMEOUT,
            grace_period: DRIVER_GRACE_PERIOD,
        }
    }
}

/// Launches [`PlaywrightSession`]s.
#[derive(Debug, Clone)]
pub struct PlaywrightLauncher {
    options: BrowserOptions,
}

impl PlaywrightLauncher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }

    /// Fails fast if Node or the Playwright package is missing.
    pub async fn check_prerequisites(&self) -> Result<()> {
        ensure_node_available(&self.options.node_command).await?;
        ensure_playwright_available(&self.options.node_command).await
    }
}

#[async_trait]
impl SessionLauncher for PlaywrightLauncher {
    type Session = PlaywrightSession;

    async fn launch(&self, setup: &SessionSetup) -> Result<PlaywrightSession> {
        self.check_prerequisites().await?;

        let scratch = tempfile::Builder::new()
            .prefix("docshot-")
            .tempdir()
            .map_err(|e| DocshotError::Launch(format!("Failed to create scratch dir: {}", e)))?;

        let mut cmd = Command::new(&self.options.node_command);
        cmd.arg("-e")
            .arg(PLAYWRIGHT_DRIVER_SCRIPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &self.options.node_command))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DocshotError::Launch("Playwright helper stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DocshotError::Launch("Playwright helper stdout unavailable".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        let mut session = PlaywrightSession {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            closed: false,
            grace: self.options.grace_period,
            scratch,
        };

        debug!(
            viewport = %setup.viewport,
            scale = setup.device_scale_factor,
            headless = setup.headless,
            custom_css = setup.custom_css.is_some(),
            "launching Chromium via Playwright"
        );
        let command = DriverCommand::Launch {
            width: setup.viewport.width,
            height: setup.viewport.height,
            device_scale_factor: setup.device_scale_factor,
            headless: setup.headless,
            custom_css: setup.custom_css.clone(),
        };
        let outcome = session
            .request(&command, self.options.launch_timeout, "launching browser")
            .await;

        match outcome {
            Ok(Ok(_)) => Ok(session),
            Ok(Err(failure)) => {
                session.abort().await;
                Err(map_launch_failure(failure))
            }
            Err(err) => {
                session.abort().await;
                Err(DocshotError::Launch(err.to_string()))
            }
        }
    }
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end();
        if !line.is_empty() {
            debug!(target: "docshot::driver", "{}", line);
        }
    }
}

/// Largest timeout a JavaScript timer honours; longer values fire at once.
const MAX_DRIVER_TIMEOUT_MS: u64 = i32::MAX as u64;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis())
        .unwrap_or(u64::MAX)
        .min(MAX_DRIVER_TIMEOUT_MS)
}

/// One Chromium page driven by the Playwright helper process.
///
/// The helper is killed if the session is dropped without [`close`].
///
/// [`close`]: BrowserSession::close
#[derive(Debug)]
pub struct PlaywrightSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    closed: bool,
    grace: Duration,
    scratch: TempDir,
}

type DriverOutcome = std::result::Result<DriverReply, DriverFailure>;

impl PlaywrightSession {
    /// Sends one command and waits for its reply. The outer error is a
    /// transport failure; the inner one is a failure the driver reported.
    async fn request(
        &mut self,
        command: &DriverCommand,
        bound: Duration,
        operation: &str,
    ) -> Result<DriverOutcome> {
        if self.closed {
            return Err(DocshotError::Session("browser session is closed".into()));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DocshotError::Session("browser session is closed".into()))?;

        let id = self.next_id;
        self.next_id += 1;

        let mut line = serde_json::to_string(&DriverRequest { id, command })
            .map_err(|e| DocshotError::Session(format!("Failed to encode request: {}", e)))?;
        line.push('\n');

        stdin.write_all(line.as_bytes()).await.map_err(|e| {
            DocshotError::Session(format!("Failed to write to Playwright helper: {}", e))
        })?;
        stdin.flush().await.map_err(|e| {
            DocshotError::Session(format!("Failed to write to Playwright helper: {}", e))
        })?;

        let start = Instant::now();
        let reply = timeout(bound, self.read_reply(id)).await.map_err(|_| {
            DocshotError::timeout(
                format!("{operation} (no reply from Playwright helper)"),
                start.elapsed(),
            )
        })??;

        Ok(reply.into_result())
    }

    async fn read_reply(&mut self, id: u64) -> Result<DriverReply> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(|e| {
                    DocshotError::Session(format!("Failed to read from Playwright helper: {}", e))
                })?
                .ok_or_else(|| {
                    DocshotError::Session("Playwright helper exited unexpectedly".into())
                })?;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let reply: DriverReply = match serde_json::from_str(trimmed) {
                Ok(reply) => reply,
                Err(_) => {
                    debug!(target: "docshot::driver", "{}", trimmed);
                    continue;
                }
            };
            match reply.id {
                Some(reply_id) if reply_id == id => return Ok(reply),
                // The driver could not parse our request line.
                None => return Ok(reply),
                Some(stale) => {
                    debug!(stale, expected = id, "discarding late reply from Playwright helper");
                }
            }
        }
    }

    /// Runs a page operation, mapping driver failures with timing context.
    async fn page_op(
        &mut self,
        command: DriverCommand,
        op_timeout: Duration,
        operation: &str,
    ) -> Result<DriverReply> {
        let start = Instant::now();
        let bound = op_timeout.saturating_add(self.grace);
        self.request(&command, bound, operation)
            .await?
            .map_err(|failure| map_driver_failure(failure, operation, start.elapsed()))
    }

    async fn abort(&mut self) {
        self.closed = true;
        self.stdin = None;
        if let Err(err) = self.child.kill().await {
            debug!("failed to kill Playwright helper: {}", err);
        }
    }

    fn scratch_path(&self) -> PathBuf {
        self.scratch.path().join(format!("capture-{}.png", self.next_id))
    }
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    async fn navigate(&mut self, url: &str, nav_timeout: Duration) -> Result<NavigationOutcome> {
        let start = Instant::now();
        let command = DriverCommand::Goto {
            url: url.to_string(),
            timeout: millis(nav_timeout),
        };
        let outcome = self
            .request(&command, nav_timeout.saturating_add(self.grace), "navigating")
            .await?;

        match outcome {
            Ok(reply) => Ok(NavigationOutcome {
                status: reply.status,
                success: reply.success.unwrap_or(true),
            }),
            Err(failure) if failure.kind == FailureKind::Error => Err(DocshotError::Navigation {
                url: url.to_string(),
                status: None,
                message: failure.message.lines().next().unwrap_or_default().to_string(),
            }),
            Err(failure) => Err(map_driver_failure(
                failure,
                &format!("navigating to {url}"),
                start.elapsed(),
            )),
        }
    }

    async fn wait_for_network_idle(&mut self, idle_timeout: Duration) -> Result<()> {
        let command = DriverCommand::WaitForNetworkIdle {
            timeout: millis(idle_timeout),
        };
        self.page_op(command, idle_timeout, "waiting for network idle")
            .await
            .map(|_| ())
    }

    async fn wait_for_selector(&mut self, selector: &str, wait_timeout: Duration) -> Result<()> {
        let command = DriverCommand::WaitForSelector {
            selector: selector.to_string(),
            timeout: millis(wait_timeout),
        };
        self.page_op(command, wait_timeout, &format!("waiting for {selector}"))
            .await
            .map(|_| ())
    }

    async fn click(&mut self, selector: &str, action_timeout: Duration) -> Result<()> {
        let command = DriverCommand::Click {
            selector: selector.to_string(),
            timeout: millis(action_timeout),
        };
        self.page_op(command, action_timeout, &format!("clicking {selector}"))
            .await
            .map(|_| ())
    }

    async fn type_text(
        &mut self,
        selector: &str,
        text: &str,
        action_timeout: Duration,
    ) -> Result<()> {
        let command = DriverCommand::Type {
            selector: selector.to_string(),
            text: text.to_string(),
            timeout: millis(action_timeout),
        };
        self.page_op(command, action_timeout, &format!("typing into {selector}"))
            .await
            .map(|_| ())
    }

    async fn screenshot(&mut self, request: &ScreenshotRequest) -> Result<Vec<u8>> {
        let path = self.scratch_path();
        let (selector, full_page) = match &request.target {
            CaptureTarget::Element(selector) => (Some(selector.clone()), false),
            CaptureTarget::FullPage => (None, true),
            CaptureTarget::Viewport => (None, false),
        };
        let command = DriverCommand::Screenshot {
            path: path.clone(),
            selector,
            full_page,
            disable_animations: request.disable_animations,
            timeout: millis(request.timeout),
        };
        // Element lookup and the capture itself each get the full timeout.
        self.page_op(command, request.timeout.saturating_mul(2), "capturing screenshot")
            .await?;

        let bytes = tokio::fs::read(&path).await?;
        if let Err(err) = tokio::fs::remove_file(&path).await {
            debug!("failed to remove scratch capture {}: {}", path.display(), err);
        }
        Ok(bytes)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let result = self
            .request(&DriverCommand::Close, CLOSE_TIMEOUT, "closing browser")
            .await;
        self.closed = true;
        // EOF on stdin makes the driver exit.
        self.stdin = None;

        match timeout(CLOSE_TIMEOUT, self.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "Playwright helper exited"),
            Ok(Err(err)) => warn!("failed to wait for Playwright helper: {}", err),
            Err(_) => {
                warn!("Playwright helper did not exit after close; killing it");
                let _ = self.child.kill().await;
            }
        }

        match result? {
            Ok(_) => Ok(()),
            Err(failure) => Err(map_driver_failure(failure, "closing browser", Duration::ZERO)),
        }
    }
}
