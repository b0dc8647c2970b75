//! Capture orchestration: one job at a time, each with bounded retries.
//!
//! An attempt walks the job through navigate, network idle, settle delay,
//! wait-for-selector, pre-capture actions and the screenshot itself. Only
//! navigation, the screenshot and writing the file can fail an attempt;
//! the steps in between degrade gracefully unless the session is broken.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::browser::{BrowserSession, ScreenshotRequest};
use crate::config::{Action, RunConfig, ScreenshotJob, ACTION_PAUSE};
use crate::progress::{CaptureEvent, ProgressCallback};
use crate::report::{JobResult, RunReport};
use crate::{DocshotError, Result};

pub struct CaptureOrchestrator<'a> {
    config: &'a RunConfig,
    progress: Option<ProgressCallback>,
}

impl<'a> CaptureOrchestrator<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Captures every job in declared order. A failed job never stops the
    /// jobs after it.
    pub async fn capture_all<S>(&self, session: &mut S, jobs: &[ScreenshotJob]) -> RunReport
    where
        S: BrowserSession + ?Sized,
    {
        let mut report = RunReport::new();
        for job in jobs {
            report.push(self.capture_with_retry(session, job).await);
        }
        report
    }

    /// Attempts a job up to `retries` times, waiting `retry_delay` between
    /// failed attempts and stopping at the first success.
    pub async fn capture_with_retry<S>(&self, session: &mut S, job: &ScreenshotJob) -> JobResult
    where
        S: BrowserSession + ?Sized,
    {
        let max_attempts = self.config.retries.max(1);
        let path = self.config.output_path(job);
        let mut last_error = String::from("no attempt was made");

        for attempt in 1..=max_attempts {
            self.emit(CaptureEvent::AttemptStarted {
                job: job.name.clone(),
                attempt,
                max_attempts,
            });

            match self.attempt(session, job, &path).await {
                Ok(size) => {
                    self.emit(CaptureEvent::JobSucceeded {
                        job: job.name.clone(),
                        attempts: attempt,
                        path: path.clone(),
                    });
                    return JobResult::succeeded(job.name.clone(), attempt, path, size);
                }
                Err(err) => {
                    last_error = err.to_string();
                    self.emit(CaptureEvent::AttemptFailed {
                        job: job.name.clone(),
                        attempt,
                        max_attempts,
                        error: last_error.clone(),
                    });
                    if attempt < max_attempts {
                        self.emit(CaptureEvent::RetryScheduled {
                            job: job.name.clone(),
                            delay: self.config.retry_delay,
                        });
                        sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        self.emit(CaptureEvent::JobFailed {
            job: job.name.clone(),
            attempts: max_attempts,
            error: last_error.clone(),
        });
        JobResult::failed(job.name.clone(), max_attempts, last_error)
    }

    async fn attempt<S>(&self, session: &mut S, job: &ScreenshotJob, path: &Path) -> Result<(u32, u32)>
    where
        S: BrowserSession + ?Sized,
    {
        let timeouts = &self.config.timeouts;

        let navigation = session.navigate(&job.url, timeouts.navigation).await?;
        if !navigation.success {
            return Err(DocshotError::Navigation {
                url: job.url.clone(),
                status: navigation.status,
                message: "page did not load successfully".to_string(),
            });
        }

        if let Err(err) = session.wait_for_network_idle(timeouts.network_idle).await {
            self.tolerate(job, "waiting for network idle", err)?;
        }

        sleep(job.settle_delay()).await;

        if let Some(selector) = &job.wait_for_selector {
            if let Err(err) = session.wait_for_selector(selector, timeouts.selector).await {
                self.tolerate(job, &format!("waiting for {selector}"), err)?;
            }
        }

        for action in &job.before_screenshot {
            let outcome = match action {
                Action::Click { selector } => session.click(selector, timeouts.action).await,
                Action::Type { selector, text } => {
                    session.type_text(selector, text, timeouts.action).await
                }
            };
            if let Err(err) = outcome {
                self.tolerate(job, &action.to_string(), err)?;
            }
            sleep(ACTION_PAUSE).await;
        }

        let request = ScreenshotRequest::for_job(job, timeouts);
        let bytes = session.screenshot(&request).await?;
        let size = png_dimensions(&bytes)?;
        write_output(path, &bytes).await?;
        debug!(job = %job.name, path = %path.display(), width = size.0, height = size.1, "screenshot written");
        Ok(size)
    }

    /// Page-level failures of optional steps are logged and skipped; a broken
    /// session still fails the attempt.
    fn tolerate(&self, job: &ScreenshotJob, step: &str, err: DocshotError) -> Result<()> {
        if err.is_session_failure() {
            return Err(err);
        }
        self.emit(CaptureEvent::StepDegraded {
            job: job.name.clone(),
            step: step.to_string(),
            error: err.to_string(),
        });
        Ok(())
    }

    fn emit(&self, event: CaptureEvent) {
        match &event {
            CaptureEvent::AttemptStarted { .. }
            | CaptureEvent::RetryScheduled { .. }
            | CaptureEvent::JobSucceeded { .. } => info!(job = %event.job(), "{}", event),
            CaptureEvent::StepDegraded { .. } => warn!(job = %event.job(), "{}", event),
            CaptureEvent::AttemptFailed { .. } | CaptureEvent::JobFailed { .. } => {
                error!(job = %event.job(), "{}", event)
            }
        }
        if let Some(progress) = &self.progress {
            progress(&event);
        }
    }
}

/// Checks the bytes are a decodable PNG header and returns its size.
fn png_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => {}
        Ok(other) => {
            return Err(DocshotError::InvalidImage(format!(
                "expected PNG, got {:?}",
                other
            )))
        }
        Err(e) => return Err(DocshotError::InvalidImage(e.to_string())),
    }
    image::io::Reader::with_format(Cursor::new(bytes), ImageFormat::Png)
        .into_dimensions()
        .map_err(|e| DocshotError::InvalidImage(e.to_string()))
}

/// Writes through a sibling temp file so a failed write never leaves a
/// truncated `<name>.png` behind.
async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let partial = partial_path(path);
    tokio::fs::write(&partial, bytes).await?;
    if let Err(err) = tokio::fs::rename(&partial, path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(err.into());
    }
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
