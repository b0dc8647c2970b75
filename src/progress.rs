use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Observer for capture progress, injected by the caller.
pub type ProgressCallback = Arc<dyn Fn(&CaptureEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    AttemptStarted {
        job: String,
        attempt: u32,
        max_attempts: u32,
    },
    /// A tolerated step failed; capture continues in degraded form.
    StepDegraded {
        job: String,
        step: String,
        error: String,
    },
    AttemptFailed {
        job: String,
        attempt: u32,
        max_attempts: u32,
        error: String,
    },
    RetryScheduled {
        job: String,
        delay: Duration,
    },
    JobSucceeded {
        job: String,
        attempts: u32,
        path: PathBuf,
    },
    JobFailed {
        job: String,
        attempts: u32,
        error: String,
    },
}

impl CaptureEvent {
    pub fn job(&self) -> &str {
        match self {
            CaptureEvent::AttemptStarted { job, .. }
            | CaptureEvent::StepDegraded { job, .. }
            | CaptureEvent::AttemptFailed { job, .. }
            | CaptureEvent::RetryScheduled { job, .. }
            | CaptureEvent::JobSucceeded { job, .. }
            | CaptureEvent::JobFailed { job, .. } => job,
        }
    }
}

impl fmt::Display for CaptureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureEvent::AttemptStarted {
                job,
                attempt,
                max_attempts,
            } => write!(f, "Capturing screenshot: {job} (attempt {attempt}/{max_attempts})"),
            CaptureEvent::StepDegraded { job, step, error } => {
                write!(f, "{job}: {step} failed, continuing: {error}")
            }
            CaptureEvent::AttemptFailed {
                job,
                attempt,
                max_attempts,
                error,
            } => write!(
                f,
                "Error capturing {job} (attempt {attempt}/{max_attempts}): {error}"
            ),
            CaptureEvent::RetryScheduled { delay, .. } => {
                write!(f, "Retrying in {:.1} seconds...", delay.as_secs_f64())
            }
            CaptureEvent::JobSucceeded { job, path, .. } => {
                write!(f, "Successfully captured: {job} -> {}", path.display())
            }
            CaptureEvent::JobFailed { job, attempts, .. } => {
                write!(f, "Failed to capture {job} after {attempts} attempts")
            }
        }
    }
}
