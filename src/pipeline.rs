//! The end-to-end run: load, open the session, capture, release, report.

use std::panic::AssertUnwindSafe;
use std::path::Path;

use futures::FutureExt;
use tracing::{info, warn};

use crate::browser::{BrowserSession, SessionLauncher, SessionSetup};
use crate::capture::CaptureOrchestrator;
use crate::config::{load_config, LoadedConfig};
use crate::progress::ProgressCallback;
use crate::report::RunReport;
use crate::{DocshotError, Result};

/// Creates the output directory (and parents) ahead of any browser work.
pub fn prepare_output_directory(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        DocshotError::Config(format!(
            "Failed to create output directory {}: {}",
            dir.display(),
            e
        ))
    })
}

/// Runs every job of an already-loaded configuration against one session.
///
/// The session is closed on every exit path once launched, including when
/// the job loop panics.
pub async fn run_capture<L>(
    launcher: &L,
    config: &LoadedConfig,
    progress: Option<ProgressCallback>,
) -> Result<RunReport>
where
    L: SessionLauncher,
{
    prepare_output_directory(&config.run.output_directory)?;

    info!(
        jobs = config.jobs.len(),
        output = %config.run.output_directory.display(),
        viewport = %config.run.viewport,
        "starting screenshot run"
    );
    let mut session = launcher.launch(&SessionSetup::from(&config.run)).await?;

    let orchestrator = CaptureOrchestrator::new(&config.run).with_progress(progress);
    let outcome = AssertUnwindSafe(orchestrator.capture_all(&mut session, &config.jobs))
        .catch_unwind()
        .await;

    if let Err(err) = session.close().await {
        warn!("failed to close browser session cleanly: {}", err);
    }

    match outcome {
        Ok(report) => {
            report.log_summary();
            Ok(report)
        }
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Loads the configuration at `config_path` and runs it. Configuration
/// errors surface before a session is launched.
pub async fn run<L>(
    config_path: &Path,
    launcher: &L,
    progress: Option<ProgressCallback>,
) -> Result<RunReport>
where
    L: SessionLauncher,
{
    let config = load_config(config_path)?;
    run_capture(launcher, &config, progress).await
}
