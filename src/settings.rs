use std::path::{Path, PathBuf};
use std::time::Duration;

use docshot_lib::config::{LoadedConfig, RunConfig, ScreenshotJob};
use docshot_lib::{DocshotError, Viewport};

use crate::cli::Cli;

/// Configuration values the command line may override.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output_dir: Option<PathBuf>,
    pub viewport: Option<Viewport>,
    pub retries: Option<u32>,
    pub retry_delay: Option<f64>,
    pub nav_timeout: Option<f64>,
    pub network_idle_timeout: Option<f64>,
    pub headed: bool,
}

impl CliOverrides {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            output_dir: cli.output_dir.clone(),
            viewport: cli.viewport,
            retries: cli.retries,
            retry_delay: cli.retry_delay,
            nav_timeout: cli.nav_timeout,
            network_idle_timeout: cli.network_idle_timeout,
            headed: cli.headed,
        }
    }
}

/// Merge CLI overrides into the loaded run settings, preferring CLI values
/// when given, then re-validate the result.
pub fn apply_overrides(run: &mut RunConfig, overrides: &CliOverrides) -> Result<(), DocshotError> {
    if let Some(dir) = &overrides.output_dir {
        run.output_directory = dir.clone();
    }
    if let Some(viewport) = overrides.viewport {
        run.viewport = viewport;
    }
    if let Some(retries) = overrides.retries {
        run.retries = retries;
    }
    if let Some(secs) = overrides.retry_delay {
        run.retry_delay = Duration::try_from_secs_f64(secs).map_err(|_| {
            DocshotError::config(format!(
                "--retry-delay must be a non-negative number of seconds, got {secs}"
            ))
        })?;
    }
    if let Some(secs) = overrides.nav_timeout {
        run.timeouts.navigation = positive_secs("--nav-timeout", secs)?;
    }
    if let Some(secs) = overrides.network_idle_timeout {
        run.timeouts.network_idle = positive_secs("--network-idle-timeout", secs)?;
    }
    if overrides.headed {
        run.headless = false;
    }
    run.validate()
}

fn positive_secs(flag: &str, secs: f64) -> Result<Duration, DocshotError> {
    match Duration::try_from_secs_f64(secs) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(DocshotError::config(format!(
            "{flag} must be a positive number of seconds, got {secs}"
        ))),
    }
}

/// Restrict the job list to `only`, keeping declared order. Unknown names are
/// a configuration error.
pub fn select_jobs(jobs: Vec<ScreenshotJob>, only: &[String]) -> Result<Vec<ScreenshotJob>, DocshotError> {
    if only.is_empty() {
        return Ok(jobs);
    }
    let unknown: Vec<&str> = only
        .iter()
        .filter(|name| !jobs.iter().any(|job| &job.name == *name))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(DocshotError::config(format!(
            "Unknown job name(s) for --only: {}",
            unknown.join(", ")
        )));
    }
    Ok(jobs
        .into_iter()
        .filter(|job| only.contains(&job.name))
        .collect())
}

/// Load the config file and resolve it against the command line.
pub fn resolve_config(cli: &Cli) -> Result<LoadedConfig, DocshotError> {
    let mut config = docshot_lib::load_config(&cli.config)?;
    apply_overrides(&mut config.run, &CliOverrides::from_cli(cli))?;
    config.jobs = select_jobs(config.jobs, &cli.only)?;
    Ok(config)
}

/// Format effective config as a single-line string.
pub fn format_effective_config(config: &LoadedConfig, config_source: &Path) -> String {
    let run = &config.run;
    format!(
        "Effective config [{}]: jobs={}, output={}, viewport={}, scale={}, retries={}, retry_delay={:.1}s, timeouts: nav={}s, network-idle={}s, selector={}s, action={}s, headless={}, custom_css={}",
        config_source.display(),
        config.jobs.len(),
        run.output_directory.display(),
        run.viewport,
        run.device_scale_factor,
        run.retries,
        run.retry_delay.as_secs_f64(),
        run.timeouts.navigation.as_secs_f64(),
        run.timeouts.network_idle.as_secs_f64(),
        run.timeouts.selector.as_secs_f64(),
        run.timeouts.action.as_secs_f64(),
        run.headless,
        run.custom_css.is_some()
    )
}
