use std::process::ExitCode;

use docshot_lib::{
    run_capture, BrowserOptions, CaptureOutput, DocshotOutput, PlaywrightLauncher,
};
use tracing::debug;

use crate::cli::Cli;
use crate::formatting::{exit_code_for_run, render_error, write_output};
use crate::settings::{format_effective_config, resolve_config};

/// Run every selected job and report the outcome.
pub async fn run_capture_command(cli: Cli) -> ExitCode {
    let config = match resolve_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, cli.format, cli.output),
    };
    debug!("{}", format_effective_config(&config, &cli.config));

    let launcher = PlaywrightLauncher::new(BrowserOptions {
        node_command: cli.node.clone(),
        ..BrowserOptions::default()
    });

    let report = match run_capture(&launcher, &config, None).await {
        Ok(report) => report,
        Err(err) => return render_error(err, cli.format, cli.output),
    };

    let body = DocshotOutput::Capture(CaptureOutput::from_report(
        &report,
        &config.run.output_directory,
    ));
    if let Err(err) = write_output(&body, cli.format, cli.output.as_deref()) {
        eprintln!("Failed to write output: {err}");
        return ExitCode::from(2);
    }

    exit_code_for_run(report.all_succeeded(), cli.fail_on_error)
}
