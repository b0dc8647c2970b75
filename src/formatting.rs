use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use docshot_lib::{DocshotError, DocshotOutput, ErrorOutput, DOCSHOT_OUTPUT_VERSION};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &DocshotOutput,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output)?,
        OutputFormat::Pretty => write_pretty_output(body, output)?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: DocshotError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let error_payload = err.to_payload();
    let payload = DocshotOutput::Error(ErrorOutput {
        version: DOCSHOT_OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            // Errors go to stderr in a terminal session; files keep the JSON shape.
            let result = match output.as_deref() {
                Some(path) => write_pretty_output(&payload, Some(path)),
                None => {
                    eprint!("{}", format_pretty(&payload, io::stderr().is_terminal()));
                    Ok(())
                }
            };
            if let Err(write_err) = result {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    // Reserve exit code 2 for fatal errors; failed jobs use 1 only on request.
    ExitCode::from(2)
}

/// Write JSON output to file or stdout.
fn write_json_output(body: &DocshotOutput, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &DocshotOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none();

    if use_human {
        let content = format_pretty(body, stdout_is_tty);
        print!("{content}");
        return Ok(());
    }

    // File output keeps the JSON shape for pipelines.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &DocshotOutput, colorize: bool) -> String {
    match body {
        DocshotOutput::Capture(out) => {
            let mut buf = String::new();
            let (status, code) = if out.all_succeeded() {
                ("DONE", "32")
            } else if out.successful == 0 {
                ("FAIL", "31")
            } else {
                ("PARTIAL", "33")
            };
            writeln!(
                buf,
                "{} Screenshot generation complete: {}/{} successful",
                color(status, code, colorize),
                out.successful,
                out.total
            )
            .ok();
            writeln!(buf, "Output: {}", out.output_directory.display()).ok();
            for result in &out.results {
                if result.success {
                    let size = match (result.width, result.height) {
                        (Some(w), Some(h)) => format!(" ({w}x{h})"),
                        _ => String::new(),
                    };
                    let path = result
                        .path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    writeln!(buf, "- {} {} -> {}{}", color("ok", "32", colorize), result.name, path, size)
                        .ok();
                } else {
                    writeln!(
                        buf,
                        "- {} {} after {} attempt(s): {}",
                        color("failed", "31", colorize),
                        result.name,
                        result.attempts,
                        result.error.as_deref().unwrap_or("unknown error")
                    )
                    .ok();
                }
            }
            buf
        }
        DocshotOutput::Error(out) => {
            let mut buf = String::new();
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
            buf
        }
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Determine exit code for a completed run.
pub fn exit_code_for_run(all_succeeded: bool, fail_on_error: bool) -> ExitCode {
    if all_succeeded || !fail_on_error {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docshot_lib::{CaptureOutput, ErrorCategory, ErrorPayload, JobResult, RunReport};

    fn partial_output() -> DocshotOutput {
        let report: RunReport = [
            JobResult::succeeded("home", 1, PathBuf::from("shots/home.png"), (1280, 720)),
            JobResult::failed("search", 3, "Element not found: #results"),
        ]
        .into_iter()
        .collect();
        DocshotOutput::Capture(CaptureOutput::from_report(&report, Path::new("shots")))
    }

    #[test]
    fn exit_code_for_run_only_escalates_on_request() {
        assert_eq!(exit_code_for_run(true, false), ExitCode::SUCCESS);
        assert_eq!(exit_code_for_run(true, true), ExitCode::SUCCESS);
        assert_eq!(exit_code_for_run(false, false), ExitCode::SUCCESS);
        assert_eq!(exit_code_for_run(false, true), ExitCode::from(1));
    }

    #[test]
    fn render_error_always_returns_fatal_exit_code() {
        let code = render_error(
            DocshotError::Config("boom".to_string()),
            OutputFormat::Json,
            None,
        );
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn format_pretty_lists_each_job() {
        let pretty = format_pretty(&partial_output(), false);
        assert!(pretty.contains("PARTIAL Screenshot generation complete: 1/2 successful"));
        assert!(pretty.contains("Output: shots"));
        assert!(pretty.contains("- ok home -> shots/home.png (1280x720)"));
        assert!(pretty.contains("- failed search after 3 attempt(s): Element not found: #results"));
    }

    #[test]
    fn format_pretty_colorizes_when_enabled() {
        let pretty = format_pretty(&partial_output(), true);
        assert!(pretty.contains("\x1b[33mPARTIAL\x1b[0m"));
    }

    #[test]
    fn format_pretty_handles_errors() {
        let output = DocshotOutput::Error(ErrorOutput {
            version: DOCSHOT_OUTPUT_VERSION.to_string(),
            message: Some("bad input".to_string()),
            error: ErrorPayload {
                category: ErrorCategory::Config,
                message: "bad input".to_string(),
                remediation: Some("check flags".to_string()),
            },
        });

        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("[ERROR] bad input"));
        assert!(pretty.contains("Hint: check flags"));
    }

    #[test]
    fn write_output_json_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        write_output(&partial_output(), OutputFormat::Json, Some(&path)).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mode"], "capture");
        assert_eq!(value["total"], 2);
    }
}
