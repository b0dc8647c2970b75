use clap::{Parser, ValueEnum};
use docshot_lib::config::DEFAULT_CONFIG_PATH;
use docshot_lib::Viewport;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docshot")]
#[command(
    version,
    about = "Docshot - Capture documentation screenshots from web pages",
    long_about = "Docshot\n\nReads a screenshot configuration (JSON, TOML or YAML), opens one headless Chromium session through Playwright and captures every declared job to <output_directory>/<name>.png.\n\nFlags override the matching configuration values. Requires Node.js with the `playwright` package and a Chromium build (`npx playwright install chromium`)."
)]
pub struct Cli {
    #[arg(
        long,
        value_name = "PATH",
        default_value = DEFAULT_CONFIG_PATH,
        help = "Screenshot configuration file (.json, .toml, .yaml)"
    )]
    pub config: PathBuf,

    #[arg(long, value_name = "PATH", help = "Override the output directory")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, help = "Override viewport dimensions (WIDTHxHEIGHT)")]
    pub viewport: Option<Viewport>,

    #[arg(long, value_name = "N", help = "Override attempts per job (at least 1)")]
    pub retries: Option<u32>,

    #[arg(
        long,
        value_name = "SECS",
        help = "Override the delay between attempts (seconds)"
    )]
    pub retry_delay: Option<f64>,

    #[arg(long, value_name = "SECS", help = "Navigation timeout (seconds)")]
    pub nav_timeout: Option<f64>,

    #[arg(long, value_name = "SECS", help = "Network idle timeout (seconds)")]
    pub network_idle_timeout: Option<f64>,

    #[arg(
        long,
        value_name = "PATH",
        default_value = "node",
        help = "Node.js executable used to run Playwright"
    )]
    pub node: String,

    #[arg(long, help = "Show the browser window instead of running headless")]
    pub headed: bool,

    #[arg(
        long,
        value_name = "NAME",
        help = "Only capture the named job (repeatable)"
    )]
    pub only: Vec<String>,

    #[arg(long, value_enum, default_value = "pretty", help = "Output format")]
    pub format: OutputFormat,

    #[arg(long, short, help = "Output file path (stdout if omitted)")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Exit with status 1 when any job failed")]
    pub fail_on_error: bool,

    #[arg(long, help = "Enable verbose (debug) logging")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value = "text", help = "Log format on stderr")]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{Cli, LogFormat, OutputFormat};
    use clap::Parser;
    use std::path::Path;

    #[test]
    fn uses_defaults() {
        let cli = Cli::parse_from(["docshot"]);

        assert_eq!(cli.config, Path::new("tools/screenshot_config.json"));
        assert!(cli.output_dir.is_none());
        assert!(cli.viewport.is_none());
        assert!(cli.retries.is_none());
        assert!(cli.retry_delay.is_none());
        assert!(cli.nav_timeout.is_none());
        assert!(cli.network_idle_timeout.is_none());
        assert_eq!(cli.node, "node");
        assert!(!cli.headed);
        assert!(cli.only.is_empty());
        assert_eq!(cli.format, OutputFormat::Pretty);
        assert!(cli.output.is_none());
        assert!(!cli.fail_on_error);
        assert!(!cli.verbose);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn respects_overrides() {
        let cli = Cli::parse_from([
            "docshot",
            "--config",
            "shots.toml",
            "--output-dir",
            "out",
            "--viewport",
            "1920x1080",
            "--retries",
            "5",
            "--retry-delay",
            "0.5",
            "--nav-timeout",
            "20",
            "--network-idle-timeout",
            "6",
            "--node",
            "/usr/local/bin/node",
            "--headed",
            "--only",
            "home",
            "--only",
            "search",
            "--format",
            "json",
            "--output",
            "report.json",
            "--fail-on-error",
            "--verbose",
            "--log-format",
            "json",
        ]);

        assert_eq!(cli.config, Path::new("shots.toml"));
        assert_eq!(cli.output_dir.as_deref(), Some(Path::new("out")));
        let viewport = cli.viewport.unwrap();
        assert_eq!((viewport.width, viewport.height), (1920, 1080));
        assert_eq!(cli.retries, Some(5));
        assert_eq!(cli.retry_delay, Some(0.5));
        assert_eq!(cli.nav_timeout, Some(20.0));
        assert_eq!(cli.network_idle_timeout, Some(6.0));
        assert_eq!(cli.node, "/usr/local/bin/node");
        assert!(cli.headed);
        assert_eq!(cli.only, ["home", "search"]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.output.as_deref(), Some(Path::new("report.json")));
        assert!(cli.fail_on_error);
        assert!(cli.verbose);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_malformed_viewport() {
        assert!(Cli::try_parse_from(["docshot", "--viewport", "wide"]).is_err());
        assert!(Cli::try_parse_from(["docshot", "--viewport", "0x720"]).is_err());
    }
}
