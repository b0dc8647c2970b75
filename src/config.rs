//! Screenshot run configuration.
//!
//! The configuration document is flat: run-wide settings at the top level and
//! an ordered `screenshots` list of jobs. JSON is the canonical format; TOML
//! and YAML documents with the same field names are accepted based on the
//! file extension.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{DocshotError, Result, Viewport};

pub const DEFAULT_CONFIG_PATH: &str = "tools/screenshot_config.json";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "docs/assets/screenshots";
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 1.0;
pub const DEFAULT_DEVICE_SCALE_FACTOR: f64 = 1.0;

/// Settle delay applied when a job does not declare `wait_time`.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Pause after each pre-capture action.
pub const ACTION_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub struct Timeouts {
    pub navigation: Duration,
    pub network_idle: Duration,
    pub selector: Duration,
    pub action: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            network_idle: Duration::from_secs(10),
            selector: Duration::from_secs(10),
            action: Duration::from_secs(10),
        }
    }
}

/// Run-wide settings, immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub output_directory: PathBuf,
    pub retries: u32,
    pub retry_delay: Duration,
    pub viewport: Viewport,
    pub device_scale_factor: f64,
    pub custom_css: Option<String>,
    pub timeouts: Timeouts,
    pub headless: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            retries: DEFAULT_RETRIES,
            retry_delay: Duration::from_secs_f64(DEFAULT_RETRY_DELAY_SECS),
            viewport: Viewport::default(),
            device_scale_factor: DEFAULT_DEVICE_SCALE_FACTOR,
            custom_css: None,
            timeouts: Timeouts::default(),
            headless: true,
        }
    }
}

impl RunConfig {
    /// Output path for a job's screenshot.
    pub fn output_path(&self, job: &ScreenshotJob) -> PathBuf {
        self.output_directory.join(format!("{}.png", job.name))
    }

    pub fn validate(&self) -> Result<()> {
        if self.retries == 0 {
            return Err(DocshotError::config("retries must be at least 1"));
        }
        self.viewport
            .validate()
            .map_err(|e| DocshotError::config(format!("Invalid viewport: {e}")))?;
        if !(self.device_scale_factor.is_finite() && self.device_scale_factor > 0.0) {
            return Err(DocshotError::config(format!(
                "device_scale_factor must be a positive number, got {}",
                self.device_scale_factor
            )));
        }
        if self.output_directory.as_os_str().is_empty() {
            return Err(DocshotError::config("output_directory must not be empty"));
        }
        Ok(())
    }
}

/// A pre-capture interaction, tagged by `type` in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum Action {
    Click { selector: String },
    Type { selector: String, text: String },
}

impl Action {
    pub fn selector(&self) -> &str {
        match self {
            Action::Click { selector } | Action::Type { selector, .. } => selector,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Click { selector } => write!(f, "click {selector}"),
            Action::Type { selector, .. } => write!(f, "type into {selector}"),
        }
    }
}

/// One declared screenshot task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScreenshotJob {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,
    /// Settle delay in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before_screenshot: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default)]
    pub full_page: bool,
    #[serde(default)]
    pub disable_animations: bool,
}

impl ScreenshotJob {
    pub fn settle_delay(&self) -> Duration {
        self.wait_time
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(DEFAULT_SETTLE_DELAY)
    }

    fn validate(&self, index: usize) -> Result<()> {
        let label = if self.name.is_empty() {
            format!("screenshots[{index}]")
        } else {
            format!("screenshots[{index}] ({})", self.name)
        };
        if self.name.trim().is_empty() {
            return Err(DocshotError::config(format!("{label}: name must not be empty")));
        }
        if self.name.contains(['/', '\\']) || self.name == "." || self.name == ".." {
            return Err(DocshotError::config(format!(
                "{label}: name must be a file name stem without path separators"
            )));
        }
        Url::parse(&self.url).map_err(|e| {
            DocshotError::config(format!("{label}: invalid url {:?}: {e}", self.url))
        })?;
        if let Some(secs) = self.wait_time {
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(DocshotError::config(format!(
                    "{label}: wait_time must be a non-negative number of seconds, got {secs}"
                )));
            }
        }
        if matches!(self.wait_for_selector.as_deref(), Some(s) if s.trim().is_empty()) {
            return Err(DocshotError::config(format!(
                "{label}: wait_for_selector must not be empty"
            )));
        }
        if matches!(self.selector.as_deref(), Some(s) if s.trim().is_empty()) {
            return Err(DocshotError::config(format!("{label}: selector must not be empty")));
        }
        if let Some(action) = self
            .before_screenshot
            .iter()
            .find(|a| a.selector().trim().is_empty())
        {
            return Err(DocshotError::config(format!(
                "{label}: action `{action}` has an empty selector"
            )));
        }
        Ok(())
    }
}

/// The document as written on disk; numeric durations are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f64,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    #[serde(default = "default_device_scale_factor")]
    pub device_scale_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_timeout: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_idle_timeout: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_timeout: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_timeout: Option<f64>,
    #[serde(default = "default_headless")]
    pub headless: bool,
    pub screenshots: Vec<ScreenshotJob>,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIRECTORY)
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_retry_delay() -> f64 {
    DEFAULT_RETRY_DELAY_SECS
}

fn default_viewport_width() -> u32 {
    Viewport::default().width
}

fn default_viewport_height() -> u32 {
    Viewport::default().height
}

fn default_device_scale_factor() -> f64 {
    DEFAULT_DEVICE_SCALE_FACTOR
}

fn default_headless() -> bool {
    true
}

/// Parsed and validated configuration: run settings plus jobs in declared order.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub run: RunConfig,
    pub jobs: Vec<ScreenshotJob>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("toml") => ConfigFormat::Toml,
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

impl ConfigDocument {
    pub fn parse(raw: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Json => serde_json::from_str(raw).map_err(|e| {
                DocshotError::config(format!("Invalid JSON configuration: {e}"))
            }),
            ConfigFormat::Toml => toml::from_str(raw).map_err(|e| {
                DocshotError::config(format!("Invalid TOML configuration: {e}"))
            }),
            ConfigFormat::Yaml => serde_yaml::from_str(raw).map_err(|e| {
                DocshotError::config(format!("Invalid YAML configuration: {e}"))
            }),
        }
    }

    /// Converts seconds into durations and validates every field.
    pub fn into_loaded(self) -> Result<LoadedConfig> {
        let defaults = Timeouts::default();
        let timeouts = Timeouts {
            navigation: timeout_secs("navigation_timeout", self.navigation_timeout, defaults.navigation)?,
            network_idle: timeout_secs(
                "network_idle_timeout",
                self.network_idle_timeout,
                defaults.network_idle,
            )?,
            selector: timeout_secs("selector_timeout", self.selector_timeout, defaults.selector)?,
            action: timeout_secs("action_timeout", self.action_timeout, defaults.action)?,
        };
        let retry_delay = Duration::try_from_secs_f64(self.retry_delay).map_err(|_| {
            DocshotError::config(format!(
                "retry_delay must be a non-negative number of seconds, got {}",
                self.retry_delay
            ))
        })?;

        let run = RunConfig {
            output_directory: self.output_directory,
            retries: self.retries,
            retry_delay,
            viewport: Viewport {
                width: self.viewport_width,
                height: self.viewport_height,
            },
            device_scale_factor: self.device_scale_factor,
            custom_css: self.custom_css,
            timeouts,
            headless: self.headless,
        };
        run.validate()?;
        validate_jobs(&self.screenshots)?;

        Ok(LoadedConfig {
            run,
            jobs: self.screenshots,
        })
    }
}

fn timeout_secs(field: &str, value: Option<f64>, default: Duration) -> Result<Duration> {
    match value {
        None => Ok(default),
        Some(secs) => match Duration::try_from_secs_f64(secs) {
            Ok(d) if !d.is_zero() => Ok(d),
            _ => Err(DocshotError::config(format!(
                "{field} must be a positive number of seconds, got {secs}"
            ))),
        },
    }
}

/// Validates each job and rejects duplicate names, which would overwrite
/// each other's output file.
pub fn validate_jobs(jobs: &[ScreenshotJob]) -> Result<()> {
    let mut seen = HashSet::new();
    for (index, job) in jobs.iter().enumerate() {
        job.validate(index)?;
        if !seen.insert(job.name.as_str()) {
            return Err(DocshotError::config(format!(
                "screenshots[{index}]: duplicate job name {:?}; names must be unique",
                job.name
            )));
        }
    }
    Ok(())
}

/// Reads, parses and validates a configuration document.
pub fn load_config(path: &Path) -> Result<LoadedConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DocshotError::config(format!("Config file not found: {}", path.display()))
        } else {
            DocshotError::config(format!("Failed to read config {}: {e}", path.display()))
        }
    })?;
    let document = ConfigDocument::parse(&raw, ConfigFormat::from_path(path)).map_err(|e| {
        DocshotError::config(format!("{} ({})", strip_prefix(&e), path.display()))
    })?;
    document.into_loaded()
}

fn strip_prefix(err: &DocshotError) -> String {
    match err {
        DocshotError::Config(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"{"screenshots": [{"name": "home", "url": "https://example.com"}]}"#;

    fn write_config(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp config");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    fn parse_json(raw: &str) -> Result<LoadedConfig> {
        ConfigDocument::parse(raw, ConfigFormat::Json)?.into_loaded()
    }

    #[test]
    fn default_values_match_expected() {
        let loaded = parse_json(MINIMAL).unwrap();
        let run = &loaded.run;

        assert_eq!(run.output_directory, PathBuf::from("docs/assets/screenshots"));
        assert_eq!(run.retries, 3);
        assert_eq!(run.retry_delay, Duration::from_secs(1));
        assert_eq!(run.viewport.width, 1280);
        assert_eq!(run.viewport.height, 720);
        assert!((run.device_scale_factor - 1.0).abs() < f64::EPSILON);
        assert!(run.custom_css.is_none());
        assert!(run.headless);
        assert_eq!(run.timeouts, Timeouts::default());
        assert_eq!(*run, RunConfig::default());

        let job = &loaded.jobs[0];
        assert_eq!(job.settle_delay(), DEFAULT_SETTLE_DELAY);
        assert!(!job.full_page);
        assert!(!job.disable_animations);
        assert!(job.before_screenshot.is_empty());
    }

    #[test]
    fn parses_full_document() {
        let raw = r##"{
            "output_directory": "out/shots",
            "retries": 5,
            "retry_delay": 0.25,
            "viewport_width": 800,
            "viewport_height": 600,
            "device_scale_factor": 2,
            "custom_css": "* { caret-color: transparent; }",
            "navigation_timeout": 12,
            "network_idle_timeout": 4.5,
            "screenshots": [
                {
                    "name": "search",
                    "url": "http://localhost:8000/search.html",
                    "wait_for_selector": "#results",
                    "wait_time": 0.5,
                    "before_screenshot": [
                        {"type": "click", "selector": "#search"},
                        {"type": "type", "selector": "#search", "text": "retry"}
                    ],
                    "selector": "main",
                    "disable_animations": true
                },
                {"name": "overview", "url": "http://localhost:8000/", "full_page": true}
            ]
        }"##;
        let loaded = parse_json(raw).unwrap();

        assert_eq!(loaded.run.output_directory, PathBuf::from("out/shots"));
        assert_eq!(loaded.run.retries, 5);
        assert_eq!(loaded.run.retry_delay, Duration::from_millis(250));
        assert_eq!(loaded.run.viewport, Viewport { width: 800, height: 600 });
        assert!((loaded.run.device_scale_factor - 2.0).abs() < f64::EPSILON);
        assert_eq!(loaded.run.timeouts.navigation, Duration::from_secs(12));
        assert_eq!(loaded.run.timeouts.network_idle, Duration::from_millis(4500));
        assert_eq!(loaded.run.timeouts.selector, Duration::from_secs(10));

        let names: Vec<_> = loaded.jobs.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, ["search", "overview"]);

        let search = &loaded.jobs[0];
        assert_eq!(search.settle_delay(), Duration::from_millis(500));
        assert_eq!(
            search.before_screenshot,
            vec![
                Action::Click {
                    selector: "#search".into()
                },
                Action::Type {
                    selector: "#search".into(),
                    text: "retry".into()
                },
            ]
        );
        assert_eq!(search.selector.as_deref(), Some("main"));
        assert!(search.disable_animations);
        assert!(loaded.jobs[1].full_page);
        assert_eq!(
            loaded.run.output_path(&loaded.jobs[1]),
            PathBuf::from("out/shots/overview.png")
        );
    }

    #[test]
    fn missing_screenshots_list_is_fatal() {
        let err = parse_json(r#"{"retries": 2}"#).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("screenshots"), "got: {err}");
    }

    #[test]
    fn missing_job_name_or_url_is_fatal() {
        let err = parse_json(r#"{"screenshots": [{"url": "https://example.com"}]}"#).unwrap_err();
        assert!(err.to_string().contains("name"), "got: {err}");

        let err = parse_json(r#"{"screenshots": [{"name": "home"}]}"#).unwrap_err();
        assert!(err.to_string().contains("url"), "got: {err}");
    }

    #[test]
    fn malformed_document_is_fatal() {
        let err = parse_json("{not json").unwrap_err();
        assert!(matches!(err, DocshotError::Config(_)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse_json(
            r#"{"retry": 2, "screenshots": [{"name": "home", "url": "https://example.com"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("retry"), "got: {err}");

        let err = parse_json(
            r#"{"screenshots": [{"name": "home", "url": "https://example.com", "fullpage": true}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("fullpage"), "got: {err}");
    }

    #[test]
    fn unknown_action_type_is_rejected() {
        let raw = r##"{"screenshots": [{"name": "a", "url": "https://example.com",
            "before_screenshot": [{"type": "hover", "selector": "#x"}]}]}"##;
        assert!(parse_json(raw).is_err());
    }

    #[test]
    fn unknown_action_fields_are_rejected() {
        let raw = r##"{"screenshots": [{"name": "a", "url": "https://example.com",
            "before_screenshot": [{"type": "click", "selector": "#a", "txt": "x"}]}]}"##;
        let err = parse_json(raw).unwrap_err();
        assert!(err.to_string().contains("txt"), "got: {err}");

        let raw = r##"{"screenshots": [{"name": "a", "url": "https://example.com",
            "before_screenshot": [{"type": "type", "selector": "#q", "text": "x", "delay": 5}]}]}"##;
        assert!(parse_json(raw).is_err());
    }

    #[test]
    fn invalid_run_values_are_rejected() {
        let cases = [
            r#"{"retries": 0, "screenshots": []}"#,
            r#"{"retry_delay": -1, "screenshots": []}"#,
            r#"{"viewport_width": 0, "screenshots": []}"#,
            r#"{"device_scale_factor": 0, "screenshots": []}"#,
            r#"{"navigation_timeout": 0, "screenshots": []}"#,
        ];
        for raw in cases {
            let err = parse_json(raw).expect_err(raw);
            assert!(err.is_fatal(), "{raw}: {err}");
        }
    }

    #[test]
    fn invalid_jobs_are_rejected() {
        let cases = [
            r#"{"screenshots": [{"name": "", "url": "https://example.com"}]}"#,
            r#"{"screenshots": [{"name": "../escape", "url": "https://example.com"}]}"#,
            r#"{"screenshots": [{"name": "home", "url": "not a url"}]}"#,
            r#"{"screenshots": [{"name": "home", "url": "/relative/path"}]}"#,
            r#"{"screenshots": [{"name": "home", "url": "https://example.com", "wait_time": -2}]}"#,
            r#"{"screenshots": [{"name": "home", "url": "https://example.com", "selector": " "}]}"#,
        ];
        for raw in cases {
            assert!(parse_json(raw).is_err(), "expected rejection: {raw}");
        }
    }

    #[test]
    fn duplicate_job_names_are_rejected() {
        let raw = r#"{"screenshots": [
            {"name": "home", "url": "https://example.com"},
            {"name": "home", "url": "https://example.com/other"}
        ]}"#;
        let err = parse_json(raw).unwrap_err();
        assert!(err.to_string().contains("duplicate"), "got: {err}");
    }

    #[test]
    fn empty_job_list_is_allowed() {
        let loaded = parse_json(r#"{"screenshots": []}"#).unwrap();
        assert!(loaded.jobs.is_empty());
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Json);
    }

    #[test]
    fn toml_and_yaml_match_json() {
        let toml_file = write_config(
            ".toml",
            r##"
retries = 2
viewport_width = 1024

[[screenshots]]
name = "home"
url = "https://example.com"

[[screenshots.before_screenshot]]
type = "click"
selector = "#menu"
"##,
        );
        let yaml_file = write_config(
            ".yaml",
            r##"
retries: 2
viewport_width: 1024
screenshots:
  - name: home
    url: https://example.com
    before_screenshot:
      - type: click
        selector: "#menu"
"##,
        );
        let json_file = write_config(
            ".json",
            r##"{"retries": 2, "viewport_width": 1024, "screenshots": [
                {"name": "home", "url": "https://example.com",
                 "before_screenshot": [{"type": "click", "selector": "#menu"}]}]}"##,
        );

        let from_json = load_config(json_file.path()).unwrap();
        for file in [&toml_file, &yaml_file] {
            let loaded = load_config(file.path()).unwrap();
            assert_eq!(loaded.run, from_json.run);
            assert_eq!(loaded.jobs, from_json.jobs);
        }
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config(Path::new("definitely/not/here.json")).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Config file not found"), "got: {err}");
    }

    #[test]
    fn load_config_names_the_file_on_parse_errors() {
        let file = write_config(".json", "[]");
        let err = load_config(file.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(&file.path().display().to_string()), "got: {msg}");
    }

    #[test]
    fn bundled_sample_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let loaded = load_config(&path).unwrap();
        let names: Vec<_> = loaded.jobs.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, ["home", "search-results", "reference"]);
        assert_eq!(loaded.jobs[1].before_screenshot.len(), 2);
        assert_eq!(loaded.jobs[1].settle_delay(), Duration::from_millis(1500));
        assert!(loaded.jobs[2].full_page);
    }
}
