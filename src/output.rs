use crate::error::ErrorPayload;
use crate::report::{JobResult, RunReport};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Schema version for output payloads.
pub const DOCSHOT_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum DocshotOutput {
    Capture(CaptureOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutput {
    pub version: String,
    pub output_directory: PathBuf,
    pub successful: usize,
    pub total: usize,
    #[serde(default)]
    pub results: Vec<JobResult>,
}

impl CaptureOutput {
    pub fn from_report(report: &RunReport, output_directory: &Path) -> Self {
        Self {
            version: DOCSHOT_OUTPUT_VERSION.to_string(),
            output_directory: output_directory.to_path_buf(),
            successful: report.successful(),
            total: report.total(),
            results: report.results().to_vec(),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.successful == self.total
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}
