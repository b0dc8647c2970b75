//! Per-job results and the end-of-run summary.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub name: String,
    pub success: bool,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    pub fn succeeded(name: impl Into<String>, attempts: u32, path: PathBuf, size: (u32, u32)) -> Self {
        Self {
            name: name.into(),
            success: true,
            attempts,
            path: Some(path),
            width: Some(size.0),
            height: Some(size.1),
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            attempts,
            path: None,
            width: None,
            height: None,
            error: Some(error.into()),
        }
    }
}

/// Results in declared job order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    results: Vec<JobResult>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: JobResult) {
        self.results.push(result);
    }

    pub fn results(&self) -> &[JobResult] {
        &self.results
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn successful(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &JobResult> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn all_succeeded(&self) -> bool {
        self.successful() == self.total()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Screenshot generation complete: {}/{} successful",
            self.successful(),
            self.total()
        )
    }

    pub fn log_summary(&self) {
        info!(
            successful = self.successful(),
            total = self.total(),
            "{}",
            self.summary_line()
        );
        if !self.all_succeeded() {
            warn!("Failed screenshots:");
            for result in self.failed() {
                warn!(
                    job = %result.name,
                    error = result.error.as_deref().unwrap_or("unknown error"),
                    "- {}",
                    result.name
                );
            }
        }
    }
}

impl FromIterator<JobResult> for RunReport {
    fn from_iter<I: IntoIterator<Item = JobResult>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}
