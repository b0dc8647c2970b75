//! Line-delimited JSON messages exchanged with the Playwright driver.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Request body; serialized with an `op` tag and the request id alongside.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub(crate) enum DriverCommand {
    #[serde(rename_all = "camelCase")]
    Launch {
        width: u32,
        height: u32,
        device_scale_factor: f64,
        headless: bool,
        custom_css: Option<String>,
    },
    Goto {
        url: String,
        timeout: u64,
    },
    WaitForNetworkIdle {
        timeout: u64,
    },
    WaitForSelector {
        selector: String,
        timeout: u64,
    },
    Click {
        selector: String,
        timeout: u64,
    },
    Type {
        selector: String,
        text: String,
        timeout: u64,
    },
    #[serde(rename_all = "camelCase")]
    Screenshot {
        path: PathBuf,
        selector: Option<String>,
        full_page: bool,
        disable_animations: bool,
        timeout: u64,
    },
    Close,
}

#[derive(Debug, Serialize)]
pub(crate) struct DriverRequest<'a> {
    pub id: u64,
    #[serde(flatten)]
    pub command: &'a DriverCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum FailureKind {
    Timeout,
    NotFound,
    Protocol,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DriverFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// One reply line. Operation-specific fields sit next to `id`/`ok`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DriverReply {
    pub id: Option<u64>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<DriverFailure>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub success: Option<bool>,
}

impl DriverReply {
    pub fn into_result(self) -> std::result::Result<DriverReply, DriverFailure> {
        if self.ok {
            Ok(self)
        } else {
            Err(self.error.unwrap_or(DriverFailure {
                kind: FailureKind::Error,
                message: "driver reported failure without details".to_string(),
            }))
        }
    }
}
