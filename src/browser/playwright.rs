//! Playwright integration for headless browser automation.
//!
//! This module contains the inline Playwright driver script, error mapping,
//! and availability checks for Node.js and Playwright.

use crate::{DocshotError, Result};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::protocol::{DriverFailure, FailureKind};

/// Long-lived Playwright driver. Reads one JSON request per line on stdin and
/// answers each with one JSON line on stdout. Requests are handled strictly
/// in order; the browser is closed on `close` or when stdin ends.
pub(crate) const PLAYWRIGHT_DRIVER_SCRIPT: &str = r#"
const readline = require('readline');

let browser = null;
let context = null;
let page = null;

function reply(payload) {
  process.stdout.write(JSON.stringify(payload) + '\n');
}

function failure(kind, err) {
  const message = err && err.message ? err.message : String(err);
  return { kind, message };
}

function classify(err) {
  if (err && err.name === 'TimeoutError') {
    return failure('timeout', err);
  }
  return failure('error', err);
}

function requirePage() {
  if (!page) {
    throw new Error('browser session has not been launched');
  }
  return page;
}

async function launch(req) {
  const { chromium } = require('playwright');
  browser = await chromium.launch({ headless: req.headless });
  context = await browser.newContext({
    viewport: { width: req.width, height: req.height },
    deviceScaleFactor: req.deviceScaleFactor
  });
  if (req.customCss) {
    // Init scripts run in every new document, so the style outlives goto().
    await context.addInitScript(injectStyle, req.customCss);
  }
  page = await context.newPage();
  return {};
}

function injectStyle(css) {
  const apply = () => {
    const style = document.createElement('style');
    style.setAttribute('data-docshot', 'custom-css');
    style.textContent = css;
    (document.head || document.documentElement).appendChild(style);
  };
  if (document.head || document.documentElement) {
    apply();
  } else {
    document.addEventListener('DOMContentLoaded', apply, { once: true });
  }
}

async function goto(req) {
  const response = await requirePage().goto(req.url, { timeout: req.timeout });
  if (!response) {
    return { status: null, success: true };
  }
  return { status: response.status(), success: response.ok() };
}

async function screenshot(req) {
  const current = requirePage();
  const options = {
    path: req.path,
    animations: req.disableAnimations ? 'disabled' : 'allow',
    timeout: req.timeout
  };
  if (req.selector) {
    let element;
    try {
      element = await current.waitForSelector(req.selector, { timeout: req.timeout });
    } catch (err) {
      if (err && err.name === 'TimeoutError') {
        throw Object.assign(new Error(req.selector), { docshotKind: 'notFound' });
      }
      throw err;
    }
    if (!element) {
      throw Object.assign(new Error(req.selector), { docshotKind: 'notFound' });
    }
    await element.screenshot(options);
  } else {
    options.fullPage = !!req.fullPage;
    await current.screenshot(options);
  }
  return {};
}

async function dispatch(req) {
  switch (req.op) {
    case 'launch':
      return launch(req);
    case 'goto':
      return goto(req);
    case 'waitForNetworkIdle':
      await requirePage().waitForLoadState('networkidle', { timeout: req.timeout });
      return {};
    case 'waitForSelector':
      await requirePage().waitForSelector(req.selector, { timeout: req.timeout });
      return {};
    case 'click':
      await requirePage().click(req.selector, { timeout: req.timeout });
      return {};
    case 'type':
      await requirePage().type(req.selector, req.text, { timeout: req.timeout });
      return {};
    case 'screenshot':
      return screenshot(req);
    case 'close':
      await shutdown();
      return {};
    default:
      throw new Error(`unknown op: ${req.op}`);
  }
}

async function shutdown() {
  if (browser) {
    const current = browser;
    browser = null;
    context = null;
    page = null;
    await current.close();
  }
}

async function handle(line) {
  if (!line.trim()) return;
  let req;
  try {
    req = JSON.parse(line);
  } catch (err) {
    reply({ id: null, ok: false, error: failure('protocol', err) });
    return;
  }
  try {
    const result = await dispatch(req);
    reply(Object.assign({ id: req.id, ok: true }, result));
  } catch (err) {
    const error = err && err.docshotKind ? failure(err.docshotKind, err) : classify(err);
    reply({ id: req.id, ok: false, error });
  }
}

const rl = readline.createInterface({ input: process.stdin, terminal: false });
let queue = Promise.resolve();
rl.on('line', (line) => {
  queue = queue.then(() => handle(line));
});
rl.on('close', () => {
  queue = queue.then(shutdown).finally(() => process.exit(0));
});
"#;

/// Timeout for checking node/playwright availability.
pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Script to check if Playwright is installed.
const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

/// Maps a spawn error to an appropriate DocshotError.
pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> DocshotError {
    if err.kind() == io::ErrorKind::NotFound {
        DocshotError::Config(format!(
            "Unable to spawn Playwright helper; '{}' was not found on PATH",
            command
        ))
    } else {
        DocshotError::Io(err)
    }
}

/// Maps Playwright stderr output from the availability check to a DocshotError.
pub(crate) fn map_playwright_error(status_text: impl Into<String>, stderr: &str) -> DocshotError {
    if stderr
        .to_ascii_lowercase()
        .contains("cannot find module 'playwright'")
    {
        return DocshotError::Config(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        );
    }

    DocshotError::Config(format!(
        "Playwright check exited with status {}: {}",
        status_text.into(),
        stderr.trim()
    ))
}

/// Maps a failure reported by the driver for a page operation.
pub(crate) fn map_driver_failure(
    failure: DriverFailure,
    operation: &str,
    elapsed: Duration,
) -> DocshotError {
    match failure.kind {
        FailureKind::Timeout => DocshotError::timeout(
            format!("{operation}: {}", first_line(&failure.message)),
            elapsed,
        ),
        FailureKind::NotFound => DocshotError::ElementNotFound(failure.message),
        FailureKind::Protocol => DocshotError::Session(format!(
            "driver rejected request for {operation}: {}",
            failure.message
        )),
        FailureKind::Error => DocshotError::Driver(format!(
            "{operation}: {}",
            first_line(&failure.message)
        )),
    }
}

/// Maps a failure reported while launching the browser.
pub(crate) fn map_launch_failure(failure: DriverFailure) -> DocshotError {
    let lower = failure.message.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        return DocshotError::Config(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        );
    }
    if lower.contains("executable doesn't exist") {
        return DocshotError::Launch(format!(
            "Chromium executable is missing: {}",
            first_line(&failure.message)
        ));
    }
    DocshotError::Launch(first_line(&failure.message).to_string())
}

/// Playwright messages carry multi-line call logs; the first line is the summary.
fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or(message).trim()
}

/// Ensures Node.js is available on the system.
pub(crate) async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            DocshotError::Config(format!(
                "Timed out checking node availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(DocshotError::Config(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }

    Ok(())
}

/// Ensures Playwright npm package is installed.
pub(crate) async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            DocshotError::Config(format!(
                "Timed out checking Playwright availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_playwright_error(
            format!("{:?}", output.status),
            &stderr,
        ));
    }

    Ok(())
}
