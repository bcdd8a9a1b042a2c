//! Package installer abstraction
//!
//! The loader only needs "install this name into that directory". The npm
//! backend classifies failures from npm's `--json` error report and falls
//! back to matching diagnostic text when no report is available.

use crate::config::schema::InstallerConfig;
use crate::error::{TrymodError, TrymodResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// npm error codes meaning the requested package has no resolvable version
const NOT_FOUND_CODES: &[&str] = &["E404", "ETARGET", "ENOTFOUND"];

/// Diagnostic fragments meaning the same, for installers without `--json`
const NOT_FOUND_PATTERNS: &[&str] = &["E404", "No matching version", "ETARGET", "ENOTFOUND", "404"];

/// Max number of installer output lines kept in error messages.
const ERROR_TAIL_LINES: usize = 20;

/// Installs packages into a cache directory
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Install `name` as a dependency of the project rooted at `dir`
    async fn install(&self, name: &str, dir: &Path) -> TrymodResult<()>;

    /// Human-readable installer name for display
    fn installer_name(&self) -> &str;
}

/// How an installer failure should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The package (or requested version) does not exist
    NotFound,
    /// Anything else: network, permissions, build scripts
    Other,
}

#[derive(Debug, Deserialize)]
struct NpmErrorReport {
    error: NpmError,
}

#[derive(Debug, Deserialize)]
struct NpmError {
    code: Option<String>,
}

/// Installer backed by the npm CLI
pub struct NpmInstaller {
    program: String,
    extra_args: Vec<String>,
}

impl NpmInstaller {
    /// Create an npm installer from config
    pub fn new(config: &InstallerConfig) -> Self {
        Self {
            program: config.program.clone(),
            extra_args: config.extra_args.clone(),
        }
    }

    fn args<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut args = vec![
            "install",
            name,
            "--no-audit",
            "--progress=false",
            "--prefer-online",
            "--json",
        ];
        args.extend(self.extra_args.iter().map(String::as_str));
        args
    }
}

#[async_trait]
impl PackageInstaller for NpmInstaller {
    async fn install(&self, name: &str, dir: &Path) -> TrymodResult<()> {
        let args = self.args(name);
        debug!("Executing in {}: {} {:?}", dir.display(), self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| TrymodError::command_failed(format!("{} install {}", self.program, name), e))?;

        if output.status.success() {
            info!("{} installed {}", self.program, name);
            return Ok(());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("{} install {} failed:\n{}\n{}", self.program, name, stdout, stderr);

        match classify_failure(&stdout, &stderr) {
            FailureKind::NotFound => Err(TrymodError::PackageNotFound(name.to_string())),
            FailureKind::Other => Err(TrymodError::Install {
                installer: self.program.clone(),
                package: name.to_string(),
                reason: failure_summary(&stderr, output.status.code()),
            }),
        }
    }

    fn installer_name(&self) -> &str {
        &self.program
    }
}

/// Classify an installer failure from its captured output.
///
/// A structured npm error report wins; text matching is the fallback.
pub fn classify_failure(stdout: &str, stderr: &str) -> FailureKind {
    if let Some(code) = error_code(stdout).or_else(|| error_code(stderr)) {
        return if NOT_FOUND_CODES.contains(&code.as_str()) {
            FailureKind::NotFound
        } else {
            FailureKind::Other
        };
    }

    if NOT_FOUND_PATTERNS.iter().any(|p| stderr.contains(p)) {
        FailureKind::NotFound
    } else {
        FailureKind::Other
    }
}

/// Extract `error.code` from an npm `--json` report embedded in `text`
fn error_code(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<NpmErrorReport>(&text[start..=end])
        .ok()
        .and_then(|report| report.error.code)
}

/// Last few lines of installer diagnostics for the error message
fn failure_summary(stderr: &str, code: Option<i32>) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return match code {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        };
    }
    let skip = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[skip..].join("\n")
}
