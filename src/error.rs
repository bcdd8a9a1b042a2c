//! Error types for trymod
//!
//! All modules use `TrymodResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for trymod operations
pub type TrymodResult<T> = Result<T, TrymodError>;

/// All errors that can occur in trymod
#[derive(Error, Debug)]
pub enum TrymodError {
    // Request errors
    #[error("Invalid package argument '{arg}': {reason}")]
    InvalidRequest { arg: String, reason: String },

    #[error("Alias '{alias}' is requested by both '{first}' and '{second}'")]
    AliasConflict {
        alias: String,
        first: String,
        second: String,
    },

    // Package loading errors
    #[error("Could not find package {0}")]
    PackageNotFound(String),

    #[error("{installer} install error for {package}: {reason}")]
    Install {
        installer: String,
        package: String,
        reason: String,
    },

    #[error("Failed to load package {package}: {reason}")]
    Load { package: String, reason: String },

    // Evaluation errors
    #[error("Evaluation timeout after {millis} ms")]
    EvaluationTimeout { millis: u64 },

    #[error("{0}")]
    Compile(String),

    #[error("{0}")]
    Runtime(String),

    // Evaluation host errors
    #[error("Evaluation host not available: {0}")]
    HostUnavailable(String),

    #[error("Evaluation host exited unexpectedly")]
    HostExited,

    #[error("Malformed reply from evaluation host: {0}")]
    HostProtocol(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("{0}")]
    User(String),
}

impl TrymodError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a post-install resolution error
    pub fn load(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            package: package.into(),
            reason: reason.into(),
        }
    }

    /// Whether the REPL can report this error and keep accepting input
    pub fn is_submission_error(&self) -> bool {
        matches!(
            self,
            Self::EvaluationTimeout { .. } | Self::Compile(_) | Self::Runtime(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PackageNotFound(_) => Some("Check the package name on https://www.npmjs.com"),
            Self::Install { .. } => Some("Run with -v to see the installer output"),
            Self::Load { .. } => Some("Run: trymod --clear, then try again"),
            Self::HostUnavailable(_) => Some("Install Node.js or set [session] node in config.toml"),
            Self::AliasConflict { .. } => Some("Pick distinct aliases with name=alias"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TrymodError::PackageNotFound("left-padd".to_string());
        assert_eq!(err.to_string(), "Could not find package left-padd");
    }

    #[test]
    fn error_hint() {
        let err = TrymodError::load("lodash", "no package.json");
        assert_eq!(err.hint(), Some("Run: trymod --clear, then try again"));
        assert_eq!(TrymodError::HostExited.hint(), None);
    }

    #[test]
    fn submission_errors_are_recoverable() {
        assert!(TrymodError::EvaluationTimeout { millis: 5000 }.is_submission_error());
        assert!(TrymodError::Compile("SyntaxError".into()).is_submission_error());
        assert!(TrymodError::Runtime("ReferenceError".into()).is_submission_error());
        assert!(!TrymodError::HostExited.is_submission_error());
        assert!(!TrymodError::PackageNotFound("x".into()).is_submission_error());
    }
}
