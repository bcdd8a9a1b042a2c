//! Configuration schema for trymod
//!
//! Configuration is stored at `~/.config/trymod/config.toml`

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Package installer settings
    pub installer: InstallerConfig,

    /// REPL session settings
    pub session: SessionConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

impl GeneralConfig {
    /// Whether log lines should be emitted as JSON
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Package installer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Installer executable
    pub program: String,

    /// Extra arguments appended to every install invocation
    pub extra_args: Vec<String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
            extra_args: vec![],
        }
    }
}

/// REPL session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Node.js executable that hosts the evaluation scope
    pub node: String,

    /// Prompt shown before each submission
    pub prompt: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            node: "node".to_string(),
            prompt: "> ".to_string(),
        }
    }
}
