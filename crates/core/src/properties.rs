//! Local Properties
//!
//! `local.properties` parsing and project-local-then-environment lookups.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Result;

/// Property key for the shared toolchain directory
pub const TOOLCHAIN_DIR_PROPERTY: &str = "rust.androidNdkToolchainDir";
/// Environment variable for the shared toolchain directory
pub const TOOLCHAIN_DIR_ENV: &str = "ANDROID_NDK_TOOLCHAIN_DIR";
/// Property key for the native build command
pub const CARGO_COMMAND_PROPERTY: &str = "rust.cargoCommand";
/// Environment variable for the native build command
pub const CARGO_COMMAND_ENV: &str = "CROSSNDK_CARGO_COMMAND";
/// Property key for the toolchain generator interpreter
pub const PYTHON_COMMAND_PROPERTY: &str = "rust.pythonCommand";
/// Environment variable for the toolchain generator interpreter
pub const PYTHON_COMMAND_ENV: &str = "CROSSNDK_PYTHON_COMMAND";

/// Key/value pairs read from a `local.properties` file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalProperties {
    values: HashMap<String, String>,
}

impl LocalProperties {
    /// Parse the `key=value` format; `#` and `!` start comment lines
    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let split = line.find(|c: char| c == '=' || c == ':');
            let (key, value) = match split {
                Some(idx) => (&line[..idx], &line[idx + 1..]),
                None => (line, ""),
            };

            // Windows paths arrive escaped, e.g. `C\:\\Android\\ndk`
            let value = value.trim().replace("\\:", ":").replace("\\\\", "\\");
            values.insert(key.trim().to_string(), value);
        }

        Self { values }
    }

    /// Load from disk; a missing file yields empty properties
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            debug!("No local properties at {:?}", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        debug!("Loaded local properties from {:?}", path);
        Ok(Self::parse(&content))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

/// Project-local settings layered over the process environment
#[derive(Debug, Clone)]
pub struct Settings {
    local: LocalProperties,
    env: HashMap<String, String>,
    temp_dir: PathBuf,
}

impl Settings {
    /// Snapshot the current process environment
    pub fn from_process_env(local: LocalProperties) -> Self {
        Self {
            local,
            env: std::env::vars().collect(),
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Build from explicit values
    pub fn new(local: LocalProperties, env: HashMap<String, String>, temp_dir: PathBuf) -> Self {
        Self { local, env, temp_dir }
    }

    pub fn local(&self) -> &LocalProperties {
        &self.local
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Environment variable, ignoring empty values
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Project-local property first, then the environment; first non-empty wins
    pub fn get(&self, property: &str, env_var: &str) -> Option<&str> {
        self.local
            .get(property)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.env(env_var))
    }

    /// Native build command (`cargo` unless overridden)
    pub fn cargo_command(&self) -> String {
        self.get(CARGO_COMMAND_PROPERTY, CARGO_COMMAND_ENV)
            .unwrap_or("cargo")
            .to_string()
    }

    /// Interpreter running the NDK toolchain generator (`python` unless overridden)
    pub fn python_command(&self) -> String {
        self.get(PYTHON_COMMAND_PROPERTY, PYTHON_COMMAND_ENV)
            .unwrap_or("python")
            .to_string()
    }

    /// Target list override, per-project key first
    pub fn targets_override(&self, project_name: &str) -> Option<Vec<String>> {
        let per_project = format!("rust.targets.{}", project_name);
        self.local
            .get(&per_project)
            .or_else(|| self.local.get("rust.targets"))
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
    }
}
