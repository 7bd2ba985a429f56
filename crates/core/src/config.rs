//! Project Settings
//!
//! The `crossndk.toml` model:
//! - `[android]`: NDK location, minimum SDK and host variants
//! - `[cargo]`: module, library, targets, profile and feature selection
//! - `[cargo.variants.<name>]`: per-variant overrides

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::features::{FeatureSelection, VariantOverride};

/// Settings file name looked up in the project directory
pub const SETTINGS_FILE: &str = "crossndk.toml";

/// Host application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AndroidSettings {
    /// Path to the Android NDK
    #[serde(default)]
    pub ndk_dir: Option<PathBuf>,
    /// Minimum SDK version of the host application
    #[serde(default = "default_min_sdk")]
    pub min_sdk: u32,
    /// Build variants of the host application
    #[serde(default = "default_variants")]
    pub variants: Vec<String>,
    /// Host build directory, relative to the project
    #[serde(default)]
    pub build_dir: Option<PathBuf>,
    /// Root project build directory holding shared outputs
    #[serde(default)]
    pub root_build_dir: Option<PathBuf>,
}

fn default_min_sdk() -> u32 {
    21
}

fn default_variants() -> Vec<String> {
    vec!["debug".to_string(), "release".to_string()]
}

impl Default for AndroidSettings {
    fn default() -> Self {
        Self {
            ndk_dir: None,
            min_sdk: default_min_sdk(),
            variants: default_variants(),
            build_dir: None,
            root_build_dir: None,
        }
    }
}

/// Target platforms as an array or a comma-separated string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetList {
    List(Vec<String>),
    Csv(String),
}

impl TargetList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            TargetList::List(list) => list.iter().map(|s| s.trim().to_string()).collect(),
            TargetList::Csv(csv) => csv
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Native library settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CargoSettings {
    /// Cargo module directory, relative to the project
    pub module: Option<PathBuf>,
    /// Library name
    pub libname: Option<String>,
    /// Requested target platforms
    pub targets: Option<TargetList>,
    /// Release profile name
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Explicit API level (defaults to the host's minimum SDK)
    pub api_level: Option<u32>,
    /// Clamp too-low API levels instead of failing
    #[serde(default)]
    pub force_targets: bool,
    /// Force prebuilt (true) or generated (false) toolchains
    pub prebuilt_toolchains: Option<bool>,
    /// Cargo target directory, relative to the project
    pub target_directory: Option<PathBuf>,
    /// Include patterns for artifact collection
    pub target_includes: Option<Vec<String>>,
    /// Subdirectory for desktop artifacts
    pub desktop_resource_dir: Option<String>,
    /// Pass `--verbose` to cargo
    #[serde(default)]
    pub verbose: bool,
    /// Global feature selection
    pub features: Option<FeatureSelection>,
    /// Per-variant overrides
    #[serde(default)]
    pub variants: BTreeMap<String, VariantOverride>,
}

fn default_profile() -> String {
    "debug".to_string()
}

impl Default for CargoSettings {
    fn default() -> Self {
        Self {
            module: None,
            libname: None,
            targets: None,
            profile: default_profile(),
            api_level: None,
            force_targets: false,
            prebuilt_toolchains: None,
            target_directory: None,
            target_includes: None,
            desktop_resource_dir: None,
            verbose: false,
            features: None,
            variants: BTreeMap::new(),
        }
    }
}

/// Top-level `crossndk.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSettings {
    #[serde(default)]
    pub android: AndroidSettings,
    #[serde(default)]
    pub cargo: CargoSettings,
}

impl ProjectSettings {
    /// Parse settings from TOML text
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| CoreError::TomlParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load `crossndk.toml` from a project directory
    pub async fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(SETTINGS_FILE);
        if !tokio::fs::try_exists(&path).await? {
            return Err(CoreError::Config(format!(
                "{} not found in {:?}",
                SETTINGS_FILE, project_dir
            )));
        }

        debug!("Loading settings from {:?}", path);
        let content = tokio::fs::read_to_string(&path).await?;
        Self::from_toml(&content, &path)
    }
}
