//! Project loading
//!
//! Reads `crossndk.toml` and `local.properties` from a host project and
//! turns them into a build request and its environment.

use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use tracing::{debug, info};

use crossndk_build::{BuildEnvironment, BuildRequest};
use crossndk_core::{LocalProperties, ProjectSettings, Settings};
use crossndk_toolchain::NdkInstallation;

/// Name of the per-machine properties file
pub const LOCAL_PROPERTIES: &str = "local.properties";

/// A host project with its settings loaded
#[derive(Debug, Clone)]
pub struct Project {
    pub dir: PathBuf,
    pub name: String,
    pub settings: ProjectSettings,
    pub local: Settings,
}

impl Project {
    /// Load a project from its directory, using the process environment
    pub async fn load(dir: &Path) -> Result<Self> {
        let local = LocalProperties::load(&dir.join(LOCAL_PROPERTIES))
            .await
            .with_context(|| format!("Failed to read {} in {:?}", LOCAL_PROPERTIES, dir))?;
        Self::load_with(dir, Settings::from_process_env(local)).await
    }

    /// Load a project with explicit local settings
    pub async fn load_with(dir: &Path, local: Settings) -> Result<Self> {
        // `.` and `..` have no file name of their own
        let dir = tokio::fs::canonicalize(dir)
            .await
            .with_context(|| format!("Project directory {:?} not found", dir))?;
        let settings = ProjectSettings::load(&dir).await?;
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string());

        info!("Loaded project {} from {:?}", name, dir);
        Ok(Self {
            dir,
            name,
            settings,
            local,
        })
    }

    /// Validated build request
    pub fn request(&self) -> Result<BuildRequest> {
        Ok(BuildRequest::from_settings(&self.dir, &self.name, &self.settings, &self.local)?)
    }

    /// Locate the NDK and gather host facts
    pub async fn environment(&self) -> Result<BuildEnvironment> {
        let explicit = self.settings.android.ndk_dir.as_ref().map(|d| self.dir.join(d));
        let ndk = NdkInstallation::locate(explicit.as_deref(), &self.local).await?;
        if ndk.is_none() {
            debug!("No NDK configured; only desktop targets can be built");
        }
        Ok(BuildEnvironment::from_settings(&self.local, ndk, &self.dir))
    }
}
