//! NDK Installation
//!
//! Locates the Android NDK and reads its revision.

use std::fmt;
use std::path::{Path, PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crossndk_core::Settings;

use crate::ToolchainError;

/// First NDK major release shipping prebuilt clang toolchains
pub const PREBUILT_MIN_NDK_MAJOR: u32 = 19;

static PKG_REVISION: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?m)^\s*Pkg\.Revision\s*=\s*((\d+)[^\s]*)\s*$").ok());

/// Host operating system running the build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Linux,
    MacOs,
    Windows,
}

impl HostPlatform {
    /// Platform of the running process
    pub fn current() -> Self {
        if cfg!(windows) {
            HostPlatform::Windows
        } else if cfg!(target_os = "macos") {
            HostPlatform::MacOs
        } else {
            HostPlatform::Linux
        }
    }

    /// Directory name under `toolchains/llvm/prebuilt`
    pub fn ndk_host_tag(&self) -> &'static str {
        match self {
            HostPlatform::Linux => "linux-x86_64",
            HostPlatform::MacOs => "darwin-x86_64",
            HostPlatform::Windows => "windows-x86_64",
        }
    }

    /// Suffix of the NDK's clang wrapper scripts
    pub fn compiler_suffix(&self) -> &'static str {
        match self {
            HostPlatform::Windows => ".cmd",
            _ => "",
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, HostPlatform::Windows)
    }
}

/// NDK revision from `source.properties`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdkRevision {
    pub major: u32,
    pub full: String,
}

impl NdkRevision {
    /// Revision reported when `source.properties` is absent
    pub fn unknown() -> Self {
        Self {
            major: 0,
            full: "0.0".to_string(),
        }
    }

    /// Parse `Pkg.Revision = 21.3.6528147` out of `source.properties`
    pub fn parse(source_properties: &str) -> Option<Self> {
        let caps = (*PKG_REVISION).as_ref()?.captures(source_properties)?;
        let full = caps.get(1)?.as_str().to_string();
        let major = caps.get(2)?.as_str().parse().ok()?;
        Some(Self { major, full })
    }

    pub fn supports_prebuilt(&self) -> bool {
        self.major >= PREBUILT_MIN_NDK_MAJOR
    }
}

impl fmt::Display for NdkRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

/// An Android NDK on disk
#[derive(Debug, Clone)]
pub struct NdkInstallation {
    root: PathBuf,
    revision: NdkRevision,
}

impl NdkInstallation {
    pub fn new(root: PathBuf, revision: NdkRevision) -> Self {
        Self { root, revision }
    }

    /// Analyze an NDK directory
    pub async fn from_path(root: PathBuf) -> Result<Self, ToolchainError> {
        if !tokio::fs::try_exists(&root).await? {
            return Err(ToolchainError::NdkNotFound(root));
        }

        let source_props = root.join("source.properties");
        let revision = if tokio::fs::try_exists(&source_props).await? {
            let content = tokio::fs::read_to_string(&source_props).await?;
            NdkRevision::parse(&content).unwrap_or_else(NdkRevision::unknown)
        } else {
            debug!("No source.properties in {:?}", root);
            NdkRevision::unknown()
        };

        info!("Using NDK {} at {:?}", revision, root);
        Ok(Self { root, revision })
    }

    /// Find the NDK: explicit setting, `ndk.dir`, then environment variables
    pub async fn locate(
        explicit: Option<&Path>,
        settings: &Settings,
    ) -> Result<Option<Self>, ToolchainError> {
        let candidate = explicit
            .map(Path::to_path_buf)
            .or_else(|| settings.local().get("ndk.dir").map(PathBuf::from))
            .or_else(|| settings.env("ANDROID_NDK_HOME").map(PathBuf::from))
            .or_else(|| settings.env("ANDROID_NDK_ROOT").map(PathBuf::from));

        match candidate {
            Some(path) => Ok(Some(Self::from_path(path).await?)),
            None => Ok(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn revision(&self) -> &NdkRevision {
        &self.revision
    }

    /// Directory of the prebuilt LLVM toolchain for a host
    pub fn prebuilt_toolchain_dir(&self, host: HostPlatform) -> PathBuf {
        self.root
            .join("toolchains")
            .join("llvm")
            .join("prebuilt")
            .join(host.ndk_host_tag())
    }

    /// The standalone toolchain generator script
    pub fn standalone_toolchain_script(&self) -> PathBuf {
        self.root
            .join("build")
            .join("tools")
            .join("make_standalone_toolchain.py")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crossndk_core::LocalProperties;

    #[test]
    fn test_parse_revision() {
        let rev = NdkRevision::parse("Pkg.Desc = Android NDK\nPkg.Revision = 21.3.6528147\n").unwrap();
        assert_eq!(rev.major, 21);
        assert_eq!(rev.full, "21.3.6528147");
        assert!(rev.supports_prebuilt());

        let old = NdkRevision::parse("Pkg.Revision=18.1.5063045").unwrap();
        assert_eq!(old.major, 18);
        assert!(!old.supports_prebuilt());

        assert!(NdkRevision::parse("Pkg.Desc = nothing").is_none());
    }

    #[test]
    fn test_host_naming() {
        assert_eq!(HostPlatform::Windows.compiler_suffix(), ".cmd");
        assert_eq!(HostPlatform::Linux.compiler_suffix(), "");
        assert_eq!(HostPlatform::MacOs.ndk_host_tag(), "darwin-x86_64");
    }

    #[tokio::test]
    async fn test_from_path_reads_source_properties() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("source.properties"), "Pkg.Revision = 20.0.5594570\n")
            .await
            .unwrap();

        let ndk = NdkInstallation::from_path(dir.path().to_path_buf()).await.unwrap();
        assert_eq!(ndk.revision().major, 20);
        assert_eq!(
            ndk.prebuilt_toolchain_dir(HostPlatform::Linux),
            dir.path().join("toolchains/llvm/prebuilt/linux-x86_64")
        );
    }

    #[tokio::test]
    async fn test_from_path_without_properties_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let ndk = NdkInstallation::from_path(dir.path().to_path_buf()).await.unwrap();
        assert_eq!(ndk.revision(), &NdkRevision::unknown());
    }

    #[tokio::test]
    async fn test_locate_prefers_explicit_then_local() {
        let explicit = tempfile::tempdir().unwrap();
        let local_dir = tempfile::tempdir().unwrap();
        let mut local = LocalProperties::default();
        local.set("ndk.dir", local_dir.path().to_string_lossy());
        let settings = Settings::new(local, HashMap::new(), std::env::temp_dir());

        let found = NdkInstallation::locate(Some(explicit.path()), &settings).await.unwrap().unwrap();
        assert_eq!(found.root(), explicit.path());

        let found = NdkInstallation::locate(None, &settings).await.unwrap().unwrap();
        assert_eq!(found.root(), local_dir.path());

        let empty = Settings::new(LocalProperties::default(), HashMap::new(), std::env::temp_dir());
        assert!(NdkInstallation::locate(None, &empty).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_ndk_dir_fails() {
        let err = NdkInstallation::from_path(PathBuf::from("/definitely/not/an/ndk")).await.unwrap_err();
        assert!(matches!(err, ToolchainError::NdkNotFound(_)));
    }
}
