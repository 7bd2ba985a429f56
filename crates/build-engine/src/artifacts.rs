//! Artifact Placement
//!
//! Maps a resolved toolchain onto cargo's output directory and the host
//! application's library/resource directories, and copies matching files.

use std::path::{Path, PathBuf};
use glob::Pattern;
use serde::Serialize;
use tracing::{debug, info, warn};

use crossndk_toolchain::{Toolchain, ToolchainKind};

use crate::config::Profile;
use crate::BuildError;

/// Cargo's per-target output directory: `<target_dir>/[<triple>/]<profile>`
pub fn source_dir(target_dir: &Path, toolchain: &Toolchain, profile: Profile) -> PathBuf {
    match toolchain.target_triple {
        Some(ref triple) => target_dir.join(triple).join(profile.as_str()),
        None => target_dir.join(profile.as_str()),
    }
}

/// Final location of a target's libraries.
///
/// Android: `<build>/rustJniLibs/<variant>/<output_folder>`.
/// Desktop: `<build>/rustResources/<variant>/<desktop_dir | output_folder>`.
pub fn destination_dir(
    build_dir: &Path,
    variant: Option<&str>,
    toolchain: &Toolchain,
    desktop_resource_dir: Option<&str>,
) -> PathBuf {
    let (base, folder) = match toolchain.kind {
        ToolchainKind::Desktop => (
            "rustResources",
            desktop_resource_dir.unwrap_or(toolchain.output_folder.as_str()),
        ),
        _ => ("rustJniLibs", toolchain.output_folder.as_str()),
    };

    let mut dir = build_dir.join(base);
    if let Some(variant) = variant {
        dir.push(variant);
    }
    dir.join(folder)
}

/// Copy instruction for one (variant, target)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectRequest {
    pub from: PathBuf,
    pub into: PathBuf,
    pub includes: Vec<String>,
}

/// Copy top-level files of `from` matching any include pattern into `into`
pub async fn collect_artifacts(request: &CollectRequest) -> Result<Vec<PathBuf>, BuildError> {
    let patterns = request
        .includes
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|source| BuildError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if !tokio::fs::try_exists(&request.from).await? {
        warn!("No build output at {:?}; nothing to collect", request.from);
        return Ok(Vec::new());
    }

    tokio::fs::create_dir_all(&request.into).await?;

    let mut copied = Vec::new();
    let mut entries = tokio::fs::read_dir(&request.from).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !patterns.iter().any(|p| p.matches(&name)) {
            continue;
        }

        let dest = request.into.join(name.as_ref());
        tokio::fs::copy(entry.path(), &dest).await?;
        debug!("Copied {:?} -> {:?}", entry.path(), dest);
        copied.push(dest);
    }

    copied.sort();
    info!("Collected {} artifact(s) into {:?}", copied.len(), request.into);
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossndk_toolchain::ToolchainCatalog;

    fn toolchain(platform: &str, kind: ToolchainKind) -> Toolchain {
        ToolchainCatalog::builtin().find(platform, kind).unwrap().clone()
    }

    #[test]
    fn test_source_dir() {
        let target = Path::new("/m/target");
        assert_eq!(
            source_dir(target, &toolchain("arm64", ToolchainKind::AndroidPrebuilt), Profile::Release),
            PathBuf::from("/m/target/aarch64-linux-android/release")
        );
        assert_eq!(
            source_dir(target, &toolchain("linux-x86-64", ToolchainKind::Desktop), Profile::Debug),
            PathBuf::from("/m/target/debug")
        );
    }

    #[test]
    fn test_destination_dir() {
        let build = Path::new("/p/build");
        let arm = toolchain("arm", ToolchainKind::AndroidGenerated);
        let linux = toolchain("linux-x86-64", ToolchainKind::Desktop);

        assert_eq!(
            destination_dir(build, None, &arm, None),
            PathBuf::from("/p/build/rustJniLibs/android/armeabi-v7a")
        );
        assert_eq!(
            destination_dir(build, Some("paid"), &arm, Some("ignored")),
            PathBuf::from("/p/build/rustJniLibs/paid/android/armeabi-v7a")
        );
        assert_eq!(
            destination_dir(build, None, &linux, None),
            PathBuf::from("/p/build/rustResources/desktop/linux-x86-64")
        );
        assert_eq!(
            destination_dir(build, Some("free"), &linux, Some("natives")),
            PathBuf::from("/p/build/rustResources/free/natives")
        );
    }

    #[tokio::test]
    async fn test_collect_only_matching_files() {
        let from = tempfile::tempdir().unwrap();
        let into = tempfile::tempdir().unwrap();
        for name in ["libnative.so", "libnative.d", "libnative.rlib"] {
            tokio::fs::write(from.path().join(name), b"x").await.unwrap();
        }
        tokio::fs::create_dir(from.path().join("deps.so")).await.unwrap();

        let request = CollectRequest {
            from: from.path().to_path_buf(),
            into: into.path().join("android/x86"),
            includes: vec!["*.so".to_string()],
        };
        let copied = collect_artifacts(&request).await.unwrap();

        assert_eq!(copied, vec![into.path().join("android/x86/libnative.so")]);
        assert!(!into.path().join("android/x86/libnative.d").exists());
    }

    #[tokio::test]
    async fn test_collect_missing_source_is_empty() {
        let into = tempfile::tempdir().unwrap();
        let request = CollectRequest {
            from: into.path().join("missing"),
            into: into.path().join("out"),
            includes: vec!["*.so".to_string()],
        };
        assert!(collect_artifacts(&request).await.unwrap().is_empty());
    }
}
