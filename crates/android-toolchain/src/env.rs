//! Toolchain Environment
//!
//! Shared toolchain root resolution and the compiler/archiver/linker
//! environment handed to cross-compiling native builds.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crossndk_core::properties::{TOOLCHAIN_DIR_ENV, TOOLCHAIN_DIR_PROPERTY};
use crossndk_core::Settings;

use crate::catalog::{Toolchain, ToolchainKind};
use crate::ndk::{HostPlatform, NdkInstallation};
use crate::resolver::ResolvedToolchain;
use crate::ToolchainError;

/// Directory name used under the temp dir when nothing else is configured
pub const DEFAULT_TOOLCHAIN_DIR_NAME: &str = "rust-android-ndk-toolchains";

/// Environment variable the linker wrapper reads the real compiler from
pub const LINKER_CC_ENV: &str = "CROSSNDK_LINKER_CC";

/// Shared root for generated toolchains.
///
/// `rust.androidNdkToolchainDir` > `ANDROID_NDK_TOOLCHAIN_DIR` > temp dir.
/// Relative values are taken relative to the project directory.
pub fn toolchain_root(settings: &Settings, project_dir: &Path) -> PathBuf {
    let root = match settings.get(TOOLCHAIN_DIR_PROPERTY, TOOLCHAIN_DIR_ENV) {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            if dir.is_absolute() {
                dir
            } else {
                project_dir.join(dir)
            }
        }
        None => settings.temp_dir().join(DEFAULT_TOOLCHAIN_DIR_NAME),
    };
    debug!("Toolchain root: {:?}", root);
    root
}

/// Directory of a generated standalone toolchain, relative to the root
pub fn generated_dir_name(platform: &str, api_level: u32) -> String {
    format!("{}-{}", platform, api_level)
}

/// Compiler path relative to the toolchain root
pub fn compiler_layout(toolchain: &Toolchain, api_level: u32, host: HostPlatform) -> PathBuf {
    let suffix = host.compiler_suffix();
    match toolchain.kind {
        ToolchainKind::AndroidPrebuilt => {
            Path::new("bin").join(format!("{}{}-clang{}", toolchain.compiler_prefix, api_level, suffix))
        }
        _ => Path::new(&generated_dir_name(&toolchain.platform, api_level))
            .join("bin")
            .join(format!("{}-clang{}", toolchain.compiler_prefix, suffix)),
    }
}

/// Archiver path relative to the toolchain root
pub fn archiver_layout(toolchain: &Toolchain, api_level: u32) -> PathBuf {
    let ar = format!("{}-ar", toolchain.linker_tool_prefix);
    match toolchain.kind {
        ToolchainKind::AndroidPrebuilt => Path::new("bin").join(ar),
        _ => Path::new(&generated_dir_name(&toolchain.platform, api_level))
            .join("bin")
            .join(ar),
    }
}

/// Absolute tool locations for one cross-compiled target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainPaths {
    pub root: PathBuf,
    pub compiler: PathBuf,
    pub archiver: PathBuf,
}

impl ToolchainPaths {
    /// Tool paths for a resolved toolchain; `None` for desktop targets
    pub fn for_target(
        resolved: &ResolvedToolchain,
        ndk: Option<&NdkInstallation>,
        generated_root: &Path,
        host: HostPlatform,
    ) -> Result<Option<Self>, ToolchainError> {
        let toolchain = &resolved.toolchain;
        let root = match toolchain.kind {
            ToolchainKind::Desktop => return Ok(None),
            ToolchainKind::AndroidPrebuilt => ndk
                .ok_or_else(|| ToolchainError::NdkRequired(toolchain.platform.clone()))?
                .prebuilt_toolchain_dir(host),
            ToolchainKind::AndroidGenerated => generated_root.to_path_buf(),
        };

        Ok(Some(Self {
            compiler: root.join(compiler_layout(toolchain, resolved.api_level, host)),
            archiver: root.join(archiver_layout(toolchain, resolved.api_level)),
            root,
        }))
    }

    /// Environment overrides for a cargo build of `triple`.
    ///
    /// The linker is the wrapper script, which execs the same compiler.
    pub fn cross_compile_env(&self, triple: &str, linker_wrapper: &Path) -> BTreeMap<String, String> {
        let lower = triple.replace('-', "_");
        let upper = lower.to_uppercase();
        let compiler = self.compiler.to_string_lossy().to_string();

        let mut env = BTreeMap::new();
        env.insert(format!("CC_{}", lower), compiler.clone());
        env.insert(format!("AR_{}", lower), self.archiver.to_string_lossy().to_string());
        env.insert(
            format!("CARGO_TARGET_{}_LINKER", upper),
            linker_wrapper.to_string_lossy().to_string(),
        );
        env.insert(LINKER_CC_ENV.to_string(), compiler);
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crossndk_core::LocalProperties;

    use crate::catalog::ToolchainCatalog;
    use crate::ndk::NdkRevision;

    fn settings(local: &[(&str, &str)], env: &[(&str, &str)]) -> Settings {
        let mut props = LocalProperties::default();
        for (k, v) in local {
            props.set(*k, *v);
        }
        let env: HashMap<String, String> = env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::new(props, env, PathBuf::from("/tmp"))
    }

    fn resolved(platform: &str, kind: ToolchainKind, api_level: u32) -> ResolvedToolchain {
        let toolchain = ToolchainCatalog::builtin().find(platform, kind).unwrap().clone();
        ResolvedToolchain { toolchain, api_level, clamped: false }
    }

    #[test]
    fn test_root_precedence() {
        let project = Path::new("/work/app");

        let both = settings(&[(TOOLCHAIN_DIR_PROPERTY, "/local/tc")], &[(TOOLCHAIN_DIR_ENV, "/env/tc")]);
        assert_eq!(toolchain_root(&both, project), PathBuf::from("/local/tc"));

        let env_only = settings(&[], &[(TOOLCHAIN_DIR_ENV, "/env/tc")]);
        assert_eq!(toolchain_root(&env_only, project), PathBuf::from("/env/tc"));

        let neither = settings(&[], &[]);
        assert_eq!(toolchain_root(&neither, project), PathBuf::from("/tmp/rust-android-ndk-toolchains"));

        let empty_local = settings(&[(TOOLCHAIN_DIR_PROPERTY, "")], &[(TOOLCHAIN_DIR_ENV, "/env/tc")]);
        assert_eq!(toolchain_root(&empty_local, project), PathBuf::from("/env/tc"));
    }

    #[test]
    fn test_relative_root_uses_project_dir() {
        let s = settings(&[(TOOLCHAIN_DIR_PROPERTY, "ndk-toolchains")], &[]);
        assert_eq!(toolchain_root(&s, Path::new("/work/app")), PathBuf::from("/work/app/ndk-toolchains"));
    }

    #[test]
    fn test_prebuilt_layout() {
        let r = resolved("arm", ToolchainKind::AndroidPrebuilt, 19);
        assert_eq!(
            compiler_layout(&r.toolchain, 19, HostPlatform::Linux),
            PathBuf::from("bin/armv7a-linux-androideabi19-clang")
        );
        assert_eq!(
            compiler_layout(&r.toolchain, 19, HostPlatform::Windows),
            PathBuf::from("bin/armv7a-linux-androideabi19-clang.cmd")
        );
        assert_eq!(archiver_layout(&r.toolchain, 19), PathBuf::from("bin/arm-linux-androideabi-ar"));
    }

    #[test]
    fn test_generated_layout() {
        let r = resolved("arm64", ToolchainKind::AndroidGenerated, 21);
        assert_eq!(
            compiler_layout(&r.toolchain, 21, HostPlatform::Linux),
            PathBuf::from("arm64-21/bin/aarch64-linux-android-clang")
        );
        assert_eq!(archiver_layout(&r.toolchain, 21), PathBuf::from("arm64-21/bin/aarch64-linux-android-ar"));
    }

    #[test]
    fn test_paths_and_env() {
        let ndk = NdkInstallation::new(PathBuf::from("/ndk"), NdkRevision::unknown());
        let r = resolved("arm64", ToolchainKind::AndroidPrebuilt, 23);
        let paths = ToolchainPaths::for_target(&r, Some(&ndk), Path::new("/tc"), HostPlatform::Linux)
            .unwrap()
            .unwrap();

        assert_eq!(paths.root, PathBuf::from("/ndk/toolchains/llvm/prebuilt/linux-x86_64"));
        assert_eq!(
            paths.compiler,
            PathBuf::from("/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/aarch64-linux-android23-clang")
        );

        let env = paths.cross_compile_env("aarch64-linux-android", Path::new("/build/linker-wrapper/linker-wrapper.sh"));
        assert_eq!(env["CC_aarch64_linux_android"], paths.compiler.to_string_lossy());
        assert_eq!(env["AR_aarch64_linux_android"], paths.archiver.to_string_lossy());
        assert_eq!(
            env["CARGO_TARGET_AARCH64_LINUX_ANDROID_LINKER"],
            "/build/linker-wrapper/linker-wrapper.sh"
        );
        assert_eq!(env[LINKER_CC_ENV], env["CC_aarch64_linux_android"]);
    }

    #[test]
    fn test_desktop_has_no_paths() {
        let r = resolved("darwin", ToolchainKind::Desktop, 0);
        assert!(ToolchainPaths::for_target(&r, None, Path::new("/tc"), HostPlatform::MacOs)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_prebuilt_without_ndk_fails() {
        let r = resolved("x86", ToolchainKind::AndroidPrebuilt, 21);
        let err = ToolchainPaths::for_target(&r, None, Path::new("/tc"), HostPlatform::Linux).unwrap_err();
        assert!(matches!(err, ToolchainError::NdkRequired(_)));
    }
}
