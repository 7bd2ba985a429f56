//! Build Configuration
//!
//! Validated build request and the environment it runs in.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use serde::Serialize;
use tracing::debug;

use crossndk_core::{CoreError, FeatureSelection, ProjectSettings, Settings, VariantOverride};
use crossndk_toolchain::{toolchain_root, HostPlatform, NdkInstallation, ToolchainStrategy};

use crate::BuildError;

/// Include patterns used when none are configured
pub const DEFAULT_TARGET_INCLUDES: &[&str] = &["*.so", "*.dylib", "*.dll"];

/// Cargo release profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    Debug,
    Release,
}

impl Profile {
    /// Cargo accepts `--release` and nothing for dev; any other name is rejected
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name {
            "debug" => Ok(Profile::Debug),
            "release" => Ok(Profile::Release),
            other => Err(CoreError::invalid(
                "profile",
                other,
                "expected `debug` or `release`",
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Debug => "debug",
            Profile::Release => "release",
        }
    }

    pub fn cargo_flag(&self) -> Option<&'static str> {
        match self {
            Profile::Debug => None,
            Profile::Release => Some("--release"),
        }
    }
}

/// A validated request to cross-compile one Cargo module
#[derive(Debug, Clone, Serialize)]
pub struct BuildRequest {
    /// Host project name, used for per-project target overrides
    pub project_name: String,
    pub project_dir: PathBuf,
    /// Cargo module, relative to the project
    pub module: PathBuf,
    pub libname: String,
    /// Requested platforms, de-duplicated in order
    pub targets: Vec<String>,
    pub profile: Profile,
    pub api_level: Option<u32>,
    /// Host application minimum SDK
    pub min_sdk: u32,
    pub force_targets: bool,
    pub strategy: Option<ToolchainStrategy>,
    pub features: Option<FeatureSelection>,
    pub variant_overrides: BTreeMap<String, VariantOverride>,
    pub host_variants: Vec<String>,
    pub build_dir: PathBuf,
    /// Shared outputs such as the linker wrapper
    pub root_build_dir: PathBuf,
    pub target_directory: Option<PathBuf>,
    pub target_includes: Vec<String>,
    pub desktop_resource_dir: Option<String>,
    pub verbose: bool,
}

impl BuildRequest {
    /// Validate settings into a request; all configuration errors surface here
    pub fn from_settings(
        project_dir: &Path,
        project_name: &str,
        settings: &ProjectSettings,
        local: &Settings,
    ) -> Result<Self, BuildError> {
        let cargo = &settings.cargo;
        let android = &settings.android;

        let module = cargo
            .module
            .clone()
            .filter(|m| !m.as_os_str().is_empty())
            .ok_or(CoreError::MissingSetting("module"))?;

        let libname = cargo
            .libname
            .clone()
            .filter(|l| !l.trim().is_empty())
            .ok_or(CoreError::MissingSetting("libname"))?;

        let targets = local
            .targets_override(project_name)
            .or_else(|| cargo.targets.as_ref().map(|t| t.to_vec()))
            .map(dedup)
            .filter(|t| !t.is_empty())
            .ok_or(CoreError::MissingSetting("targets"))?;

        let profile = Profile::parse(&cargo.profile)?;

        let target_includes = match &cargo.target_includes {
            Some(patterns) => patterns.clone(),
            None => DEFAULT_TARGET_INCLUDES.iter().map(|s| s.to_string()).collect(),
        };
        for pattern in &target_includes {
            glob::Pattern::new(pattern).map_err(|source| BuildError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }

        let build_dir = android
            .build_dir
            .as_ref()
            .map(|d| project_dir.join(d))
            .unwrap_or_else(|| project_dir.join("build"));
        let root_build_dir = android
            .root_build_dir
            .as_ref()
            .map(|d| project_dir.join(d))
            .unwrap_or_else(|| build_dir.clone());

        debug!("Targets for {}: {:?}", project_name, targets);

        Ok(Self {
            project_name: project_name.to_string(),
            project_dir: project_dir.to_path_buf(),
            module,
            libname,
            targets,
            profile,
            api_level: cargo.api_level,
            min_sdk: android.min_sdk,
            force_targets: cargo.force_targets,
            strategy: ToolchainStrategy::from_flag(cargo.prebuilt_toolchains),
            features: cargo.features.clone(),
            variant_overrides: cargo.variants.clone(),
            host_variants: android.variants.clone(),
            build_dir,
            root_build_dir,
            target_directory: cargo.target_directory.as_ref().map(|d| project_dir.join(d)),
            target_includes,
            desktop_resource_dir: cargo.desktop_resource_dir.clone(),
            verbose: cargo.verbose,
        })
    }

    /// Explicit API level, else the host's minimum SDK
    pub fn desired_api_level(&self) -> u32 {
        self.api_level.unwrap_or(self.min_sdk)
    }

    /// Working directory of the native build
    pub fn module_dir(&self) -> PathBuf {
        self.project_dir.join(&self.module)
    }

    /// Cargo target directory (`<module>/target` by default)
    pub fn target_dir(&self) -> PathBuf {
        self.target_directory
            .clone()
            .unwrap_or_else(|| self.module_dir().join("target"))
    }

    /// Cargo target directory for one build.
    ///
    /// Dedicated variant builds each get `<target_dir>/<variant>` so that
    /// concurrent builds of one platform never share an output directory.
    pub fn cargo_target_dir(&self, variant: Option<&str>) -> PathBuf {
        match variant {
            Some(variant) => self.target_dir().join(variant),
            None => self.target_dir(),
        }
    }
}

fn dedup(targets: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(targets.len());
    for target in targets {
        if !seen.contains(&target) {
            seen.push(target);
        }
    }
    seen
}

/// Host-side facts the plan is built against
#[derive(Debug, Clone)]
pub struct BuildEnvironment {
    pub ndk: Option<NdkInstallation>,
    /// Shared root for generated toolchains
    pub toolchain_root: PathBuf,
    pub cargo_command: String,
    pub python_command: String,
    pub host: HostPlatform,
}

impl BuildEnvironment {
    pub fn from_settings(settings: &Settings, ndk: Option<NdkInstallation>, project_dir: &Path) -> Self {
        Self {
            ndk,
            toolchain_root: toolchain_root(settings, project_dir),
            cargo_command: settings.cargo_command(),
            python_command: settings.python_command(),
            host: HostPlatform::current(),
        }
    }

    /// NDK major version, 0 without an NDK
    pub fn ndk_major(&self) -> u32 {
        self.ndk.as_ref().map(|n| n.revision().major).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crossndk_core::{LocalProperties, TargetList};

    fn settings_with(targets: &[&str]) -> ProjectSettings {
        let mut settings = ProjectSettings::default();
        settings.cargo.module = Some(PathBuf::from("rust"));
        settings.cargo.libname = Some("native".to_string());
        settings.cargo.targets = Some(TargetList::List(targets.iter().map(|s| s.to_string()).collect()));
        settings.cargo.profile = "debug".to_string();
        settings
    }

    fn local() -> Settings {
        Settings::new(LocalProperties::default(), HashMap::new(), PathBuf::from("/tmp"))
    }

    #[test]
    fn test_profile() {
        assert_eq!(Profile::parse("debug").unwrap().cargo_flag(), None);
        assert_eq!(Profile::parse("release").unwrap().cargo_flag(), Some("--release"));
        assert!(Profile::parse("bench").is_err());
    }

    #[test]
    fn test_defaults() {
        let request = BuildRequest::from_settings(Path::new("/app"), "app", &settings_with(&["arm", "arm", "x86"]), &local()).unwrap();

        assert_eq!(request.targets, vec!["arm", "x86"]);
        assert_eq!(request.desired_api_level(), 21);
        assert_eq!(request.module_dir(), PathBuf::from("/app/rust"));
        assert_eq!(request.target_dir(), PathBuf::from("/app/rust/target"));
        assert_eq!(request.cargo_target_dir(None), PathBuf::from("/app/rust/target"));
        assert_eq!(request.cargo_target_dir(Some("paid")), PathBuf::from("/app/rust/target/paid"));
        assert_eq!(request.build_dir, PathBuf::from("/app/build"));
        assert_eq!(request.root_build_dir, PathBuf::from("/app/build"));
        assert_eq!(request.target_includes, vec!["*.so", "*.dylib", "*.dll"]);
        assert_eq!(request.strategy, None);
    }

    #[test]
    fn test_missing_fields() {
        let mut settings = settings_with(&["arm"]);
        settings.cargo.module = None;
        let err = BuildRequest::from_settings(Path::new("/app"), "app", &settings, &local()).unwrap_err();
        assert_eq!(err.to_string(), "module cannot be empty");

        let mut settings = settings_with(&["arm"]);
        settings.cargo.libname = Some(" ".to_string());
        let err = BuildRequest::from_settings(Path::new("/app"), "app", &settings, &local()).unwrap_err();
        assert_eq!(err.to_string(), "libname cannot be empty");

        let err = BuildRequest::from_settings(Path::new("/app"), "app", &settings_with(&[]), &local()).unwrap_err();
        assert_eq!(err.to_string(), "targets cannot be empty");
    }

    #[test]
    fn test_invalid_profile_and_pattern() {
        let mut settings = settings_with(&["arm"]);
        settings.cargo.profile = "fast".to_string();
        assert!(BuildRequest::from_settings(Path::new("/app"), "app", &settings, &local()).is_err());

        let mut settings = settings_with(&["arm"]);
        settings.cargo.target_includes = Some(vec!["[".to_string()]);
        let err = BuildRequest::from_settings(Path::new("/app"), "app", &settings, &local()).unwrap_err();
        assert!(matches!(err, BuildError::InvalidPattern { .. }));
    }

    #[test]
    fn test_local_targets_override() {
        let mut props = LocalProperties::default();
        props.set("rust.targets.app", "linux-x86-64");
        let local = Settings::new(props, HashMap::new(), PathBuf::from("/tmp"));

        let request = BuildRequest::from_settings(Path::new("/app"), "app", &settings_with(&["arm"]), &local).unwrap();
        assert_eq!(request.targets, vec!["linux-x86-64"]);
    }
}
