//! Toolchain Provisioner
//!
//! Generates standalone NDK toolchains on demand. A toolchain directory that
//! already exists is never regenerated.

use std::path::PathBuf;
use serde::Serialize;
use tracing::info;

use crossndk_core::{CommandRunner, CommandSpec};

use crate::env::generated_dir_name;
use crate::ndk::NdkInstallation;
use crate::ToolchainError;

/// A generated toolchain that must exist before dependent builds run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionRequest {
    pub platform: String,
    pub api_level: u32,
    pub install_dir: PathBuf,
    /// Generator invocation used when `install_dir` is missing
    pub command: CommandSpec,
}

/// What provisioning did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    AlreadyPresent,
    Generated,
}

/// Builds provisioning requests for generated toolchains
#[derive(Debug, Clone)]
pub struct ToolchainProvisioner {
    generator_script: PathBuf,
    toolchain_root: PathBuf,
    python_command: String,
}

impl ToolchainProvisioner {
    pub fn new(ndk: &NdkInstallation, toolchain_root: PathBuf, python_command: impl Into<String>) -> Self {
        Self {
            generator_script: ndk.standalone_toolchain_script(),
            toolchain_root,
            python_command: python_command.into(),
        }
    }

    /// Request for `(platform, api_level)`, installed under the shared root
    pub fn request(&self, platform: &str, api_level: u32) -> ProvisionRequest {
        let install_dir = self.toolchain_root.join(generated_dir_name(platform, api_level));
        let command = CommandSpec::new(self.python_command.clone())
            .arg(self.generator_script.to_string_lossy())
            .arg(format!("--arch={}", platform))
            .arg(format!("--api={}", api_level))
            .arg(format!("--install-dir={}", install_dir.to_string_lossy()))
            .arg("--force");

        ProvisionRequest {
            platform: platform.to_string(),
            api_level,
            install_dir,
            command,
        }
    }
}

/// Make sure the requested toolchain exists, generating it if needed
pub async fn ensure_toolchain<R: CommandRunner>(
    request: &ProvisionRequest,
    runner: &R,
) -> Result<ProvisionOutcome, ToolchainError> {
    if tokio::fs::try_exists(&request.install_dir).await? {
        info!(
            "Toolchain for arch {} version {} exists: checked {:?}",
            request.platform, request.api_level, request.install_dir
        );
        return Ok(ProvisionOutcome::AlreadyPresent);
    }

    info!(
        "Toolchain for arch {} version {} does not exist: checked {:?}",
        request.platform, request.api_level, request.install_dir
    );

    let status = runner
        .run(&request.command)
        .await
        .map_err(|source| ToolchainError::GeneratorLaunch {
            command: request.command.to_string(),
            source,
        })?;

    if !status.success() {
        return Err(ToolchainError::GeneratorFailed {
            platform: request.platform.clone(),
            api_level: request.api_level,
            command: request.command.to_string(),
            status,
        });
    }

    Ok(ProvisionOutcome::Generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use crossndk_core::RecordingRunner;

    use crate::ndk::NdkRevision;

    fn provisioner(root: &Path) -> ToolchainProvisioner {
        let ndk = NdkInstallation::new(PathBuf::from("/ndk"), NdkRevision::unknown());
        ToolchainProvisioner::new(&ndk, root.to_path_buf(), "python3")
    }

    #[test]
    fn test_request_command() {
        let p = provisioner(Path::new("/tc"));
        let request = p.request("arm", 16);

        assert_eq!(request.install_dir, PathBuf::from("/tc/arm-16"));
        assert_eq!(request.command.program, "python3");
        assert_eq!(
            request.command.args,
            vec![
                "/ndk/build/tools/make_standalone_toolchain.py",
                "--arch=arm",
                "--api=16",
                "--install-dir=/tc/arm-16",
                "--force",
            ]
        );
    }

    #[tokio::test]
    async fn test_generates_missing_toolchain() {
        let root = tempfile::tempdir().unwrap();
        let request = provisioner(root.path()).request("x86", 19);
        let runner = RecordingRunner::new();

        let outcome = ensure_toolchain(&request, &runner).await.unwrap();
        assert_eq!(outcome, ProvisionOutcome::Generated);
        assert_eq!(runner.calls(), vec![request.command.clone()]);
    }

    #[tokio::test]
    async fn test_existing_toolchain_is_not_regenerated() {
        let root = tempfile::tempdir().unwrap();
        let request = provisioner(root.path()).request("arm64", 21);
        tokio::fs::create_dir_all(&request.install_dir).await.unwrap();
        let runner = RecordingRunner::new();

        assert_eq!(ensure_toolchain(&request, &runner).await.unwrap(), ProvisionOutcome::AlreadyPresent);
        assert_eq!(ensure_toolchain(&request, &runner).await.unwrap(), ProvisionOutcome::AlreadyPresent);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_generator_failure_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let request = provisioner(root.path()).request("x86_64", 21);
        let runner = RecordingRunner::failing_when(|_| true);

        let err = ensure_toolchain(&request, &runner).await.unwrap_err();
        match err {
            ToolchainError::GeneratorFailed { platform, api_level, command, status } => {
                assert_eq!(platform, "x86_64");
                assert_eq!(api_level, 21);
                assert!(command.contains("--arch=x86_64"), "{command}");
                assert!(command.contains("make_standalone_toolchain.py"), "{command}");
                assert_eq!(status.code, Some(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
