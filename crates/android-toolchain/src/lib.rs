//! Android Toolchain Management
//!
//! Handles the toolchain side of cross-compiling:
//! - The catalog of supported target platforms
//! - NDK detection and revision parsing
//! - Resolving targets to toolchains and API levels
//! - Provisioning generated standalone toolchains
//! - Compiler environment for cross-compiled builds

pub mod catalog;
pub mod env;
pub mod ndk;
pub mod provisioner;
pub mod resolver;

use std::path::PathBuf;

use crossndk_core::CommandStatus;

pub use catalog::{Toolchain, ToolchainCatalog, ToolchainKind};
pub use env::{toolchain_root, ToolchainPaths};
pub use ndk::{HostPlatform, NdkInstallation, NdkRevision};
pub use provisioner::{ensure_toolchain, ProvisionOutcome, ProvisionRequest, ToolchainProvisioner};
pub use resolver::{ResolvedToolchain, ToolchainResolver, ToolchainStrategy};

/// Toolchain errors
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error(
        "Target {target} is not recognized (recognized targets: {}). Check `local.properties` and `crossndk.toml`",
        .known.join(", ")
    )]
    UnrecognizedTarget { target: String, known: Vec<String> },

    #[error("Can't target {platform} with API level < {min_api_level} ({desired})")]
    ApiLevelTooLow {
        platform: String,
        min_api_level: u32,
        desired: u32,
    },

    #[error("prebuilt toolchains require NDK version 19+ (found major version {ndk_major})")]
    PrebuiltRequiresNdk19 { ndk_major: u32 },

    #[error("Duplicate toolchain for platform {platform} ({kind})")]
    DuplicateToolchain { platform: String, kind: ToolchainKind },

    #[error("NDK not found at {0:?}")]
    NdkNotFound(PathBuf),

    #[error("Target {0} needs an Android NDK, but none is configured")]
    NdkRequired(String),

    #[error("Could not launch toolchain generator `{command}`: {source}")]
    GeneratorLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Toolchain generation for {platform} (API {api_level}) failed with {status}: `{command}`")]
    GeneratorFailed {
        platform: String,
        api_level: u32,
        command: String,
        status: CommandStatus,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolchainError {
    /// Errors detected before any external process runs
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            ToolchainError::GeneratorLaunch { .. }
                | ToolchainError::GeneratorFailed { .. }
                | ToolchainError::Io(_)
        )
    }
}
