//! Cargo Build
//!
//! Synthesizes the `cargo build` invocation for one resolved target.

use std::path::Path;
use tracing::debug;

use crossndk_core::{CommandSpec, FeatureSelection};
use crossndk_toolchain::{ResolvedToolchain, ToolchainPaths};

use crate::config::{BuildEnvironment, BuildRequest};
use crate::BuildError;

/// Arguments after the cargo program name
pub fn cargo_args(
    request: &BuildRequest,
    target_triple: Option<&str>,
    features: Option<&FeatureSelection>,
) -> Vec<String> {
    let mut args = vec!["build".to_string()];

    if let Some(flag) = request.profile.cargo_flag() {
        args.push(flag.to_string());
    }

    if let Some(triple) = target_triple {
        args.push(format!("--target={}", triple));
    }

    if let Some(features) = features {
        args.extend(features.cargo_args());
    }

    if request.verbose {
        args.push("--verbose".to_string());
    }

    args
}

/// Environment variable cargo reads its output directory from
pub const CARGO_TARGET_DIR: &str = "CARGO_TARGET_DIR";

/// Full command for building `resolved`.
///
/// Android targets get compiler, archiver and linker overrides; desktop
/// targets build against the host toolchain untouched. A dedicated
/// `variant` build is pointed at its own cargo target directory.
pub fn native_build_command(
    request: &BuildRequest,
    env: &BuildEnvironment,
    resolved: &ResolvedToolchain,
    variant: Option<&str>,
    features: Option<&FeatureSelection>,
    linker_wrapper: &Path,
) -> Result<CommandSpec, BuildError> {
    let toolchain = &resolved.toolchain;
    let triple = toolchain
        .target_triple
        .as_deref()
        .filter(|_| toolchain.kind.is_android());

    let mut command = CommandSpec::new(env.cargo_command.clone())
        .args(cargo_args(request, triple, features))
        .cwd(request.module_dir());

    if variant.is_some() {
        command = command.env(CARGO_TARGET_DIR, request.cargo_target_dir(variant).to_string_lossy());
    }

    if let Some(triple) = triple {
        let paths = ToolchainPaths::for_target(resolved, env.ndk.as_ref(), &env.toolchain_root, env.host)?
            .ok_or_else(|| crossndk_toolchain::ToolchainError::NdkRequired(toolchain.platform.clone()))?;
        for (key, value) in paths.cross_compile_env(triple, linker_wrapper) {
            command = command.env(key, value);
        }
    }

    debug!("Native build for {}: {}", toolchain.platform, command);
    Ok(command)
}
