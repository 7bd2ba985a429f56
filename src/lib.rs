//! crossndk - cross-compile Cargo libraries for Android and desktop hosts
//!
//! Builds a native library once per requested platform and places the
//! results where a host application packages them.
//!
//! ## Architecture
//!
//! - `crossndk-core`: settings, feature selection, process and event plumbing
//! - `crossndk-toolchain`: toolchain catalog, NDK detection, resolution and provisioning
//! - `crossndk-build`: build plans, cargo invocations and artifact placement

#![warn(clippy::all)]

pub mod commands;
pub mod project;

pub use crossndk_build as build;
pub use crossndk_core as core;
pub use crossndk_toolchain as toolchain;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::project::Project;
    pub use crossndk_build::{BuildPlan, BuildRequest, BuildRunner, PlanBuilder};
    pub use crossndk_core::{FeatureSelection, ProjectSettings, Settings};
    pub use crossndk_toolchain::{ToolchainCatalog, ToolchainResolver, ToolchainStrategy};
}
