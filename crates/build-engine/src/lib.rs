//! Native Build Engine
//!
//! Turns a validated build request into a plan of cargo invocations and
//! artifact copies, then executes it.

pub mod artifacts;
pub mod cargo_build;
pub mod config;
pub mod linker_wrapper;
pub mod plan;
pub mod runner;

pub use artifacts::{collect_artifacts, destination_dir, source_dir, CollectRequest};
pub use cargo_build::{cargo_args, native_build_command};
pub use config::{BuildEnvironment, BuildRequest, Profile, DEFAULT_TARGET_INCLUDES};
pub use plan::{BuildPlan, BuildStep, PlanBuilder, PlannedStep, ResolvedTarget};
pub use runner::{BuildRunner, ExecutionReport, StepOutcome};

use crossndk_core::{CommandStatus, CoreError};
use crossndk_toolchain::ToolchainError;

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error("Invalid include pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Could not launch `{command}`: {source}")]
    CommandLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Native build for {target} failed with {status}: {command}")]
    NativeBuildFailed {
        target: String,
        command: String,
        status: CommandStatus,
    },

    #[error("Build plan contains a cycle at {0}")]
    PlanCycle(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Build failed: {}", .0.join(", "))]
    StepsFailed(Vec<String>),
}

impl BuildError {
    /// Errors reported before anything is executed
    pub fn is_configuration(&self) -> bool {
        match self {
            BuildError::Core(e) => e.is_configuration(),
            BuildError::Toolchain(e) => e.is_configuration(),
            BuildError::InvalidPattern { .. } | BuildError::PlanCycle(_) => true,
            _ => false,
        }
    }
}
