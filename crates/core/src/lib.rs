//! crossndk Core - shared settings and plumbing
//!
//! Settings file and `local.properties` handling, feature selection merge
//! rules, the external-process capability and the progress event bus.

pub mod config;
pub mod error;
pub mod events;
pub mod features;
pub mod process;
pub mod properties;

pub use config::{AndroidSettings, CargoSettings, ProjectSettings, TargetList, SETTINGS_FILE};
pub use error::{CoreError, Result};
pub use events::{Event, EventBus, EventSubscription};
pub use features::{
    group_variants, resolve_variant, FeatureSelection, VariantGrouping, VariantOverride,
    VariantResolution,
};
pub use process::{CommandRunner, CommandSpec, CommandStatus, RecordingRunner, TokioCommandRunner};
pub use properties::{LocalProperties, Settings};

/// crossndk version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
