//! Toolchain Resolver
//!
//! Maps a requested target platform and desired API level onto a concrete
//! catalog toolchain and an effective API level.

use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{Toolchain, ToolchainCatalog, ToolchainKind};
use crate::ndk::PREBUILT_MIN_NDK_MAJOR;
use crate::ToolchainError;

/// Where Android toolchains come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolchainStrategy {
    Prebuilt,
    Generated,
}

impl ToolchainStrategy {
    /// Explicit choice wins; otherwise NDK r19+ selects prebuilt toolchains
    pub fn select(explicit: Option<ToolchainStrategy>, ndk_major: u32) -> Result<Self, ToolchainError> {
        let strategy = explicit.unwrap_or(if ndk_major >= PREBUILT_MIN_NDK_MAJOR {
            ToolchainStrategy::Prebuilt
        } else {
            ToolchainStrategy::Generated
        });

        if strategy == ToolchainStrategy::Prebuilt && ndk_major < PREBUILT_MIN_NDK_MAJOR {
            return Err(ToolchainError::PrebuiltRequiresNdk19 { ndk_major });
        }

        debug!("Toolchain strategy {:?} (NDK major {})", strategy, ndk_major);
        Ok(strategy)
    }

    /// From the `prebuilt_toolchains` setting
    pub fn from_flag(prebuilt: Option<bool>) -> Option<Self> {
        prebuilt.map(|p| {
            if p {
                ToolchainStrategy::Prebuilt
            } else {
                ToolchainStrategy::Generated
            }
        })
    }

    /// Android kind this strategy accepts
    pub fn android_kind(&self) -> ToolchainKind {
        match self {
            ToolchainStrategy::Prebuilt => ToolchainKind::AndroidPrebuilt,
            ToolchainStrategy::Generated => ToolchainKind::AndroidGenerated,
        }
    }
}

/// A toolchain chosen for a target, with its effective API level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedToolchain {
    pub toolchain: Toolchain,
    pub api_level: u32,
    /// Whether the API level was raised to the toolchain minimum
    pub clamped: bool,
}

/// Resolves targets against an injected catalog
#[derive(Debug, Clone, Copy)]
pub struct ToolchainResolver<'a> {
    catalog: &'a ToolchainCatalog,
    strategy: ToolchainStrategy,
    force: bool,
}

impl<'a> ToolchainResolver<'a> {
    pub fn new(catalog: &'a ToolchainCatalog, strategy: ToolchainStrategy, force: bool) -> Self {
        Self {
            catalog,
            strategy,
            force,
        }
    }

    /// Pick the toolchain for `platform` and compute its API level
    pub fn resolve(&self, platform: &str, desired_api_level: u32) -> Result<ResolvedToolchain, ToolchainError> {
        let toolchain = self
            .catalog
            .find(platform, self.strategy.android_kind())
            .or_else(|| self.catalog.find(platform, ToolchainKind::Desktop))
            .ok_or_else(|| ToolchainError::UnrecognizedTarget {
                target: platform.to_string(),
                known: self.catalog.platforms(),
            })?;

        let (api_level, clamped) = self.api_level(toolchain, desired_api_level)?;

        Ok(ResolvedToolchain {
            toolchain: toolchain.clone(),
            api_level,
            clamped,
        })
    }

    /// Resolve every target, failing on the first bad one
    pub fn resolve_all(
        &self,
        platforms: &[String],
        desired_api_level: u32,
    ) -> Result<Vec<ResolvedToolchain>, ToolchainError> {
        platforms
            .iter()
            .map(|p| self.resolve(p, desired_api_level))
            .collect()
    }

    fn api_level(&self, toolchain: &Toolchain, desired: u32) -> Result<(u32, bool), ToolchainError> {
        if desired >= toolchain.min_api_level {
            return Ok((desired, false));
        }

        if !self.force {
            return Err(ToolchainError::ApiLevelTooLow {
                platform: toolchain.platform.clone(),
                min_api_level: toolchain.min_api_level,
                desired,
            });
        }

        warn!(
            "Can't target {} with API level < {} ({}); forcing API level to {}",
            toolchain.platform, toolchain.min_api_level, desired, toolchain.min_api_level
        );
        Ok((toolchain.min_api_level, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_defaults_from_ndk_version() {
        assert_eq!(ToolchainStrategy::select(None, 19).unwrap(), ToolchainStrategy::Prebuilt);
        assert_eq!(ToolchainStrategy::select(None, 18).unwrap(), ToolchainStrategy::Generated);
        assert_eq!(
            ToolchainStrategy::select(Some(ToolchainStrategy::Generated), 21).unwrap(),
            ToolchainStrategy::Generated
        );
    }

    #[test]
    fn test_forced_prebuilt_requires_ndk_19() {
        let err = ToolchainStrategy::select(Some(ToolchainStrategy::Prebuilt), 17).unwrap_err();
        assert!(matches!(err, ToolchainError::PrebuiltRequiresNdk19 { ndk_major: 17 }));
    }

    #[test]
    fn test_arm64_low_api_fails_without_force() {
        let catalog = ToolchainCatalog::builtin();
        let strategy = ToolchainStrategy::select(Some(ToolchainStrategy::Prebuilt), 20).unwrap();
        let resolver = ToolchainResolver::new(&catalog, strategy, false);

        let err = resolver.resolve("arm64", 16).unwrap_err();
        assert!(matches!(
            err,
            ToolchainError::ApiLevelTooLow { min_api_level: 21, desired: 16, .. }
        ));
    }

    #[test]
    fn test_arm64_low_api_clamped_with_force() {
        let catalog = ToolchainCatalog::builtin();
        let resolver = ToolchainResolver::new(&catalog, ToolchainStrategy::Prebuilt, true);

        let resolved = resolver.resolve("arm64", 16).unwrap();
        assert_eq!(resolved.toolchain.kind, ToolchainKind::AndroidPrebuilt);
        assert_eq!(resolved.toolchain.platform, "arm64");
        assert_eq!(resolved.api_level, 21);
        assert!(resolved.clamped);
    }

    #[test]
    fn test_api_level_kept_when_high_enough() {
        let catalog = ToolchainCatalog::builtin();
        let resolver = ToolchainResolver::new(&catalog, ToolchainStrategy::Generated, false);

        for platform in catalog.platforms() {
            let resolved = resolver.resolve(&platform, 26).unwrap();
            assert_eq!(resolved.api_level, 26);
            assert!(resolved.toolchain.min_api_level <= resolved.api_level);
            assert_ne!(resolved.toolchain.kind, ToolchainKind::AndroidPrebuilt);
        }
    }

    #[test]
    fn test_desktop_resolves_under_either_strategy() {
        let catalog = ToolchainCatalog::builtin();
        for strategy in [ToolchainStrategy::Prebuilt, ToolchainStrategy::Generated] {
            let resolver = ToolchainResolver::new(&catalog, strategy, false);
            let resolved = resolver.resolve("linux-x86-64", 16).unwrap();
            assert_eq!(resolved.toolchain.kind, ToolchainKind::Desktop);
            assert_eq!(resolved.api_level, 16);
        }
    }

    #[test]
    fn test_unrecognized_target_lists_sorted_platforms() {
        let catalog = ToolchainCatalog::builtin();
        let resolver = ToolchainResolver::new(&catalog, ToolchainStrategy::Prebuilt, false);

        match resolver.resolve("mips", 21).unwrap_err() {
            ToolchainError::UnrecognizedTarget { target, known } => {
                assert_eq!(target, "mips");
                let mut sorted = known.clone();
                sorted.sort();
                assert_eq!(known, sorted);
                assert_eq!(known, catalog.platforms());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_all_stops_at_first_error() {
        let catalog = ToolchainCatalog::builtin();
        let resolver = ToolchainResolver::new(&catalog, ToolchainStrategy::Prebuilt, false);
        let targets = vec!["x86".to_string(), "nope".to_string()];
        assert!(resolver.resolve_all(&targets, 21).is_err());

        let ok = resolver.resolve_all(&["x86".to_string(), "arm".to_string()], 21).unwrap();
        assert_eq!(ok.len(), 2);
    }
}
