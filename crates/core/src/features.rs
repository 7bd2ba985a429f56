//! Feature Selection
//!
//! Cargo feature selection and per-variant overrides.

use std::collections::{BTreeMap, BTreeSet};
use serde::{Deserialize, Serialize};

/// Optional library capabilities compiled into a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSelection {
    /// Every optional capability
    All,
    /// Default capabilities plus the named extras
    DefaultAnd(BTreeSet<String>),
    /// Only the named capabilities, defaults suppressed
    NoDefaultBut(BTreeSet<String>),
}

impl FeatureSelection {
    pub fn default_and<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FeatureSelection::DefaultAnd(features.into_iter().map(Into::into).collect())
    }

    pub fn no_default_but<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FeatureSelection::NoDefaultBut(features.into_iter().map(Into::into).collect())
    }

    /// Render as `cargo build` arguments
    pub fn cargo_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        match self {
            FeatureSelection::All => args.push("--all-features".to_string()),
            FeatureSelection::DefaultAnd(set) => {
                if !set.is_empty() {
                    args.push("--features".to_string());
                    args.push(join(set));
                }
            }
            FeatureSelection::NoDefaultBut(set) => {
                args.push("--no-default-features".to_string());
                if !set.is_empty() {
                    args.push("--features".to_string());
                    args.push(join(set));
                }
            }
        }
        args
    }
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

/// Per-variant override of the global configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOverride {
    /// Whether the variant is built at all (default: true)
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Features replacing the global selection
    #[serde(default)]
    pub features: Option<FeatureSelection>,
}

/// Effective settings of one variant after merging overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantResolution {
    pub enabled: bool,
    pub features: Option<FeatureSelection>,
}

/// Merge a variant override with the global feature selection.
///
/// An override's own feature selection always wins; an override that only
/// sets `enabled` inherits the global selection.
pub fn resolve_variant(
    global: Option<&FeatureSelection>,
    variant_override: Option<&VariantOverride>,
) -> VariantResolution {
    match variant_override {
        None => VariantResolution {
            enabled: true,
            features: global.cloned(),
        },
        Some(o) => VariantResolution {
            enabled: o.enabled.unwrap_or(true),
            features: o.features.as_ref().or(global).cloned(),
        },
    }
}

/// How host variants map onto native builds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantGrouping {
    /// Overridden and enabled variants, each with a dedicated build
    pub dedicated: Vec<(String, VariantResolution)>,
    /// Variants without an override, sharing the default build
    pub default_group: Vec<String>,
    /// Overridden variants that are disabled
    pub disabled: Vec<String>,
}

impl VariantGrouping {
    /// Whether a shared default build is needed
    pub fn needs_default_build(&self) -> bool {
        !self.default_group.is_empty()
    }
}

/// Split host variants into dedicated builds, the default group and skipped ones
pub fn group_variants(
    host_variants: &[String],
    global: Option<&FeatureSelection>,
    overrides: &BTreeMap<String, VariantOverride>,
) -> VariantGrouping {
    let mut grouping = VariantGrouping::default();

    for variant in host_variants {
        match overrides.get(variant) {
            Some(o) => {
                let resolution = resolve_variant(global, Some(o));
                if resolution.enabled {
                    grouping.dedicated.push((variant.clone(), resolution));
                } else {
                    grouping.disabled.push(variant.clone());
                }
            }
            None => grouping.default_group.push(variant.clone()),
        }
    }

    grouping
}
