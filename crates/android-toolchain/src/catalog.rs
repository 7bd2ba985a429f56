//! Toolchain Catalog
//!
//! Registry of the target platforms crossndk knows how to build for, keyed
//! by (platform, kind).

use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};

use crate::ToolchainError;

/// How a toolchain is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolchainKind {
    /// Ships inside the NDK (r19+)
    AndroidPrebuilt,
    /// Standalone toolchain generated from the NDK on demand
    AndroidGenerated,
    /// The host toolchain
    Desktop,
}

impl ToolchainKind {
    pub fn is_android(&self) -> bool {
        !matches!(self, ToolchainKind::Desktop)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainKind::AndroidPrebuilt => "android-prebuilt",
            ToolchainKind::AndroidGenerated => "android-generated",
            ToolchainKind::Desktop => "desktop",
        }
    }
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A catalog entry for one target platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    /// Logical platform name, e.g. `arm64`
    pub platform: String,
    pub kind: ToolchainKind,
    /// Rust target triple; `None` builds for the host
    pub target_triple: Option<String>,
    /// Prefix of the clang driver
    pub compiler_prefix: String,
    /// Prefix of binutils tools such as `ar`
    pub linker_tool_prefix: String,
    pub min_api_level: u32,
    /// Relative directory artifacts are placed in
    pub output_folder: String,
}

impl Toolchain {
    fn android(
        platform: &str,
        kind: ToolchainKind,
        triple: &str,
        compiler_prefix: &str,
        linker_tool_prefix: &str,
        min_api_level: u32,
        abi: &str,
    ) -> Self {
        Self {
            platform: platform.to_string(),
            kind,
            target_triple: Some(triple.to_string()),
            compiler_prefix: compiler_prefix.to_string(),
            linker_tool_prefix: linker_tool_prefix.to_string(),
            min_api_level,
            output_folder: format!("android/{}", abi),
        }
    }

    fn desktop(platform: &str, folder: &str) -> Self {
        Self {
            platform: platform.to_string(),
            kind: ToolchainKind::Desktop,
            target_triple: None,
            compiler_prefix: String::new(),
            linker_tool_prefix: String::new(),
            min_api_level: 0,
            output_folder: format!("desktop/{}", folder),
        }
    }
}

/// Immutable set of toolchains, at most one per (platform, kind)
#[derive(Debug, Clone)]
pub struct ToolchainCatalog {
    entries: BTreeMap<(String, ToolchainKind), Toolchain>,
}

impl ToolchainCatalog {
    /// Build a catalog, rejecting duplicate (platform, kind) pairs
    pub fn new(toolchains: impl IntoIterator<Item = Toolchain>) -> Result<Self, ToolchainError> {
        let mut entries = BTreeMap::new();
        for toolchain in toolchains {
            let key = (toolchain.platform.clone(), toolchain.kind);
            if entries.contains_key(&key) {
                return Err(ToolchainError::DuplicateToolchain {
                    platform: key.0,
                    kind: key.1,
                });
            }
            entries.insert(key, toolchain);
        }
        Ok(Self { entries })
    }

    /// The fixed catalog of supported platforms
    pub fn builtin() -> Self {
        use ToolchainKind::{AndroidGenerated as Generated, AndroidPrebuilt as Prebuilt};

        let toolchains = vec![
            Toolchain::desktop("linux-x86-64", "linux-x86-64"),
            Toolchain::desktop("darwin", "darwin"),
            Toolchain::desktop("win32-x86-64-msvc", "win32-x86-64"),
            Toolchain::desktop("win32-x86-64-gnu", "win32-x86-64"),
            Toolchain::android("arm", Generated, "armv7-linux-androideabi", "arm-linux-androideabi", "arm-linux-androideabi", 16, "armeabi-v7a"),
            Toolchain::android("arm64", Generated, "aarch64-linux-android", "aarch64-linux-android", "aarch64-linux-android", 21, "arm64-v8a"),
            Toolchain::android("x86", Generated, "i686-linux-android", "i686-linux-android", "i686-linux-android", 16, "x86"),
            Toolchain::android("x86_64", Generated, "x86_64-linux-android", "x86_64-linux-android", "x86_64-linux-android", 21, "x86_64"),
            // Prebuilt clang drivers for 32-bit ARM use the armv7a prefix
            Toolchain::android("arm", Prebuilt, "armv7-linux-androideabi", "armv7a-linux-androideabi", "arm-linux-androideabi", 16, "armeabi-v7a"),
            Toolchain::android("arm64", Prebuilt, "aarch64-linux-android", "aarch64-linux-android", "aarch64-linux-android", 21, "arm64-v8a"),
            Toolchain::android("x86", Prebuilt, "i686-linux-android", "i686-linux-android", "i686-linux-android", 16, "x86"),
            Toolchain::android("x86_64", Prebuilt, "x86_64-linux-android", "x86_64-linux-android", "x86_64-linux-android", 21, "x86_64"),
        ];

        let entries = toolchains
            .into_iter()
            .map(|t| ((t.platform.clone(), t.kind), t))
            .collect();
        Self { entries }
    }

    /// The unique entry for a platform and kind
    pub fn find(&self, platform: &str, kind: ToolchainKind) -> Option<&Toolchain> {
        self.entries.get(&(platform.to_string(), kind))
    }

    /// Every kind-variant of a platform
    pub fn find_all(&self, platform: &str) -> Vec<&Toolchain> {
        self.entries
            .values()
            .filter(|t| t.platform == platform)
            .collect()
    }

    /// Known platform names, sorted and de-duplicated
    pub fn platforms(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().map(|(p, _)| p.clone()).collect();
        names.dedup();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toolchain> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ToolchainCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
