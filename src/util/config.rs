//! Configuration file support.
//!
//! The optional `config.toml` lives next to the kit catalog:
//!
//! ```toml
//! [scan]
//! extra-search-paths = ["/opt/cross/bin"]
//! families = ["gcc", "clang"]
//!
//! [cmake]
//! path = "/opt/cmake/bin/cmake"
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::kits::scanner::{KitFamily, ScanOptions};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub cmake: CMakeConfig,
}

/// Discovery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScanConfig {
    /// Directories searched after `PATH` for every family.
    pub extra_search_paths: Vec<PathBuf>,

    /// Fixed GCC install directories (Windows only).
    pub gcc_locations: Vec<String>,

    /// LLVM install directories searched for clang-cl.
    pub llvm_locations: Vec<String>,

    /// Families to scan.
    pub families: Vec<KitFamily>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let defaults = ScanOptions::default();
        ScanConfig {
            extra_search_paths: Vec::new(),
            gcc_locations: defaults.gcc_locations,
            llvm_locations: defaults.llvm_locations,
            families: defaults.families,
        }
    }
}

impl ScanConfig {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            families: self.families.clone(),
            gcc_locations: self.gcc_locations.clone(),
            llvm_locations: self.llvm_locations.clone(),
        }
    }
}

/// CMake settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CMakeConfig {
    /// Explicit cmake binary; skips discovery.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }
}
