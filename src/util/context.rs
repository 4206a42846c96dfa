//! Global context for kit operations.
//!
//! Provides centralized access to the per-user config directory, the kit
//! catalog path and the loaded configuration.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use directories::ProjectDirs;

use crate::util::config::Config;
use crate::util::paths::PathSearch;

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "CMAKE_KITS_CONFIG_DIR";

/// File name of the kit catalog.
pub const CATALOG_FILE: &str = "kits-cache-v1.json";

/// File name of the optional configuration.
pub const CONFIG_FILE: &str = "config.toml";

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("", "", "cmake-kits"));

/// Per-user config directory: `$CMAKE_KITS_CONFIG_DIR`, else the platform
/// local config dir, else `<tmp>/cmake-kits/config`.
pub fn default_config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    match PROJECT_DIRS.as_ref() {
        Some(dirs) => dirs.config_local_dir().to_path_buf(),
        None => std::env::temp_dir().join("cmake-kits").join("config"),
    }
}

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    config_dir: PathBuf,
    config: Config,
}

impl GlobalContext {
    /// Context rooted at the default config directory.
    pub fn new() -> Self {
        Self::with_config_dir(default_config_dir())
    }

    /// Context rooted at `config_dir`; `config.toml` there is loaded if
    /// present.
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let config = Config::load_or_default(&config_dir.join(CONFIG_FILE));
        GlobalContext {
            config_dir,
            config,
        }
    }

    /// Replace the loaded configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.config_dir.join(CATALOG_FILE)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `PATH` followed by the configured extra search directories.
    pub fn search_path(&self) -> PathSearch {
        PathSearch::from_env().with_extra_dirs(self.config.scan.extra_search_paths.iter().cloned())
    }
}

impl Default for GlobalContext {
    fn default() -> Self {
        Self::new()
    }
}
