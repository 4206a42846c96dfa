//! Projecting a kit record into process-start configuration.
//!
//! A [`Kit`] wraps a [`KitInfo`] loaded from the catalog and produces the
//! two things a CMake invocation needs from it: the environment overlay
//! and the ordered list of `-D` cache settings.

use std::fmt;

use super::errors::KitError;
use super::msvc::EnvironmentBootstrapper;
use super::{Environment, KitInfo};
use crate::util::paths::Platform;

/// One CMake cache setting: a value with an optional type (`FILEPATH`,
/// `BOOL`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeSetting {
    pub value: String,
    pub kind: Option<String>,
}

impl CMakeSetting {
    pub fn new(value: impl Into<String>) -> Self {
        CMakeSetting {
            value: value.into(),
            kind: None,
        }
    }

    pub fn typed(value: impl Into<String>, kind: impl Into<String>) -> Self {
        CMakeSetting {
            value: value.into(),
            kind: Some(kind.into()),
        }
    }

    pub fn filepath(value: impl Into<String>) -> Self {
        Self::typed(value, "FILEPATH")
    }

    /// Render as a `-D` argument for `name`.
    pub fn render(&self, name: &str) -> String {
        match &self.kind {
            Some(kind) => format!("-D{}:{}={}", name, kind, self.value),
            None => format!("-D{}={}", name, self.value),
        }
    }

    /// Parse the `NAME[:TYPE]=VALUE` form used on the command line.
    pub fn parse_definition(definition: &str) -> Result<(String, CMakeSetting), KitError> {
        let (key, value) = definition.split_once('=').ok_or_else(|| {
            KitError::InvalidArgument(format!("expected NAME[:TYPE]=VALUE, got '{}'", definition))
        })?;
        let (name, kind) = match key.split_once(':') {
            Some((name, kind)) => (name, Some(kind.to_string())),
            None => (key, None),
        };
        if name.is_empty() {
            return Err(KitError::InvalidArgument(format!(
                "missing setting name in '{}'",
                definition
            )));
        }
        Ok((
            name.to_string(),
            CMakeSetting {
                value: value.to_string(),
                kind,
            },
        ))
    }
}

/// Insertion-ordered CMake settings. Setting a key that already exists
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigureSettings {
    entries: Vec<(String, CMakeSetting)>,
}

impl ConfigureSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, setting: CMakeSetting) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = setting,
            None => self.entries.push((name, setting)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CMakeSetting> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CMakeSetting)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `-D` arguments in order.
    pub fn to_args(&self) -> Vec<String> {
        self.entries.iter().map(|(k, v)| v.render(k)).collect()
    }
}

impl FromIterator<(String, CMakeSetting)> for ConfigureSettings {
    fn from_iter<I: IntoIterator<Item = (String, CMakeSetting)>>(iter: I) -> Self {
        let mut settings = ConfigureSettings::new();
        for (k, v) in iter {
            settings.set(k, v);
        }
        settings
    }
}

/// A catalog record ready to be used.
#[derive(Debug, Clone)]
pub struct Kit {
    info: KitInfo,
}

impl Kit {
    /// Wrap a record. A record without a name is a caller bug.
    pub fn new(info: KitInfo) -> Result<Self, KitError> {
        if info.name.trim().is_empty() {
            return Err(KitError::InvalidArgument("kit name must not be empty".into()));
        }
        Ok(Kit { info })
    }

    pub fn info(&self) -> &KitInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Overlay this kit's environment onto `base`.
    ///
    /// Kits tied to a Visual Studio instance get that instance's activated
    /// environment on top (kit values win). Additional paths not already
    /// on the search path are appended to it.
    pub fn merge_environment(
        &self,
        base: &Environment,
        bootstrapper: &EnvironmentBootstrapper,
        platform: Platform,
    ) -> Environment {
        let mut env = base.clone();

        if let Some((host, target)) = self.info.arch_pair() {
            let activated = bootstrapper.vars_for_kit(self.info.instance_id.as_deref(), host, target);
            if activated.is_empty() {
                tracing::warn!("kit '{}' has no usable environment", self.info.name);
            }
            for (key, value) in activated {
                set_var(&mut env, key, value, platform);
            }
        }

        if let Some(extra) = &self.info.additional_paths {
            let key = path_key(&env, platform);
            let sep = platform.path_separator();
            let mut value = env.get(&key).cloned().unwrap_or_default();
            for dir in extra {
                let dir = dir.display().to_string();
                if value.split(sep).any(|entry| same_entry(entry, &dir, platform)) {
                    continue;
                }
                if !value.is_empty() && !value.ends_with(sep) {
                    value.push(sep);
                }
                value.push_str(&dir);
            }
            env.insert(key, value);
        }

        env
    }

    /// CMake settings for a configure run, in precedence order: generator,
    /// compilers, toolchain file, then `user` (which wins on collisions).
    pub fn configure_settings(&self, user: &ConfigureSettings) -> ConfigureSettings {
        let mut settings = ConfigureSettings::new();

        if let Some(generator) = &self.info.preferred_generator {
            settings.set("CMAKE_GENERATOR", CMakeSetting::new(&generator.name));
            if let Some(toolset) = &generator.toolset {
                settings.set("CMAKE_GENERATOR_TOOLSET", CMakeSetting::new(toolset));
            }
            if let Some(platform) = &generator.platform {
                settings.set("CMAKE_GENERATOR_PLATFORM", CMakeSetting::new(platform));
            }
        }

        if let Some(compilers) = &self.info.compilers {
            for (role, path) in compilers {
                settings.set(
                    format!("CMAKE_{}_COMPILER", role),
                    CMakeSetting::filepath(path.display().to_string()),
                );
            }
        }

        if let Some(toolchain) = &self.info.toolchain_file {
            settings.set(
                "CMAKE_TOOLCHAIN_FILE",
                CMakeSetting::filepath(toolchain.display().to_string()),
            );
        }

        for (name, setting) in user.iter() {
            settings.set(name, setting.clone());
        }
        settings
    }
}

impl fmt::Display for Kit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info.name)
    }
}

/// Windows variable names are case-insensitive: overwrite an existing
/// spelling instead of adding a second key.
fn set_var(env: &mut Environment, key: String, value: String, platform: Platform) {
    if platform.is_windows() {
        if let Some(existing) = env.keys().find(|k| k.eq_ignore_ascii_case(&key)).cloned() {
            env.insert(existing, value);
            return;
        }
    }
    env.insert(key, value);
}

fn path_key(env: &Environment, platform: Platform) -> String {
    if platform.is_windows() {
        if env.contains_key("Path") {
            return "Path".to_string();
        }
        if let Some(existing) = env.keys().find(|k| k.eq_ignore_ascii_case("PATH")) {
            return existing.clone();
        }
    }
    "PATH".to_string()
}

fn same_entry(a: &str, b: &str, platform: Platform) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if platform.is_windows() {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}
