//! Search-path handling and executable lookup.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

/// Matches `%NAME%` placeholders in Windows-style paths.
static ENV_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([^%]*)%").expect("valid env token regex"));

/// Host platform conventions that affect discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    pub fn is_windows(self) -> bool {
        self == Platform::Windows
    }

    /// Suffixes tried, in order, when resolving an executable name.
    pub fn exe_suffixes(self) -> &'static [&'static str] {
        match self {
            Platform::Windows => &["", ".exe", ".cmd", ".bat", ".com"],
            Platform::Unix => &[""],
        }
    }

    /// Separator between entries of the search-path variable.
    pub fn path_separator(self) -> char {
        match self {
            Platform::Windows => ';',
            Platform::Unix => ':',
        }
    }
}

/// Replace `%NAME%` tokens using `lookup`; unknown names are left as-is.
pub fn expand_env_tokens(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    ENV_TOKEN
        .replace_all(input, |caps: &regex::Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Normalize one search-path entry.
///
/// Trims whitespace and surrounding quotes; on Windows also expands
/// `%VAR%` placeholders from the process environment.
pub fn normalize_path(entry: &str, platform: Platform) -> PathBuf {
    let trimmed = entry.trim().trim_matches('"');
    if platform.is_windows() {
        PathBuf::from(expand_env_tokens(trimmed, |name| std::env::var(name).ok()))
    } else {
        PathBuf::from(trimmed)
    }
}

/// Remove duplicates, keeping the first occurrence of each path.
pub fn dedup_paths(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| !p.as_os_str().is_empty())
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// List the immediate files of each existing directory whose file name
/// matches `pattern`. Directories are visited in order; entries within a
/// directory are sorted.
pub fn find_files(pattern: &Regex, dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for dir in dirs.iter().filter(|d| d.is_dir()) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            tracing::debug!("cannot read search directory {}", dir.display());
            continue;
        };
        let mut matches: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| pattern.is_match(n))
            })
            .collect();
        matches.sort();
        found.extend(matches);
    }
    found
}

/// Return the first candidate (after normalization) that is an existing file.
pub fn guess_path<I, S>(candidates: I, platform: Platform) -> Option<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidates
        .into_iter()
        .map(|c| normalize_path(c.as_ref(), platform))
        .find(|p| p.is_file())
}

/// The ordered, de-duplicated set of directories executables are looked up in.
#[derive(Debug, Clone)]
pub struct PathSearch {
    dirs: Vec<PathBuf>,
    platform: Platform,
}

impl PathSearch {
    /// Build from the process `PATH` for the current platform.
    pub fn from_env() -> Self {
        let path = std::env::var_os("PATH").unwrap_or_default();
        Self::from_path_var(&path, Platform::current())
    }

    /// Build from a raw search-path value such as `PATH`.
    pub fn from_path_var(value: &OsStr, platform: Platform) -> Self {
        let value = value.to_string_lossy();
        let dirs = value
            .split(platform.path_separator())
            .map(|entry| normalize_path(entry, platform));
        PathSearch {
            dirs: dedup_paths(dirs),
            platform,
        }
    }

    /// Build from an explicit directory list.
    pub fn from_dirs(dirs: impl IntoIterator<Item = PathBuf>, platform: Platform) -> Self {
        PathSearch {
            dirs: dedup_paths(dirs),
            platform,
        }
    }

    /// Append extra directories after the existing ones.
    pub fn with_extra_dirs(mut self, extra: impl IntoIterator<Item = PathBuf>) -> Self {
        let dirs = std::mem::take(&mut self.dirs).into_iter().chain(extra);
        self.dirs = dedup_paths(dirs);
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Directories in lookup order.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Files on the search path whose names match `pattern`.
    pub fn find_files(&self, pattern: &Regex) -> Vec<PathBuf> {
        find_files(pattern, &self.dirs)
    }

    /// Resolve `base_name` to a full path, trying each platform suffix
    /// against every directory before moving to the next suffix.
    pub fn resolve_executable(&self, base_name: &str) -> Option<PathBuf> {
        self.platform.exe_suffixes().iter().find_map(|suffix| {
            let file_name = format!("{}{}", base_name, suffix);
            self.dirs
                .iter()
                .map(|dir| dir.join(&file_name))
                .find(|candidate| candidate.is_file())
        })
    }
}
