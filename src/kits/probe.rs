//! Compiler version probing.
//!
//! A compiler is run with `-v` and its diagnostic stream is scraped for
//! the version, target triple and thread model. Clang and GCC print
//! differently-shaped banners, so each family has its own pattern set but
//! they share one invocation path.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::util::paths::Platform;
use crate::util::process::{CommandRunner, ProcessBuilder};

use super::errors::KitError;

static CLANG_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Apple LLVM|Apple clang|clang)\s+version\s+([^\s-]+)[^\r\n]*")
        .expect("valid clang version regex")
});
static GCC_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"gcc\s+version\s+(\S*)\s+[^\r\n]*").expect("valid gcc version regex")
});
static TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Target:\s+([^\r\n]*)").expect("valid target regex"));
static THREAD_MODEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Thread model:\s+([^\r\n]*)").expect("valid thread model regex")
});
static INSTALLED_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"InstalledDir:\s+([^\r\n]*)").expect("valid installed dir regex")
});

/// Banner dialect of a compiler driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerFamily {
    Clang,
    Gcc,
}

/// Fields scraped from a `-v` banner. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionInfo {
    /// The whole matched version line.
    pub full_version: String,
    pub version: String,
    pub target: String,
    pub thread_model: String,
    /// Clang only.
    pub installed_dir: String,
}

impl VersionInfo {
    /// Parse a banner of the given family.
    pub fn parse(family: CompilerFamily, banner: &str) -> Self {
        let version_re = match family {
            CompilerFamily::Clang => &*CLANG_VERSION,
            CompilerFamily::Gcc => &*GCC_VERSION,
        };

        let (full_version, version) = match version_re.captures(banner) {
            Some(caps) => (caps[0].trim_end().to_string(), caps[1].to_string()),
            None => (String::new(), String::new()),
        };

        let installed_dir = match family {
            CompilerFamily::Clang => capture(&INSTALLED_DIR, banner),
            CompilerFamily::Gcc => String::new(),
        };

        VersionInfo {
            full_version,
            version,
            target: capture(&TARGET, banner),
            thread_model: capture(&THREAD_MODEL, banner),
            installed_dir,
        }
    }
}

fn capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .map(|caps| caps[1].trim_end().to_string())
        .unwrap_or_default()
}

/// Runs compilers and parses their banners.
#[derive(Clone)]
pub struct CompilerProbe {
    runner: Arc<dyn CommandRunner>,
    platform: Platform,
}

impl CompilerProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, platform: Platform) -> Self {
        CompilerProbe { runner, platform }
    }

    /// Probe `executable`. Any failure yields `None`.
    pub fn probe(&self, family: CompilerFamily, executable: &Path) -> Option<VersionInfo> {
        match self.try_probe(family, executable) {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        }
    }

    fn try_probe(&self, family: CompilerFamily, executable: &Path) -> Result<VersionInfo, KitError> {
        let cmd = self.version_command(family, executable);
        let output = self.runner.run(&cmd).map_err(|e| KitError::Probe {
            path: executable.to_path_buf(),
            reason: format!("{:#}", e),
        })?;

        if !output.success() {
            return Err(KitError::Probe {
                path: executable.to_path_buf(),
                reason: format!("`-v` exited with {:?}", output.code),
            });
        }

        Ok(VersionInfo::parse(family, &output.stderr_lossy()))
    }

    /// GCC on Windows is wrapped in `cmd /c` to switch the console to UTF-8
    /// first; localized banners are otherwise mangled.
    fn version_command(&self, family: CompilerFamily, executable: &Path) -> ProcessBuilder {
        if family == CompilerFamily::Gcc && self.platform.is_windows() {
            ProcessBuilder::new("cmd.exe")
                .arg("/c")
                .arg(format!("chcp 65001 && \"{}\" -v", executable.display()))
                .no_window()
        } else {
            ProcessBuilder::new(executable).arg("-v").no_window()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeOutput, FakeRunner};

    const CLANG_MSVC_BANNER: &str =
        "clang version 14.0.0\nTarget: x86_64-pc-windows-msvc\nThread model: posix\nInstalledDir: C:\\LLVM\\bin\n";

    const GCC_BANNER: &str = "Using built-in specs.\n\
        COLLECT_GCC=gcc\n\
        Target: x86_64-linux-gnu\n\
        Configured with: ../src/configure -v --with-pkgversion='Ubuntu 11.2.0-19ubuntu1'\n\
        Thread model: posix\n\
        Supported LTO compression algorithms: zlib zstd\n\
        gcc version 11.2.0 (Ubuntu 11.2.0-19ubuntu1) \n";

    #[test]
    fn test_parse_clang_banner() {
        let info = VersionInfo::parse(CompilerFamily::Clang, CLANG_MSVC_BANNER);
        assert_eq!(info.version, "14.0.0");
        assert!(info.target.contains("msvc"));
        assert_eq!(info.thread_model, "posix");
        assert_eq!(info.installed_dir, "C:\\LLVM\\bin");
        assert_eq!(info.full_version, "clang version 14.0.0");
    }

    #[test]
    fn test_parse_apple_clang_banner() {
        let banner = "Apple clang version 15.0.0 (clang-1500.1.0.2.5)\nTarget: arm64-apple-darwin23.2.0\nThread model: posix\n";
        let info = VersionInfo::parse(CompilerFamily::Clang, banner);
        assert_eq!(info.version, "15.0.0");
        assert_eq!(info.target, "arm64-apple-darwin23.2.0");
    }

    #[test]
    fn test_parse_gcc_banner() {
        let info = VersionInfo::parse(CompilerFamily::Gcc, GCC_BANNER);
        assert_eq!(info.version, "11.2.0");
        assert_eq!(info.target, "x86_64-linux-gnu");
        assert_eq!(info.thread_model, "posix");
        assert_eq!(info.full_version, "gcc version 11.2.0 (Ubuntu 11.2.0-19ubuntu1)");
        assert!(info.installed_dir.is_empty());
    }

    #[test]
    fn test_parse_missing_fields_are_empty() {
        let info = VersionInfo::parse(CompilerFamily::Gcc, "gcc version 9.4.0 (GCC)\n");
        assert_eq!(info.version, "9.4.0");
        assert!(info.target.is_empty());
        assert!(info.thread_model.is_empty());

        let empty = VersionInfo::parse(CompilerFamily::Clang, "no banner here");
        assert_eq!(empty, VersionInfo::default());
    }

    #[test]
    fn test_probe_uses_stderr_on_success() {
        let runner = FakeRunner::new();
        runner.expect_contains("/opt/bin/clang", FakeOutput::stderr(0, CLANG_MSVC_BANNER));
        let probe = CompilerProbe::new(Arc::new(runner.clone()), Platform::Unix);

        let info = probe
            .probe(CompilerFamily::Clang, Path::new("/opt/bin/clang"))
            .unwrap();
        assert_eq!(info.version, "14.0.0");
        assert_eq!(runner.calls(), vec!["/opt/bin/clang -v".to_string()]);
    }

    #[test]
    fn test_probe_nonzero_exit_yields_none() {
        let runner = FakeRunner::new();
        runner.expect_contains("gcc", FakeOutput::stderr(1, GCC_BANNER));
        let probe = CompilerProbe::new(Arc::new(runner), Platform::Unix);

        assert!(probe.probe(CompilerFamily::Gcc, Path::new("/usr/bin/gcc")).is_none());
    }

    #[test]
    fn test_probe_spawn_failure_yields_none() {
        let runner = FakeRunner::new();
        let probe = CompilerProbe::new(Arc::new(runner), Platform::Unix);

        assert!(probe.probe(CompilerFamily::Gcc, Path::new("/usr/bin/gcc")).is_none());
    }

    #[test]
    fn test_gcc_probe_switches_code_page_on_windows() {
        let runner = FakeRunner::new();
        runner.expect_contains("chcp 65001", FakeOutput::stderr(0, GCC_BANNER));
        let probe = CompilerProbe::new(Arc::new(runner.clone()), Platform::Windows);

        let info = probe
            .probe(CompilerFamily::Gcc, Path::new(r"C:\mingw\bin\gcc.exe"))
            .unwrap();
        assert_eq!(info.version, "11.2.0");
        assert!(runner.calls()[0].starts_with("cmd.exe /c chcp 65001"));
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_real_process() {
        use crate::test_support::write_fake_compiler;
        use crate::util::process::SystemRunner;

        let tmp = tempfile::TempDir::new().unwrap();
        let gcc = write_fake_compiler(tmp.path(), "gcc", GCC_BANNER);
        let probe = CompilerProbe::new(Arc::new(SystemRunner), Platform::Unix);

        let info = probe.probe(CompilerFamily::Gcc, &gcc).unwrap();
        assert_eq!(info.version, "11.2.0");
        assert_eq!(info.target, "x86_64-linux-gnu");
    }
}
