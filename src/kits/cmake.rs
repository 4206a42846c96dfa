//! The CMake binary and the configure/build invocations.
//!
//! [`CMakeEnv`] is located once and passed by reference to whoever needs
//! it. Invocations inherit stdio and hand CMake's exit code back untouched.

use std::path::{Path, PathBuf};

use super::errors::KitError;
use super::instance::VsInstance;
use super::kit::{ConfigureSettings, Kit};
use super::Environment;
use crate::util::paths::{guess_path, PathSearch};
use crate::util::process::ProcessBuilder;

/// Well-known Windows install locations, in lookup order.
const WINDOWS_CMAKE_LOCATIONS: &[&str] = &[
    r"%ProgramW6432%\CMake\bin\cmake.exe",
    r"%ProgramFiles%\CMake\bin\cmake.exe",
    r"%ProgramFiles(x86)%\CMake\bin\cmake.exe",
];

/// Options for a configure run.
#[derive(Debug, Clone)]
pub struct ConfigureOptions {
    /// Settings that override everything the kit provides.
    pub user_settings: ConfigureSettings,
    /// Pass `--no-warn-unused-cli`; kits set compiler variables that a
    /// project may never read.
    pub no_warn_unused_cli: bool,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        ConfigureOptions {
            user_settings: ConfigureSettings::new(),
            no_warn_unused_cli: true,
        }
    }
}

/// Options for a build run.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub targets: Vec<String>,
    pub config: Option<String>,
    pub clean_first: bool,
}

/// A located CMake executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeEnv {
    cmake: PathBuf,
}

impl CMakeEnv {
    /// Use `cmake` as the CMake binary. It must be an existing file.
    pub fn new(cmake: impl Into<PathBuf>) -> Result<Self, KitError> {
        let cmake = cmake.into();
        if !cmake.is_file() {
            return Err(KitError::InvalidArgument(format!(
                "cmake executable `{}` does not exist",
                cmake.display()
            )));
        }
        Ok(CMakeEnv { cmake })
    }

    /// Locate CMake: an explicit override, then the search path, then the
    /// standard Windows install directories, then a copy bundled with an
    /// installed Visual Studio.
    pub fn locate(
        search: &PathSearch,
        instances: &[VsInstance],
        explicit: Option<&Path>,
    ) -> Result<Self, KitError> {
        if let Some(path) = explicit {
            return Self::new(path);
        }

        if let Some(path) = search.resolve_executable("cmake") {
            tracing::debug!("cmake found on search path: {}", path.display());
            return Self::new(path);
        }

        let platform = search.platform();
        if platform.is_windows() {
            if let Some(path) = guess_path(WINDOWS_CMAKE_LOCATIONS.iter().copied(), platform) {
                tracing::debug!("cmake found at {}", path.display());
                return Self::new(path);
            }
            if let Some(path) = instances.iter().map(VsInstance::bundled_cmake).find(|p| p.is_file()) {
                tracing::debug!("using cmake bundled with Visual Studio: {}", path.display());
                return Self::new(path);
            }
        }

        Err(KitError::Invocation {
            program: "cmake".to_string(),
            reason: "not found on the search path or in any known location".to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.cmake
    }

    /// `cmake -S <src> -B <build> [--no-warn-unused-cli] -D...`
    pub fn configure_command(
        &self,
        kit: &Kit,
        env: &Environment,
        source_dir: &Path,
        build_dir: &Path,
        options: &ConfigureOptions,
    ) -> Result<ProcessBuilder, KitError> {
        let mut cmd = ProcessBuilder::new(&self.cmake)
            .arg("-S")
            .arg(absolute(source_dir)?)
            .arg("-B")
            .arg(absolute(build_dir)?);
        if options.no_warn_unused_cli {
            cmd = cmd.arg("--no-warn-unused-cli");
        }
        cmd = cmd.args(kit.configure_settings(&options.user_settings).to_args());
        Ok(cmd.env_replace(env))
    }

    /// `cmake --build <build> [--target t...] [--config c] [--clean-first]`
    pub fn build_command(
        &self,
        env: &Environment,
        build_dir: &Path,
        options: &BuildOptions,
    ) -> Result<ProcessBuilder, KitError> {
        let mut cmd = ProcessBuilder::new(&self.cmake)
            .arg("--build")
            .arg(absolute(build_dir)?);
        if !options.targets.is_empty() {
            cmd = cmd.arg("--target").args(&options.targets);
        }
        if let Some(config) = &options.config {
            cmd = cmd.arg("--config").arg(config);
        }
        if options.clean_first {
            cmd = cmd.arg("--clean-first");
        }
        Ok(cmd.env_replace(env))
    }

    /// Run a configure and return CMake's exit code.
    pub fn configure(
        &self,
        kit: &Kit,
        env: &Environment,
        source_dir: &Path,
        build_dir: &Path,
        options: &ConfigureOptions,
    ) -> Result<i32, KitError> {
        tracing::info!("configuring {} with kit '{}'", source_dir.display(), kit);
        let cmd = self.configure_command(kit, env, source_dir, build_dir, options)?;
        run_for_exit_code(&cmd)
    }

    /// Run a build and return CMake's exit code.
    pub fn build(&self, env: &Environment, build_dir: &Path, options: &BuildOptions) -> Result<i32, KitError> {
        tracing::info!("building {}", build_dir.display());
        let cmd = self.build_command(env, build_dir, options)?;
        run_for_exit_code(&cmd)
    }
}

fn absolute(path: &Path) -> Result<PathBuf, KitError> {
    Ok(std::path::absolute(path)?)
}

/// A child killed by a signal has no exit code; report -1.
fn run_for_exit_code(cmd: &ProcessBuilder) -> Result<i32, KitError> {
    tracing::debug!("running `{}`", cmd.display_command());
    let status = cmd.status().map_err(|e| KitError::Invocation {
        program: cmd.get_program().display().to_string(),
        reason: format!("{:#}", e),
    })?;
    Ok(status.code().unwrap_or(-1))
}
