//! Toolchain kits.
//!
//! A kit is a named, ready-to-use compiler configuration: compiler paths,
//! a preferred CMake generator and, for Visual Studio based kits, a
//! reference to the installed instance whose activation script provides
//! the environment.
//!
//! Discovery covers four families, in this order:
//! 1. Visual Studio / MSVC (Windows only)
//! 2. Clang (non-MSVC targets)
//! 3. GCC, including cross-prefixed and MinGW drivers
//! 4. clang-cl paired with each Visual Studio instance (Windows only)

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod cmake;
pub mod errors;
pub mod instance;
pub mod kit;
pub mod msvc;
pub mod probe;
pub mod scanner;

pub use cmake::{BuildOptions, CMakeEnv, ConfigureOptions};
pub use errors::KitError;
pub use instance::{InstallVersion, InstanceLocator, VsInstance};
pub use kit::{CMakeSetting, ConfigureSettings, Kit};
pub use msvc::EnvironmentBootstrapper;
pub use probe::{CompilerFamily, CompilerProbe, VersionInfo};
pub use scanner::KitScanner;

/// Environment variables as a sorted name -> value map.
pub type Environment = BTreeMap<String, String>;

/// Architecture tokens understood by Visual Studio activation scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86,
    X64,
    Arm,
    Arm64,
}

impl Arch {
    /// Host architectures a Visual Studio toolset can run on.
    pub const HOSTS: [Arch; 2] = [Arch::X86, Arch::X64];

    /// Architectures a Visual Studio toolset can target.
    pub const TARGETS: [Arch; 4] = [Arch::X86, Arch::X64, Arch::Arm, Arch::Arm64];

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X64 => "x64",
            Arch::Arm => "arm",
            Arch::Arm64 => "arm64",
        }
    }

    pub fn is_arm(&self) -> bool {
        matches!(self, Arch::Arm | Arch::Arm64)
    }

    /// Value for `CMAKE_GENERATOR_PLATFORM`.
    pub fn generator_platform(&self) -> &'static str {
        match self {
            Arch::X86 => "win32",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activation-script token for a host/target pair: `x64` when they
/// match, `x86_arm64` otherwise.
pub fn arch_token(host: Arch, target: Arch) -> String {
    if host == target {
        host.as_str().to_string()
    } else {
        format!("{}_{}", host, target)
    }
}

/// CMake generator selection, fed verbatim into `CMAKE_GENERATOR*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl GeneratorInfo {
    pub fn named(name: impl Into<String>) -> Self {
        GeneratorInfo {
            name: name.into(),
            toolset: None,
            platform: None,
        }
    }

    pub fn ninja() -> Self {
        Self::named("Ninja")
    }

    pub fn nmake() -> Self {
        Self::named("NMake Makefiles")
    }

    pub fn mingw_makefiles() -> Self {
        Self::named("MinGW Makefiles")
    }
}

/// Visual Studio IDE generator for an installation major version.
pub fn visual_studio_generator(major: u32) -> Option<&'static str> {
    match major {
        10 => Some("Visual Studio 10 2010"),
        11 => Some("Visual Studio 11 2012"),
        12 => Some("Visual Studio 12 2013"),
        14 => Some("Visual Studio 14 2015"),
        15 => Some("Visual Studio 15 2017"),
        16 => Some("Visual Studio 16 2019"),
        17 => Some("Visual Studio 17 2022"),
        _ => None,
    }
}

/// One discovered kit, exactly as stored in the catalog.
///
/// Records are built once during a scan and never mutated. They carry no
/// resolved environment: activation is recomputed every time a kit is
/// used because installs can change between scan and use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitInfo {
    pub name: String,

    /// Installed instance this kit activates through (lookup only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_arch: Option<Arch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_arch: Option<Arch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolchain_file: Option<PathBuf>,

    /// Language role (`C`, `CXX`) -> compiler executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compilers: Option<BTreeMap<String, PathBuf>>,

    /// Directories appended to the search path on activation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_paths: Option<Vec<PathBuf>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_generator: Option<GeneratorInfo>,
}

impl KitInfo {
    /// A kit with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        KitInfo {
            name: name.into(),
            instance_id: None,
            host_arch: None,
            target_arch: None,
            toolchain_file: None,
            compilers: None,
            additional_paths: None,
            preferred_generator: None,
        }
    }

    /// Host/target pair, if this kit is tied to an activation.
    pub fn arch_pair(&self) -> Option<(Arch, Arch)> {
        self.host_arch.zip(self.target_arch)
    }

    /// Compiler used for the given language role.
    pub fn compiler(&self, role: &str) -> Option<&PathBuf> {
        self.compilers.as_ref().and_then(|c| c.get(role))
    }
}

impl fmt::Display for KitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str(&self.name),
        }
    }
}
