//! Installed Visual Studio instances.
//!
//! Enumeration is delegated to `vswhere.exe`, which ships with every
//! Visual Studio installer since 2017 and can also report 2015 and older
//! ("legacy") installs.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::util::paths::{normalize_path, PathSearch, Platform};
use crate::util::process::{CommandRunner, ProcessBuilder};

use super::errors::KitError;

/// Dotted numeric installation version such as `16.11.34601.136`.
#[derive(Debug, Clone, Eq)]
pub struct InstallVersion {
    raw: String,
    parts: Vec<u32>,
}

impl InstallVersion {
    /// Parse a dotted version. Non-numeric components are an error.
    pub fn parse(raw: &str) -> Result<Self, KitError> {
        let parts = raw
            .trim()
            .split('.')
            .map(|p| p.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| KitError::InvalidArgument(format!("bad installation version '{}'", raw)))?;
        Ok(InstallVersion {
            raw: raw.trim().to_string(),
            parts,
        })
    }

    pub fn major(&self) -> u32 {
        self.parts.first().copied().unwrap_or(0)
    }

    /// Whether this version is at least `major.minor`.
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        let minor_part = self.parts.get(1).copied().unwrap_or(0);
        (self.major(), minor_part) >= (major, minor)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialEq for InstallVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for InstallVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InstallVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| {
                let a = self.parts.get(i).copied().unwrap_or(0);
                let b = other.parts.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for InstallVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One installed copy of Visual Studio (or its build tools).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VsInstance {
    pub instance_id: String,
    pub installation_path: PathBuf,
    pub installation_version: InstallVersion,
    pub display_name: String,
    /// Legacy installs do not report completeness and count as complete.
    pub is_complete: bool,
}

impl VsInstance {
    pub fn new(
        instance_id: impl Into<String>,
        installation_path: impl Into<PathBuf>,
        installation_version: &str,
        display_name: impl Into<String>,
    ) -> Result<Self, KitError> {
        Ok(VsInstance {
            instance_id: instance_id.into(),
            installation_path: installation_path.into(),
            installation_version: InstallVersion::parse(installation_version)?,
            display_name: display_name.into(),
            is_complete: true,
        })
    }

    pub fn major_version(&self) -> u32 {
        self.installation_version.major()
    }

    /// `<install>/Common7/Tools`, the directory `VSxx0COMNTOOLS` points at.
    pub fn common_tools_dir(&self) -> PathBuf {
        self.installation_path.join("Common7").join("Tools")
    }

    /// Whether the full IDE (not just build tools) is installed.
    pub fn has_ide(&self) -> bool {
        self.installation_path
            .join("Common7")
            .join("IDE")
            .join("devenv.exe")
            .is_file()
    }

    /// LLVM toolchain bundled with the instance.
    pub fn bundled_llvm_dir(&self) -> PathBuf {
        self.installation_path
            .join("VC")
            .join("Tools")
            .join("Llvm")
            .join("bin")
    }

    /// CMake bundled with the IDE's CMake tools.
    pub fn bundled_cmake(&self) -> PathBuf {
        self.installation_path
            .join("Common7")
            .join("IDE")
            .join("CommonExtensions")
            .join("Microsoft")
            .join("CMake")
            .join("CMake")
            .join("bin")
            .join("cmake.exe")
    }
}

/// Supplies the installed instances for a scan.
pub trait InstanceLocator: Send + Sync {
    fn instances(&self) -> Result<Vec<VsInstance>, KitError>;
}

impl InstanceLocator for Vec<VsInstance> {
    fn instances(&self) -> Result<Vec<VsInstance>, KitError> {
        Ok(self.clone())
    }
}

/// Locator for hosts without Visual Studio.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInstances;

impl InstanceLocator for NoInstances {
    fn instances(&self) -> Result<Vec<VsInstance>, KitError> {
        Ok(Vec::new())
    }
}

/// Raw `vswhere -format json` record.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct VsWhereRecord {
    instance_id: String,
    installation_path: PathBuf,
    installation_version: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    is_complete: Option<bool>,
}

/// Parse `vswhere -format json` output. Records with unparseable versions
/// are skipped.
pub fn parse_vswhere_json(json: &str) -> Result<Vec<VsInstance>, KitError> {
    let records: Vec<VsWhereRecord> = serde_json::from_str(json)
        .map_err(|e| KitError::Locator(format!("invalid vswhere output: {}", e)))?;

    let instances = records
        .into_iter()
        .filter_map(|r| {
            let version = match InstallVersion::parse(&r.installation_version) {
                Ok(v) => v,
                Err(e) => {
                    tracing::debug!("skipping instance {}: {}", r.instance_id, e);
                    return None;
                }
            };
            let display_name = r
                .display_name
                .unwrap_or_else(|| format!("Visual Studio {}", version));
            Some(VsInstance {
                instance_id: r.instance_id,
                installation_path: r.installation_path,
                installation_version: version,
                display_name,
                is_complete: r.is_complete.unwrap_or(true),
            })
        })
        .collect();
    Ok(instances)
}

/// Enumerates instances through `vswhere.exe`.
#[derive(Clone)]
pub struct VsWhere {
    vswhere: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl VsWhere {
    pub fn new(vswhere: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        VsWhere {
            vswhere: vswhere.into(),
            runner,
        }
    }

    /// Find `vswhere.exe` in the installer directory or on the search path.
    pub fn find(search: &PathSearch) -> Option<PathBuf> {
        let standard = normalize_path(
            r"%ProgramFiles(x86)%\Microsoft Visual Studio\Installer\vswhere.exe",
            Platform::Windows,
        );
        if standard.is_file() {
            return Some(standard);
        }
        search.resolve_executable("vswhere")
    }
}

impl InstanceLocator for VsWhere {
    fn instances(&self) -> Result<Vec<VsInstance>, KitError> {
        let cmd = ProcessBuilder::new(&self.vswhere)
            .args(["-all", "-legacy", "-format", "json"])
            .no_window();
        let output = self
            .runner
            .run(&cmd)
            .map_err(|e| KitError::Locator(format!("{:#}", e)))?;
        if !output.success() {
            return Err(KitError::Locator(format!(
                "`{}` exited with {:?}",
                cmd.display_command(),
                output.code
            )));
        }
        parse_vswhere_json(&String::from_utf8_lossy(&output.stdout))
    }
}

/// The locator appropriate for the host: `vswhere` on Windows when it can
/// be found, nothing otherwise.
pub fn default_locator(
    search: &PathSearch,
    runner: Arc<dyn CommandRunner>,
) -> Box<dyn InstanceLocator> {
    if !search.platform().is_windows() {
        return Box::new(NoInstances);
    }
    match VsWhere::find(search) {
        Some(path) => {
            tracing::debug!("using vswhere at {}", path.display());
            Box::new(VsWhere::new(path, runner))
        }
        None => {
            tracing::debug!("vswhere.exe not found, no Visual Studio instances");
            Box::new(NoInstances)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeOutput, FakeRunner};

    const VSWHERE_JSON: &str = r#"[
        {
            "instanceId": "2a7b3c1d",
            "installationPath": "C:\\Program Files\\Microsoft Visual Studio\\2022\\Community",
            "installationVersion": "17.8.34330.188",
            "displayName": "Visual Studio Community 2022",
            "isComplete": true
        },
        {
            "instanceId": "VisualStudio.14.0",
            "installationPath": "C:\\Program Files (x86)\\Microsoft Visual Studio 14.0\\",
            "installationVersion": "14.0"
        }
    ]"#;

    #[test]
    fn test_install_version_ordering() {
        let v14 = InstallVersion::parse("14.0").unwrap();
        let v15_3 = InstallVersion::parse("15.3.26730.3").unwrap();
        let v15_0 = InstallVersion::parse("15.0.26228.4").unwrap();

        assert!(v14 < v15_0);
        assert!(v15_0 < v15_3);
        assert!(v15_3.at_least(15, 3));
        assert!(!v15_0.at_least(15, 3));
        assert_eq!(v15_3.major(), 15);
        assert_eq!(InstallVersion::parse("14").unwrap(), v14);
    }

    #[test]
    fn test_install_version_rejects_garbage() {
        assert!(InstallVersion::parse("seventeen").is_err());
    }

    #[test]
    fn test_parse_vswhere_json_with_legacy() {
        let instances = parse_vswhere_json(VSWHERE_JSON).unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].display_name, "Visual Studio Community 2022");
        assert_eq!(instances[0].major_version(), 17);
        assert_eq!(instances[1].display_name, "Visual Studio 14.0");
        assert!(instances[1].is_complete);
    }

    #[test]
    fn test_vswhere_locator_runs_json_query() {
        let runner = FakeRunner::new();
        runner.expect_contains("-format json", FakeOutput::stdout(0, VSWHERE_JSON));
        let locator = VsWhere::new("vswhere.exe", Arc::new(runner.clone()));

        let instances = locator.instances().unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(
            runner.calls(),
            vec!["vswhere.exe -all -legacy -format json".to_string()]
        );
    }

    #[test]
    fn test_vswhere_failure_is_locator_error() {
        let runner = FakeRunner::new();
        runner.expect_contains("vswhere", FakeOutput::stdout(87, ""));
        let locator = VsWhere::new("vswhere.exe", Arc::new(runner));

        assert!(matches!(locator.instances(), Err(KitError::Locator(_))));
    }

    #[test]
    fn test_default_locator_is_empty_off_windows() {
        let search = PathSearch::from_dirs(Vec::new(), Platform::Unix);
        let locator = default_locator(&search, Arc::new(FakeRunner::new()));
        assert!(locator.instances().unwrap().is_empty());
    }
}
