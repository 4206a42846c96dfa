//! Kit discovery across all toolchain families.
//!
//! Each family scan is independent. A candidate that fails to probe or
//! activate is dropped with a debug record; nothing here aborts a scan.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::instance::VsInstance;
use super::msvc::EnvironmentBootstrapper;
use super::probe::{CompilerFamily, CompilerProbe};
use super::{arch_token, visual_studio_generator, Arch, GeneratorInfo, KitInfo};
use crate::util::paths::{dedup_paths, find_files, normalize_path, PathSearch};

static CLANG_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^clang(-\d+(\.\d+(\.\d+)?)?)?(\.exe)?$").expect("valid clang name regex")
});
static GCC_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((\w+-)*)gcc(-\d+(\.\d+(\.\d+)?)?)?(\.exe)?$").expect("valid gcc name regex")
});
static CLANG_CL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^clang-cl.*$").expect("valid clang-cl name regex"));

/// Toolchain families, in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KitFamily {
    Msvc,
    Clang,
    Gcc,
    ClangCl,
}

impl KitFamily {
    pub const ALL: [KitFamily; 4] = [
        KitFamily::Msvc,
        KitFamily::Clang,
        KitFamily::Gcc,
        KitFamily::ClangCl,
    ];
}

/// Knobs for a scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub families: Vec<KitFamily>,
    /// Extra GCC directories searched on Windows.
    pub gcc_locations: Vec<String>,
    /// Extra LLVM directories searched for clang-cl.
    pub llvm_locations: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            families: KitFamily::ALL.to_vec(),
            gcc_locations: vec![r"C:\TDM-GCC-64\bin".into(), r"C:\TDM-GCC-32\bin".into()],
            llvm_locations: vec![
                r"%LLVM_ROOT%\bin".into(),
                r"%ProgramW6432%\LLVM\bin".into(),
                r"%ProgramFiles%\LLVM\bin".into(),
                r"%ProgramFiles(x86)%\LLVM\bin".into(),
            ],
        }
    }
}

/// Discovers kits on the host.
pub struct KitScanner {
    search: PathSearch,
    probe: CompilerProbe,
    bootstrapper: EnvironmentBootstrapper,
    options: ScanOptions,
}

impl KitScanner {
    pub fn new(
        search: PathSearch,
        probe: CompilerProbe,
        bootstrapper: EnvironmentBootstrapper,
        options: ScanOptions,
    ) -> Self {
        KitScanner {
            search,
            probe,
            bootstrapper,
            options,
        }
    }

    pub fn bootstrapper(&self) -> &EnvironmentBootstrapper {
        &self.bootstrapper
    }

    fn enabled(&self, family: KitFamily) -> bool {
        self.options.families.contains(&family)
    }

    /// Run every enabled family scan and concatenate the results in family
    /// order. Families are scanned in parallel.
    pub fn scan_all(&self) -> Vec<KitInfo> {
        let ((msvc, clang), (gcc, clang_cl)) = rayon::join(
            || rayon::join(|| self.scan_msvc(), || self.scan_clang()),
            || rayon::join(|| self.scan_gcc(), || self.scan_clang_cl()),
        );

        let mut kits: Vec<KitInfo> = msvc
            .into_iter()
            .chain(clang)
            .chain(gcc)
            .chain(clang_cl)
            .collect();
        disambiguate_names(&mut kits);
        tracing::info!("found {} kits", kits.len());
        kits
    }

    fn ninja(&self) -> Option<GeneratorInfo> {
        self.search
            .resolve_executable("ninja")
            .map(|_| GeneratorInfo::ninja())
    }

    /// One kit per installed instance and host/target combination that
    /// activates cleanly.
    pub fn scan_msvc(&self) -> Vec<KitInfo> {
        if !self.enabled(KitFamily::Msvc) || !self.search.platform().is_windows() {
            return Vec::new();
        }

        let mut kits = Vec::new();
        for instance in self.bootstrapper.instances() {
            for host in Arch::HOSTS {
                for target in Arch::TARGETS {
                    if let Err(e) = self.bootstrapper.try_vars_for_instance(instance, host, target) {
                        tracing::debug!("{}", e);
                        continue;
                    }
                    let kit = self.msvc_kit(instance, host, target);
                    tracing::debug!("found {}", kit.name);
                    kits.push(kit);
                }
            }
        }
        kits
    }

    fn msvc_kit(&self, instance: &VsInstance, host: Arch, target: Arch) -> KitInfo {
        let generator = match visual_studio_generator(instance.major_version()) {
            Some(name) => GeneratorInfo {
                name: name.to_string(),
                toolset: Some(format!("host={}", host)),
                platform: Some(target.generator_platform().to_string()),
            },
            None => self.ninja().unwrap_or_else(GeneratorInfo::nmake),
        };

        let mut kit = KitInfo::named(format!(
            "{} - {}",
            instance.display_name,
            arch_token(host, target)
        ));
        kit.instance_id = Some(instance.instance_id.clone());
        kit.host_arch = Some(host);
        kit.target_arch = Some(target);
        kit.preferred_generator = Some(generator);
        kit
    }

    /// Clang drivers that do not target MSVC. MSVC-targeting drivers need
    /// an activated environment and are covered by the clang-cl scan.
    pub fn scan_clang(&self) -> Vec<KitInfo> {
        if !self.enabled(KitFamily::Clang) {
            return Vec::new();
        }

        self.search
            .find_files(&CLANG_NAME)
            .into_iter()
            .filter_map(|clang| {
                let version = self.probe.probe(CompilerFamily::Clang, &clang)?;
                if version.target.contains("msvc") {
                    tracing::debug!("skipping {}: targets MSVC", clang.display());
                    return None;
                }

                let mut kit = KitInfo::named(format!("Clang {} ({})", version.version, version.target));
                kit.compilers = Some(compiler_pair(&clang, "clang", "clang++"));
                tracing::debug!("found {}", kit.name);
                Some(kit)
            })
            .collect()
    }

    /// GCC drivers, including cross-prefixed ones. Drivers reporting an
    /// identical full version line collapse into the first one found.
    pub fn scan_gcc(&self) -> Vec<KitInfo> {
        if !self.enabled(KitFamily::Gcc) {
            return Vec::new();
        }

        let platform = self.search.platform();
        let mut dirs = self.search.search_paths().to_vec();
        if platform.is_windows() {
            dirs.extend(
                self.options
                    .gcc_locations
                    .iter()
                    .map(|l| normalize_path(l, platform)),
            );
        }
        let dirs = dedup_paths(dirs);

        let ninja = self.ninja();
        let mut seen = HashSet::new();
        let mut kits = Vec::new();
        for gcc in find_files(&GCC_NAME, &dirs) {
            let Some(version) = self.probe.probe(CompilerFamily::Gcc, &gcc) else {
                continue;
            };
            if !seen.insert(version.full_version.clone()) {
                tracing::debug!("skipping {}: duplicate of '{}'", gcc.display(), version.full_version);
                continue;
            }

            let mut kit = KitInfo::named(format!("GCC {} ({})", version.version, version.target));
            kit.compilers = Some(compiler_pair(&gcc, "gcc", "g++"));
            kit.preferred_generator = ninja.clone();

            if kit.preferred_generator.is_none()
                && platform.is_windows()
                && version.target.ends_with("-mingw32")
            {
                if let Some(dir) = gcc.parent().filter(|d| d.join("mingw32-make.exe").is_file()) {
                    kit.additional_paths = Some(vec![dir.to_path_buf()]);
                    kit.preferred_generator = Some(GeneratorInfo::mingw_makefiles());
                }
            }

            tracing::debug!("found {}", kit.name);
            kits.push(kit);
        }
        kits
    }

    /// clang-cl drivers paired with every installed instance.
    pub fn scan_clang_cl(&self) -> Vec<KitInfo> {
        if !self.enabled(KitFamily::ClangCl) || !self.search.platform().is_windows() {
            return Vec::new();
        }
        let instances = self.bootstrapper.instances();
        if instances.is_empty() {
            return Vec::new();
        }

        let platform = self.search.platform();
        let dirs = dedup_paths(
            self.search
                .search_paths()
                .iter()
                .cloned()
                .chain(instances.iter().map(VsInstance::bundled_llvm_dir))
                .chain(
                    self.options
                        .llvm_locations
                        .iter()
                        .map(|l| normalize_path(l, platform)),
                ),
        );

        let generator = self.ninja().unwrap_or_else(GeneratorInfo::nmake);
        let mut kits = Vec::new();
        for clang_cl in find_files(&CLANG_CL_NAME, &dirs) {
            let Some(version) = self.probe.probe(CompilerFamily::Clang, &clang_cl) else {
                continue;
            };
            let arch = if version.target.contains("i686-pc") {
                Arch::X86
            } else {
                Arch::X64
            };

            for instance in instances {
                let mut kit = KitInfo::named(format!(
                    "Clang {} for MSVC with {} ({})",
                    version.version, instance.display_name, arch
                ));
                let mut compilers = BTreeMap::new();
                compilers.insert("C".to_string(), clang_cl.clone());
                compilers.insert("CXX".to_string(), clang_cl.clone());
                kit.compilers = Some(compilers);
                kit.instance_id = Some(instance.instance_id.clone());
                kit.host_arch = Some(arch);
                kit.target_arch = Some(arch);
                kit.preferred_generator = Some(generator.clone());
                tracing::debug!("found {}", kit.name);
                kits.push(kit);
            }
        }
        kits
    }
}

/// `C` -> `driver`, plus `CXX` -> the sibling whose file name swaps
/// `c_name` for `cxx_name`, when that sibling exists.
fn compiler_pair(driver: &Path, c_name: &str, cxx_name: &str) -> BTreeMap<String, PathBuf> {
    let mut compilers = BTreeMap::new();
    compilers.insert("C".to_string(), driver.to_path_buf());

    let sibling = driver
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.rfind(c_name).map(|at| format!("{}{}{}", &n[..at], cxx_name, &n[at + c_name.len()..])))
        .map(|name| driver.with_file_name(name));
    if let Some(cxx) = sibling.filter(|p| p.is_file()) {
        compilers.insert("CXX".to_string(), cxx);
    }
    compilers
}

/// Make kit names unique within one scan. Every member of a colliding
/// group gets a suffix: its instance id when it has one, else its C
/// compiler path. Names still colliding after that (several drivers
/// paired with one instance) also get the compiler path.
fn disambiguate_names(kits: &mut [KitInfo]) {
    suffix_collisions(kits, |kit| {
        kit.instance_id
            .clone()
            .or_else(|| compiler_suffix(kit))
    });
    suffix_collisions(kits, compiler_suffix);
}

fn compiler_suffix(kit: &KitInfo) -> Option<String> {
    kit.compiler("C").map(|p| p.display().to_string())
}

fn suffix_collisions(kits: &mut [KitInfo], suffix: impl Fn(&KitInfo) -> Option<String>) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for kit in kits.iter() {
        *counts.entry(kit.name.clone()).or_default() += 1;
    }

    for kit in kits.iter_mut() {
        if counts.get(&kit.name).copied().unwrap_or(0) < 2 {
            continue;
        }
        if let Some(suffix) = suffix(kit) {
            kit.name = format!("{} [{}]", kit.name, suffix);
        }
    }
}
