//! Visual Studio environment bootstrapping.
//!
//! MSVC needs the environment its vendor activation script (`vcvarsall.bat`
//! and friends) sets up. We replicate it by writing a throwaway driver
//! script that calls the vendor script, dumps an allow-list of variables to
//! a file, and then reading that file back.
//!
//! Locating the vendor script depends on the installation era, so it is an
//! ordered list of [`ActivationStrategy`]s; the first one that finds a
//! script wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::util::process::{CommandRunner, ProcessBuilder};

use super::errors::KitError;
use super::instance::VsInstance;
use super::{arch_token, Arch, Environment};

/// Variables captured from an activated MSVC shell.
pub const MSVC_ENV_VARS: &[&str] = &[
    "CL",
    "_CL_",
    "INCLUDE",
    "LIBPATH",
    "LINK",
    "_LINK_",
    "LIB",
    "PATH",
    "TMP",
    "FRAMEWORKDIR",
    "FRAMEWORKDIR64",
    "FRAMEWORKVERSION",
    "FRAMEWORKVERSION64",
    "UCRTCONTEXTROOT",
    "UCRTVERSION",
    "UNIVERSALCRTSDKDIR",
    "VCINSTALLDIR",
    "VCTARGETSPATH",
    "WINDOWSLIBPATH",
    "WINDOWSSDKDIR",
    "WINDOWSSDKLIBVERSION",
    "WINDOWSSDKVERSION",
    "VISUALSTUDIOVERSION",
];

/// Compiler driver MSVC kits use for every language role.
pub const MSVC_COMPILER: &str = "cl.exe";

/// First major version that ships the consolidated `VC\Auxiliary\Build` layout.
const CONSOLIDATED_MAJOR: u32 = 15;

const DRIVER_FILE: &str = "activate.bat";
const DUMP_FILE: &str = "vars.env";

/// A vendor activation script and the arguments to call it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationScript {
    pub script: PathBuf,
    pub args: String,
}

impl ActivationScript {
    fn new(script: PathBuf, args: impl Into<String>) -> Self {
        ActivationScript {
            script,
            args: args.into(),
        }
    }
}

/// Input to a strategy: which instance and architecture to activate, and
/// every other installed instance in case one of them has to be borrowed.
#[derive(Debug, Clone, Copy)]
pub struct ActivationContext<'a> {
    pub instance: &'a VsInstance,
    pub host: Arch,
    pub target: Arch,
    pub installed: &'a [VsInstance],
}

impl ActivationContext<'_> {
    /// `x64`, `x86_arm64`, ...
    pub fn token(&self) -> String {
        arch_token(self.host, self.target)
    }

    /// The token spelled the way older script names spell it (`amd64`).
    pub fn amd64_token(&self) -> String {
        self.token().replace("x64", "amd64")
    }

    fn involves_arm(&self) -> bool {
        self.host.is_arm() || self.target.is_arm()
    }

    fn is_legacy(&self) -> bool {
        self.instance.major_version() < CONSOLIDATED_MAJOR
    }

    fn script_dir(&self) -> PathBuf {
        let vc = self.instance.installation_path.join("VC");
        if self.is_legacy() {
            vc
        } else {
            vc.join("Auxiliary").join("Build")
        }
    }
}

/// Outcome of one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ActivationScript),
    /// Not applicable or not found; try the next strategy.
    Next,
    /// The combination is definitely unavailable; stop.
    Unavailable(String),
}

/// One way of locating an activation script.
pub trait ActivationStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, ctx: &ActivationContext<'_>) -> Resolution;
}

/// Pre-2017 build-tools-only installs cannot activate themselves reliably.
/// Borrow the `vcvarsall.bat` of a newer (15.3+) instance and pin the old
/// toolset with `-vcvars_ver`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyToolsetPin;

impl ActivationStrategy for LegacyToolsetPin {
    fn name(&self) -> &'static str {
        "legacy-toolset-pin"
    }

    fn resolve(&self, ctx: &ActivationContext<'_>) -> Resolution {
        if !ctx.is_legacy() || ctx.instance.has_ide() {
            return Resolution::Next;
        }

        let Some(newer) = ctx
            .installed
            .iter()
            .find(|i| i.is_complete && i.installation_version.at_least(15, 3))
        else {
            return Resolution::Unavailable("no 15.3+ instance to borrow vcvarsall.bat from".into());
        };

        let vcvarsall = newer
            .installation_path
            .join("VC")
            .join("Auxiliary")
            .join("Build")
            .join("vcvarsall.bat");
        let supports_pin = std::fs::read_to_string(&vcvarsall)
            .map(|text| text.contains("vcvars_ver"))
            .unwrap_or(false);
        if !supports_pin {
            return Resolution::Unavailable(format!(
                "{} does not support -vcvars_ver",
                vcvarsall.display()
            ));
        }

        let amd64 = ctx.amd64_token();
        let arm_bin = ctx.instance.installation_path.join("VC").join("bin").join(&amd64);
        if ctx.involves_arm() && !arm_bin.is_dir() {
            return Resolution::Next;
        }

        Resolution::Found(ActivationScript::new(
            vcvarsall,
            format!("{} -vcvars_ver={}", amd64, ctx.instance.installation_version),
        ))
    }
}

/// The era's own script: `vcvarsall.bat <arch>`, or the dedicated
/// `vcvars<host>_arm*.bat` for ARM targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct EraScript;

impl ActivationStrategy for EraScript {
    fn name(&self) -> &'static str {
        "era-script"
    }

    fn resolve(&self, ctx: &ActivationContext<'_>) -> Resolution {
        let (file, args) = if ctx.involves_arm() {
            (format!("vcvars{}.bat", ctx.amd64_token()), String::new())
        } else if ctx.is_legacy() {
            ("vcvarsall.bat".to_string(), ctx.amd64_token())
        } else {
            ("vcvarsall.bat".to_string(), ctx.token())
        };

        let script = ctx.script_dir().join(file);
        if script.is_file() {
            Resolution::Found(ActivationScript::new(script, args))
        } else {
            Resolution::Next
        }
    }
}

/// Last resort for native builds: `vcvars32.bat` / `vcvars64.bat`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerArchScript;

impl ActivationStrategy for PerArchScript {
    fn name(&self) -> &'static str {
        "per-arch-script"
    }

    fn resolve(&self, ctx: &ActivationContext<'_>) -> Resolution {
        let file = match ctx.token().as_str() {
            "x86" => "vcvars32.bat",
            "x64" => "vcvars64.bat",
            other => return Resolution::Unavailable(format!("no per-arch script for {}", other)),
        };

        let script = ctx.script_dir().join(file);
        if script.is_file() {
            Resolution::Found(ActivationScript::new(script, ""))
        } else {
            Resolution::Unavailable(format!("{} not found", script.display()))
        }
    }
}

pub fn default_strategies() -> Vec<Box<dyn ActivationStrategy>> {
    vec![
        Box::new(LegacyToolsetPin),
        Box::new(EraScript),
        Box::new(PerArchScript),
    ]
}

/// What an [`ActivationProbe`] is asked to capture.
#[derive(Debug, Clone, Copy)]
pub struct ActivationRequest<'a> {
    pub instance: &'a VsInstance,
    pub activation: &'a ActivationScript,
    pub variables: &'a [&'a str],
}

/// Runs an activation script and returns the captured variables.
pub trait ActivationProbe: Send + Sync {
    fn capture(&self, request: &ActivationRequest<'_>) -> Result<Environment, KitError>;
}

/// Render the driver batch file.
///
/// The driver pins its working directory to its own folder (vendor scripts
/// resolve relative paths and may `cd` elsewhere), pre-declares the
/// `VSxx0COMNTOOLS` variable older scripts expect, aborts if the vendor
/// script fails, and appends `NAME=value` lines to `dump_file`.
pub fn render_driver_script(
    instance: &VsInstance,
    activation: &ActivationScript,
    variables: &[&str],
    dump_file: &str,
) -> String {
    let mut script = String::new();
    script.push_str("@echo off\r\n");
    script.push_str("cd /d \"%~dp0\"\r\n");
    script.push_str(&format!(
        "set \"VS{}0COMNTOOLS={}\"\r\n",
        instance.major_version(),
        instance.common_tools_dir().display()
    ));
    let call = format!("call \"{}\" {}", activation.script.display(), activation.args);
    script.push_str(call.trim_end());
    script.push_str(" || exit /b 1\r\n");
    script.push_str("cd /d \"%~dp0\"\r\n");
    // Delayed expansion keeps `&`, `|` and `)` in values intact. It also
    // drops any literal `!` from a value.
    script.push_str("setlocal EnableDelayedExpansion\r\n");
    for name in variables {
        script.push_str(&format!(">>\"{}\" echo {}=!{}!\r\n", dump_file, name, name));
    }
    script.push_str("exit /b 0\r\n");
    script
}

/// Parse `NAME=value` lines. Splits on the first `=`, trims both sides,
/// skips lines without `=` and variables with empty values.
pub fn parse_env_dump(text: &str) -> Environment {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, value)| !name.is_empty() && !value.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Reject captures that do not describe a working MSVC shell, then add
/// the derived variables.
pub fn validate_environment(
    mut env: Environment,
    instance: &VsInstance,
    arch: &str,
) -> Result<Environment, KitError> {
    let label = instance.instance_id.as_str();
    if !env.contains_key("INCLUDE") {
        return Err(KitError::unavailable(label, arch, "INCLUDE was not set"));
    }
    let Some(vc_install_dir) = env.get("VCINSTALLDIR") else {
        return Err(KitError::unavailable(label, arch, "VCINSTALLDIR was not set"));
    };
    if !Path::new(vc_install_dir).is_dir() {
        return Err(KitError::unavailable(
            label,
            arch,
            format!("VCINSTALLDIR {} does not exist", vc_install_dir),
        ));
    }

    if let Some(vs_version) = env.get("VISUALSTUDIOVERSION").cloned() {
        env.insert(
            format!("VS{}COMNTOOLS", vs_version.replace('.', "")),
            instance.common_tools_dir().display().to_string(),
        );
    }
    env.insert("CC".to_string(), MSVC_COMPILER.to_string());
    env.insert("CXX".to_string(), MSVC_COMPILER.to_string());
    Ok(env)
}

/// Runs the driver script in a fresh temporary directory through
/// `cmd.exe`. The directory and both files are removed on every path out.
#[derive(Clone)]
pub struct BatchActivation {
    runner: Arc<dyn CommandRunner>,
}

impl BatchActivation {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        BatchActivation { runner }
    }
}

impl ActivationProbe for BatchActivation {
    fn capture(&self, request: &ActivationRequest<'_>) -> Result<Environment, KitError> {
        let label = request.instance.instance_id.as_str();
        let workdir = tempfile::Builder::new().prefix("cmake-kits-").tempdir()?;
        let driver = workdir.path().join(DRIVER_FILE);
        let dump = workdir.path().join(DUMP_FILE);

        let script = render_driver_script(
            request.instance,
            request.activation,
            request.variables,
            DUMP_FILE,
        );
        std::fs::write(&driver, script)?;

        let cmd = ProcessBuilder::new(&driver).cwd(workdir.path()).no_window();
        let output = self
            .runner
            .run(&cmd)
            .map_err(|e| KitError::unavailable(label, &request.activation.args, format!("{:#}", e)))?;
        if !output.success() {
            return Err(KitError::unavailable(
                label,
                &request.activation.args,
                format!("activation exited with {:?}", output.code),
            ));
        }
        if !dump.is_file() {
            return Err(KitError::unavailable(
                label,
                &request.activation.args,
                "activation produced no variable dump",
            ));
        }

        let text = std::fs::read(&dump)?;
        let env = parse_env_dump(&String::from_utf8_lossy(&text));
        if let Err(e) = workdir.close() {
            tracing::debug!("failed to remove activation directory: {}", e);
        }
        Ok(env)
    }
}

/// Resolves the MSVC environment for an instance and architecture pair.
pub struct EnvironmentBootstrapper {
    instances: Vec<VsInstance>,
    strategies: Vec<Box<dyn ActivationStrategy>>,
    probe: Arc<dyn ActivationProbe>,
}

impl EnvironmentBootstrapper {
    pub fn new(instances: Vec<VsInstance>, probe: Arc<dyn ActivationProbe>) -> Self {
        EnvironmentBootstrapper {
            instances,
            strategies: default_strategies(),
            probe,
        }
    }

    /// Replace the script-resolution chain.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn ActivationStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn instances(&self) -> &[VsInstance] {
        &self.instances
    }

    /// Look an instance up by id; no id means the first installed one.
    pub fn find_instance(&self, instance_id: Option<&str>) -> Option<&VsInstance> {
        match instance_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self.instances.iter().find(|i| i.instance_id == id),
            None => self.instances.first(),
        }
    }

    /// Run the strategy chain for one combination.
    pub fn resolve_script(
        &self,
        instance: &VsInstance,
        host: Arch,
        target: Arch,
    ) -> Result<ActivationScript, KitError> {
        let ctx = ActivationContext {
            instance,
            host,
            target,
            installed: &self.instances,
        };
        for strategy in &self.strategies {
            match strategy.resolve(&ctx) {
                Resolution::Found(script) => {
                    tracing::debug!(
                        "{} ({}): {} via {}",
                        instance.display_name,
                        ctx.token(),
                        script.script.display(),
                        strategy.name()
                    );
                    return Ok(script);
                }
                Resolution::Next => continue,
                Resolution::Unavailable(reason) => {
                    return Err(KitError::unavailable(&instance.instance_id, ctx.token(), reason));
                }
            }
        }
        Err(KitError::unavailable(
            &instance.instance_id,
            ctx.token(),
            "no activation script found",
        ))
    }

    /// Capture and validate the environment for one combination.
    pub fn try_vars_for_instance(
        &self,
        instance: &VsInstance,
        host: Arch,
        target: Arch,
    ) -> Result<Environment, KitError> {
        let activation = self.resolve_script(instance, host, target)?;
        let request = ActivationRequest {
            instance,
            activation: &activation,
            variables: MSVC_ENV_VARS,
        };
        let env = self.probe.capture(&request)?;
        validate_environment(env, instance, &arch_token(host, target))
    }

    /// Like [`try_vars_for_instance`](Self::try_vars_for_instance), but an
    /// unavailable combination is simply an empty map.
    pub fn vars_for_instance(&self, instance: &VsInstance, host: Arch, target: Arch) -> Environment {
        self.try_vars_for_instance(instance, host, target)
            .unwrap_or_else(|e| {
                tracing::debug!("{}", e);
                Environment::new()
            })
    }

    /// Environment for a kit's instance reference.
    pub fn vars_for_kit(&self, instance_id: Option<&str>, host: Arch, target: Arch) -> Environment {
        match self.find_instance(instance_id) {
            Some(instance) => self.vars_for_instance(instance, host, target),
            None => {
                tracing::debug!("instance {:?} is no longer installed", instance_id);
                Environment::new()
            }
        }
    }

    /// Whether the combination is installed and activates cleanly.
    pub fn is_available(&self, instance: &VsInstance, host: Arch, target: Arch) -> bool {
        !self.vars_for_instance(instance, host, target).is_empty()
    }
}
