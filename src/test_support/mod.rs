//! Test doubles for process execution and MSVC activation.
//!
//! # Example
//!
//! ```rust,ignore
//! use cmake_kits::test_support::{FakeOutput, FakeRunner};
//!
//! let runner = FakeRunner::new();
//! runner.expect_contains("gcc -v", FakeOutput::stderr(0, "gcc version 12.2.0 (GCC)"));
//! ```

pub mod fixtures;

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use crate::kits::errors::KitError;
use crate::kits::msvc::{ActivationProbe, ActivationRequest};
use crate::kits::Environment;
use crate::util::process::{CommandRunner, ProcessBuilder, ProcessOutput};

pub use fixtures::*;

/// Canned process result.
#[derive(Debug, Clone, Default)]
pub struct FakeOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl FakeOutput {
    /// Output written to stdout.
    pub fn stdout(code: i32, text: impl Into<String>) -> Self {
        FakeOutput {
            code,
            stdout: text.into(),
            stderr: String::new(),
        }
    }

    /// Output written to stderr, where compilers print `-v` banners.
    pub fn stderr(code: i32, text: impl Into<String>) -> Self {
        FakeOutput {
            code,
            stdout: String::new(),
            stderr: text.into(),
        }
    }

    fn into_output(self) -> ProcessOutput {
        ProcessOutput {
            code: Some(self.code),
            stdout: self.stdout.into_bytes(),
            stderr: self.stderr.into_bytes(),
        }
    }
}

/// Pattern for matching commands in [`FakeRunner`].
#[derive(Debug, Clone)]
pub enum CommandPattern {
    Exact(String),
    Contains(String),
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::Contains(s) => cmd.contains(s.as_str()),
        }
    }
}

type Handler = Arc<dyn Fn(&ProcessBuilder) -> FakeOutput + Send + Sync>;

#[derive(Default)]
struct RunnerState {
    expectations: Vec<(CommandPattern, FakeOutput)>,
    handler: Option<Handler>,
    calls: Vec<String>,
}

/// [`CommandRunner`] that answers from canned expectations.
///
/// Clones share state, so a test can hand one clone to the code under
/// test and inspect [`calls`](Self::calls) on another. Commands that match
/// nothing fail as if the program did not exist.
#[derive(Clone, Default)]
pub struct FakeRunner {
    state: Arc<Mutex<RunnerState>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands equal to `cmd`.
    pub fn expect(&self, cmd: &str, output: FakeOutput) -> &Self {
        self.lock()
            .expectations
            .push((CommandPattern::Exact(cmd.to_string()), output));
        self
    }

    /// Answer commands containing `substring`.
    pub fn expect_contains(&self, substring: &str, output: FakeOutput) -> &Self {
        self.lock()
            .expectations
            .push((CommandPattern::Contains(substring.to_string()), output));
        self
    }

    /// Answer every otherwise unmatched command with `handler`.
    pub fn on_run<F>(&self, handler: F) -> &Self
    where
        F: Fn(&ProcessBuilder) -> FakeOutput + Send + Sync + 'static,
    {
        self.lock().handler = Some(Arc::new(handler));
        self
    }

    /// Every command run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        let full = cmd.display_command();
        let handler = {
            let mut state = self.lock();
            state.calls.push(full.clone());
            if let Some((_, output)) = state.expectations.iter().find(|(p, _)| p.matches(&full)) {
                return Ok(output.clone().into_output());
            }
            state.handler.clone()
        };

        match handler {
            Some(handler) => Ok(handler(cmd).into_output()),
            None => bail!("failed to run `{}`: no such program", full),
        }
    }
}

#[derive(Default)]
struct ActivationState {
    responses: Vec<(String, Environment)>,
    requests: Vec<String>,
}

/// [`ActivationProbe`] that returns canned environments keyed by the
/// activation arguments (`x64`, `x86_arm`, ...).
#[derive(Clone, Default)]
pub struct FakeActivation {
    state: Arc<Mutex<ActivationState>>,
}

impl FakeActivation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, args: &str, env: Environment) -> &Self {
        self.lock().responses.push((args.to_string(), env));
        self
    }

    /// Activation arguments requested so far.
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// A plausible activated environment whose `VCINSTALLDIR` is `vc_dir`.
    /// The directory is created.
    pub fn msvc_env(vc_dir: &Path) -> Environment {
        std::fs::create_dir_all(vc_dir).unwrap();
        let mut env = Environment::new();
        env.insert("INCLUDE".to_string(), vc_dir.join("include").display().to_string());
        env.insert("LIB".to_string(), vc_dir.join("lib").display().to_string());
        env.insert("PATH".to_string(), vc_dir.join("bin").display().to_string());
        env.insert("VCINSTALLDIR".to_string(), vc_dir.display().to_string());
        env.insert("VISUALSTUDIOVERSION".to_string(), "17.0".to_string());
        env
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ActivationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ActivationProbe for FakeActivation {
    fn capture(&self, request: &ActivationRequest<'_>) -> Result<Environment, KitError> {
        let mut state = self.lock();
        let args = request.activation.args.clone();
        state.requests.push(args.clone());
        state
            .responses
            .iter()
            .find(|(a, _)| *a == args)
            .map(|(_, env)| env.clone())
            .ok_or_else(|| {
                KitError::unavailable(&request.instance.instance_id, args, "no canned environment")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_runner_records_and_matches() {
        let runner = FakeRunner::new();
        runner.expect("gcc -v", FakeOutput::stderr(0, "gcc version 12.2.0 (GCC)"));

        let out = runner.run(&ProcessBuilder::new("gcc").arg("-v")).unwrap();
        assert!(out.success());
        assert!(out.stderr_lossy().contains("12.2.0"));
        assert!(runner.run(&ProcessBuilder::new("clang").arg("-v")).is_err());
        assert_eq!(runner.calls(), vec!["gcc -v".to_string(), "clang -v".to_string()]);
    }

    #[test]
    fn test_fake_runner_handler_fallback() {
        let runner = FakeRunner::new();
        runner.on_run(|cmd| FakeOutput::stdout(3, cmd.display_command()));

        let out = runner.run(&ProcessBuilder::new("anything")).unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout, b"anything");
    }
}
