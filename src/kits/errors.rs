//! Kit discovery error types.
//!
//! None of these are fatal to a scan: discovery converts them into a
//! dropped candidate and a debug log record. They surface to callers only
//! from explicit operations such as running CMake.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error raised while discovering or using a kit.
#[derive(Debug, Error, Diagnostic)]
pub enum KitError {
    /// A candidate compiler did not produce a usable version banner.
    #[error("failed to probe `{}`: {reason}", path.display())]
    #[diagnostic(code(cmake_kits::probe))]
    Probe { path: PathBuf, reason: String },

    /// An instance/architecture combination has no working activation.
    #[error("no environment for {instance} ({arch}): {reason}")]
    #[diagnostic(code(cmake_kits::environment_unavailable))]
    EnvironmentUnavailable {
        instance: String,
        arch: String,
        reason: String,
    },

    /// The kit catalog could not be read or written.
    #[error("kit catalog error at `{}`: {reason}", path.display())]
    #[diagnostic(
        code(cmake_kits::persistence),
        help("Run `cmake-kits scan` to rebuild the catalog")
    )]
    Persistence { path: PathBuf, reason: String },

    /// CMake could not be started.
    #[error("failed to invoke `{program}`: {reason}")]
    #[diagnostic(code(cmake_kits::invocation))]
    Invocation { program: String, reason: String },

    /// The installed-instance locator failed.
    #[error("failed to enumerate toolchain instances: {0}")]
    #[diagnostic(code(cmake_kits::locator))]
    Locator(String),

    /// A constructor was handed an invalid value.
    #[error("invalid argument: {0}")]
    #[diagnostic(code(cmake_kits::invalid_argument))]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(cmake_kits::io))]
    Io(#[from] std::io::Error),
}

impl KitError {
    pub(crate) fn unavailable(
        instance: impl Into<String>,
        arch: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        KitError::EnvironmentUnavailable {
            instance: instance.into(),
            arch: arch.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_message_names_path() {
        let err = KitError::Probe {
            path: PathBuf::from("/usr/bin/gcc"),
            reason: "exit 1".to_string(),
        };
        assert_eq!(err.to_string(), "failed to probe `/usr/bin/gcc`: exit 1");
    }

    #[test]
    fn test_unavailable_helper() {
        let err = KitError::unavailable("VisualStudio.14.0", "x86_arm", "script missing");
        assert!(matches!(err, KitError::EnvironmentUnavailable { .. }));
        assert!(err.to_string().contains("x86_arm"));
    }
}
