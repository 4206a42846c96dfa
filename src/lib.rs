//! cmake-kits - discover C/C++ toolchains and drive CMake with them
//!
//! This crate finds the compilers installed on a host (Visual Studio/MSVC,
//! Clang, GCC and clang-cl), records each usable configuration as a kit,
//! and projects a kit into the environment and `-D` settings a CMake
//! configure or build needs.

pub mod kits;
pub mod ops;
pub mod util;

/// Test doubles for process execution and MSVC activation.
///
/// Only compiled for unit tests.
#[cfg(test)]
pub mod test_support;

pub use kits::{Kit, KitError, KitInfo, KitScanner};
pub use ops::KitCatalog;
pub use util::context::GlobalContext;
