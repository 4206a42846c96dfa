//! Shared utilities

pub mod config;
pub mod context;
pub mod fs;
pub mod paths;
pub mod process;

pub use config::Config;
pub use context::GlobalContext;
pub use paths::{PathSearch, Platform};
