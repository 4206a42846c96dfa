//! Command implementations

pub mod build;
pub mod completions;
pub mod configure;
pub mod env;
pub mod list;
pub mod scan;
