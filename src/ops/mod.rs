//! High-level operations.
//!
//! This module contains the implementation of the `cmake-kits` commands.

pub mod catalog;
pub mod invoke;
pub mod scan;

pub use catalog::KitCatalog;
pub use invoke::KitSession;
pub use scan::{scan_and_save, scan_and_save_async};
