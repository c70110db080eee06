//! redmap-configs
//!
//! Configuration types and loader for redmap.

pub mod config;

pub use config::defaults;
pub use config::*;
