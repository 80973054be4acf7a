//! Shared Strategy Framework
//!
//! Common lifecycle trait, metrics counters and config loading for strategy crates.

pub mod config;
pub mod metrics;
pub mod traits;

pub use config::*;
pub use metrics::*;
pub use traits::*;
