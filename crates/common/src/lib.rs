//! SeamCut Common Utilities
//!
//! Shared infrastructure for all SeamCut crates:
//! - Error taxonomy and result aliases
//! - Timecode parsing and formatting
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod timecode;

pub use config::*;
pub use error::*;
pub use timecode::*;
