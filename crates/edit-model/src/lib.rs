//! SeamCut Edit Model
//!
//! Defines the core data contracts for SeamCut edits:
//! - **Media:** Probed source files (duration, resolution)
//! - **Segments:** Requested trim windows and their keyframe-snapped splits
//! - **Requests:** Wire-level edit parameters and their validated form
//! - **Timeline:** The flat output coordinate space shared by export and preview
//! - **Protocol:** Tagged request/response messages
//!
//! All times are `f64` seconds. Source times are positions inside a source
//! file; timeline times are positions in the assembled output.

pub mod media;
pub mod protocol;
pub mod request;
pub mod segment;
pub mod timeline;

pub use media::*;
pub use protocol::*;
pub use request::*;
pub use segment::*;
pub use timeline::*;
