//! SeamCut Render Engine
//!
//! Turns validated edits into transcoder work and runs it.
//!
//! # Export Architecture
//!
//! ```text
//! segment ── keyframe index ── split points ──┐
//!                                             ├── RenderPlan
//! intro (prepared on demand) ─────────────────┘      │
//!                                                    ├── fade-in / fade-out slivers (re-encoded)
//!                                                    ├── concat script (body stream-copied)
//!                                                    └── audio graph (asplit/atrim/afade/concat)
//!                                                           │
//!                                                           ▼
//!                                                    <res>_<name>_final_edit.mkv
//! ```
//!
//! Previews take a shorter path: the timeline map is windowed and each
//! overlapping entry is decoded, trimmed, and concatenated in one pass.

pub mod concat;
pub mod export;
pub mod filter_graph;
pub mod intro;
pub mod plan;
pub mod preview;
pub mod service;
pub mod transcoder;

pub use export::{EditPipeline, ExportReport, PreviewFragment};
pub use plan::{RenderPlan, RenderPlanCompiler};
pub use preview::{PreviewPlan, PreviewWindowCompiler};
pub use service::{serve, EditorService};
pub use transcoder::{FfmpegTranscoder, LogSink, Transcoder};
