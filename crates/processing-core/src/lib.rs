//! SeamCut Processing Core
//!
//! Everything between a validated request and a render plan that needs to
//! know about the media itself:
//! - **Probe:** Packet flags, duration, and resolution of source files
//! - **Keyframes:** The sorted keyframe index and its sidecar cache
//! - **Split:** Snapping segment boundaries to keyframes around the fades

pub mod keyframes;
pub mod probe;
pub mod split;

pub use keyframes::{ContentSignature, KeyframeCache, KeyframeIndex, KeyframeQuery};
pub use probe::{probe_source, FfprobeProber, MediaProber, PacketRecord};
pub use split::SplitPointResolver;
