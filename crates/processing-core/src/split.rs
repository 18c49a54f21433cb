//! Keyframe-aligned split points.
//!
//! Each segment is cut as `fade-in sliver | copied body | fade-out sliver`.
//! The body boundaries must land on keyframes so it can be stream-copied;
//! the slivers must each be at least one fade long so the fade fits.

use seamcut_common::config::EditorConfig;
use seamcut_common::error::{SeamcutError, SeamcutResult};
use seamcut_edit_model::segment::{ResolvedSegment, Segment};

use crate::keyframes::{KeyframeIndex, KeyframeQuery};

/// Snaps segment boundaries to keyframes for a fixed fade length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitPointResolver {
    fade_duration: f64,
}

impl SplitPointResolver {
    pub fn new(fade_duration: f64) -> Self {
        Self { fade_duration }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.fade_duration_secs)
    }

    pub fn fade_duration(&self) -> f64 {
        self.fade_duration
    }

    /// Resolve `segment` against `index`.
    ///
    /// `start_split` is the first keyframe after `start + fade`, `end_split`
    /// the last keyframe before `end - fade`. The segment must carry an
    /// explicit out-point; apply [`Segment::with_effective_end`] first.
    pub fn resolve(&self, segment: &Segment, index: &KeyframeIndex) -> SeamcutResult<ResolvedSegment> {
        let fade = self.fade_duration;
        let start_split = index.lookup(KeyframeQuery::FirstAfter(segment.start + fade));
        let end_split = index.lookup(KeyframeQuery::LastBefore(segment.end - fade));

        let (Some(start_split), Some(end_split)) = (start_split, end_split) else {
            return Err(SeamcutError::InsufficientSegmentLength {
                segment: segment.index,
                start: segment.start,
                end: segment.end,
                fade_duration: fade,
            });
        };

        let resolved = ResolvedSegment::new(segment.clone(), start_split, end_split, fade)?;
        tracing::debug!(
            segment = segment.index,
            start = segment.start,
            end = segment.end,
            start_split,
            end_split,
            "Resolved split points"
        );
        Ok(resolved)
    }
}
