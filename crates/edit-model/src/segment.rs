//! Trim segments and their keyframe-snapped split points.
//!
//! A [`Segment`] is what the user asked for: a window `[start, end)` of a
//! source. A [`ResolvedSegment`] additionally carries `start_split` and
//! `end_split`, the keyframes between which the body is stream-copied. It can
//! only be built when
//!
//! ```text
//! start + fade <= start_split < end_split <= end - fade
//! ```
//!
//! holds, so every resolved segment in the system satisfies that invariant.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use seamcut_common::error::{SeamcutError, SeamcutResult};

/// Tolerance for margin checks on probed (microsecond-rounded) timestamps.
const MARGIN_EPSILON: f64 = 1e-9;

/// A requested trim window over one video source and one audio source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// 1-based position in the edit.
    pub index: usize,

    /// Video source.
    pub video: PathBuf,

    /// Audio source (the video itself unless another file was chosen).
    pub audio: PathBuf,

    /// Requested in-point, source seconds.
    pub start: f64,

    /// Requested out-point, source seconds. `end <= start` means "until the
    /// end of the media".
    pub end: f64,
}

impl Segment {
    /// Timeline id of this segment (`segment1`, `segment2`, ...).
    pub fn id(&self) -> String {
        format!("segment{}", self.index)
    }

    /// Whether an explicit out-point was supplied.
    pub fn has_end(&self) -> bool {
        self.end > self.start
    }

    /// The out-point, substituting the media duration when none was given.
    pub fn effective_end(&self, media_duration: f64) -> f64 {
        if self.has_end() {
            self.end
        } else {
            media_duration
        }
    }

    /// Requested length once the out-point is known.
    pub fn effective_duration(&self, media_duration: f64) -> f64 {
        self.effective_end(media_duration) - self.start
    }

    /// A copy of this segment with the out-point made explicit.
    pub fn with_effective_end(&self, media_duration: f64) -> Segment {
        Segment {
            end: self.effective_end(media_duration),
            ..self.clone()
        }
    }
}

/// A segment whose cut points have been snapped to keyframes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSegment {
    segment: Segment,
    start_split: f64,
    end_split: f64,
    fade_duration: f64,
}

impl ResolvedSegment {
    /// Pair a segment with candidate split points, enforcing the split
    /// invariant. The segment must carry an explicit out-point.
    pub fn new(
        segment: Segment,
        start_split: f64,
        end_split: f64,
        fade_duration: f64,
    ) -> SeamcutResult<Self> {
        let valid = segment.has_end()
            && start_split - segment.start >= fade_duration - MARGIN_EPSILON
            && segment.end - end_split >= fade_duration - MARGIN_EPSILON
            && start_split < end_split;

        if !valid {
            return Err(SeamcutError::InsufficientSegmentLength {
                segment: segment.index,
                start: segment.start,
                end: segment.end,
                fade_duration,
            });
        }

        Ok(Self {
            segment,
            start_split,
            end_split,
            fade_duration,
        })
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn index(&self) -> usize {
        self.segment.index
    }

    pub fn start(&self) -> f64 {
        self.segment.start
    }

    pub fn end(&self) -> f64 {
        self.segment.end
    }

    pub fn start_split(&self) -> f64 {
        self.start_split
    }

    pub fn end_split(&self) -> f64 {
        self.end_split
    }

    pub fn fade_duration(&self) -> f64 {
        self.fade_duration
    }

    /// Length of the re-encoded fade-in sliver.
    pub fn fade_in_duration(&self) -> f64 {
        self.start_split - self.segment.start
    }

    /// Length of the stream-copied body.
    pub fn body_duration(&self) -> f64 {
        self.end_split - self.start_split
    }

    /// Length of the re-encoded fade-out sliver.
    pub fn fade_out_duration(&self) -> f64 {
        self.segment.end - self.end_split
    }

    /// Offset inside the fade-out sliver where the fade curve begins.
    pub fn fade_out_offset(&self) -> f64 {
        self.fade_out_duration() - self.fade_duration
    }

    /// Total output length of this segment; independent of split placement.
    pub fn duration(&self) -> f64 {
        self.segment.end - self.segment.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64) -> Segment {
        Segment {
            index: 1,
            video: PathBuf::from("/media/a.mkv"),
            audio: PathBuf::from("/media/a.mkv"),
            start,
            end,
        }
    }

    #[test]
    fn test_effective_end_substitutes_media_duration() {
        assert_eq!(segment(10.0, 70.0).effective_end(300.0), 70.0);
        assert_eq!(segment(10.0, 0.0).effective_end(300.0), 300.0);
        assert_eq!(segment(10.0, 10.0).effective_duration(300.0), 290.0);
    }

    #[test]
    fn test_resolved_segment_durations_add_up() {
        let resolved = ResolvedSegment::new(segment(10.0, 70.0), 12.0, 68.0, 1.0).unwrap();
        assert_eq!(resolved.fade_in_duration(), 2.0);
        assert_eq!(resolved.body_duration(), 56.0);
        assert_eq!(resolved.fade_out_duration(), 2.0);
        assert_eq!(resolved.fade_out_offset(), 1.0);
        assert_eq!(
            resolved.fade_in_duration() + resolved.body_duration() + resolved.fade_out_duration(),
            resolved.duration()
        );
    }

    #[test]
    fn test_resolved_segment_rejects_thin_margins() {
        let err = ResolvedSegment::new(segment(10.0, 70.0), 10.5, 68.0, 1.0).unwrap_err();
        assert!(matches!(
            err,
            SeamcutError::InsufficientSegmentLength { segment: 1, .. }
        ));
        assert!(ResolvedSegment::new(segment(10.0, 70.0), 12.0, 69.5, 1.0).is_err());
    }

    #[test]
    fn test_resolved_segment_rejects_crossed_splits() {
        assert!(ResolvedSegment::new(segment(10.0, 16.0), 14.0, 12.0, 1.0).is_err());
        assert!(ResolvedSegment::new(segment(10.0, 16.0), 13.0, 13.0, 1.0).is_err());
    }

    #[test]
    fn test_resolved_segment_requires_explicit_end() {
        assert!(ResolvedSegment::new(segment(10.0, 0.0), 12.0, 68.0, 1.0).is_err());
    }
}
