//! The timeline map: where each piece of content sits in the assembled output.
//!
//! Export and preview both address content by a single timeline coordinate.
//! The map translates that coordinate back to a source file and a source
//! offset. Entries are ordered and contiguous:
//!
//! ```text
//! entry[i + 1].timeline_start == entry[i].timeline_start + entry[i].duration
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::segment::Segment;

/// What an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Intro,
    Segment,
}

/// One contiguous run of output sourced from a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// `intro`, `segment1`, `segment2`, ...
    pub id: String,

    pub kind: EntryKind,

    pub source_file: PathBuf,

    /// Position of the entry's first frame in the output.
    pub timeline_start: f64,

    pub duration: f64,

    /// Position in the source file that maps to `timeline_start`.
    pub source_start_time: f64,
}

impl TimelineEntry {
    pub fn timeline_end(&self) -> f64 {
        self.timeline_start + self.duration
    }

    /// Source position of the entry's end.
    pub fn source_end_time(&self) -> f64 {
        self.source_start_time + self.duration
    }

    /// Whether `[timeline_start, timeline_end)` intersects `[start, end)`.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.timeline_start < end && self.timeline_end() > start
    }

    pub fn is_segment(&self) -> bool {
        self.kind == EntryKind::Segment
    }
}

/// Content waiting to be placed on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSpan {
    pub id: String,
    pub kind: EntryKind,
    pub source_file: PathBuf,
    pub source_start_time: f64,
    pub duration: f64,
}

impl TimelineSpan {
    /// The whole intro file.
    pub fn intro(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            id: "intro".to_string(),
            kind: EntryKind::Intro,
            source_file: path.into(),
            source_start_time: 0.0,
            duration,
        }
    }

    /// A segment's requested window, with a missing out-point replaced by
    /// the media duration.
    pub fn segment(segment: &Segment, media_duration: f64) -> Self {
        Self {
            id: segment.id(),
            kind: EntryKind::Segment,
            source_file: segment.video.clone(),
            source_start_time: segment.start,
            duration: segment.effective_duration(media_duration),
        }
    }
}

/// Ordered, contiguous timeline entries and their combined length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineMap {
    pub entries: Vec<TimelineEntry>,
    pub total_duration: f64,
}

impl TimelineMap {
    /// Place `span` at the current end of the map, returning the grown map.
    pub fn appended(mut self, span: TimelineSpan) -> Self {
        let timeline_start = self.total_duration;
        self.total_duration = timeline_start + span.duration;
        self.entries.push(TimelineEntry {
            id: span.id,
            kind: span.kind,
            source_file: span.source_file,
            timeline_start,
            duration: span.duration,
            source_start_time: span.source_start_time,
        });
        self
    }

    /// Entries whose interval intersects `[start, end)`.
    pub fn overlapping(&self, start: f64, end: f64) -> impl Iterator<Item = &TimelineEntry> {
        self.entries.iter().filter(move |e| e.overlaps(start, end))
    }

    /// The first entry holding user content rather than the intro.
    pub fn first_segment(&self) -> Option<&TimelineEntry> {
        self.entries.iter().find(|e| e.is_segment())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lay out the intro (if any) and then each segment, end to end.
///
/// Spans with no positive duration occupy no timeline space and are dropped.
pub fn map_timeline(
    intro: Option<TimelineSpan>,
    segments: impl IntoIterator<Item = TimelineSpan>,
) -> TimelineMap {
    intro
        .into_iter()
        .chain(segments)
        .filter(|span| span.duration > 0.0)
        .fold(TimelineMap::default(), TimelineMap::appended)
}
