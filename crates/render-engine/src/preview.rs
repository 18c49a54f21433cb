//! Scrub-preview compilation.
//!
//! A preview renders a short window of the timeline straight from the
//! sources, without building the export's slivers. Each contributing entry
//! becomes one process input, seeked a safety buffer ahead of the needed
//! range so the decoder lands on a keyframe, then trimmed to the exact range
//! inside the filter graph.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use seamcut_common::config::PreviewConfig;
use seamcut_common::error::{SeamcutError, SeamcutResult};
use seamcut_common::timecode::format_timecode;
use seamcut_edit_model::media::Resolution;
use seamcut_edit_model::timeline::{TimelineEntry, TimelineMap};

use crate::filter_graph::{secs, Filter, FilterGraph, FilterNode, PadRef};
use crate::transcoder::{TranscodeInput, TranscodeInvocation};

/// Parts shorter than this contribute nothing visible.
const MIN_PART_SECS: f64 = 0.01;
/// How close a part's start must be to its entry's start to fade in.
const FADE_IN_TOLERANCE: f64 = 0.01;
/// How close a part's end must be to its entry's end to fade out.
const FADE_OUT_TOLERANCE: f64 = 0.1;

/// The timeline range being previewed, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewWindow {
    pub start: f64,
    pub end: f64,
}

impl PreviewWindow {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// The slice of one timeline entry that falls inside the window.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewPart {
    pub entry_id: String,
    pub source: PathBuf,

    /// Input seek position (source seconds).
    pub seek: f64,

    /// Needed range start, relative to `seek`.
    pub trim_start: f64,

    pub duration: f64,

    /// Resample to this resolution before concatenation.
    pub scale_to: Option<Resolution>,

    pub fade_in: bool,

    /// Part-relative start of a fade-out.
    pub fade_out_at: Option<f64>,
}

impl PreviewPart {
    /// Absolute source position of the first needed frame.
    pub fn source_start(&self) -> f64 {
        self.seek + self.trim_start
    }
}

/// A compiled preview render.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewPlan {
    pub window: PreviewWindow,
    pub parts: Vec<PreviewPart>,
    pub graph: FilterGraph,
    encoding: PreviewConfig,
}

impl PreviewPlan {
    /// Expected length of the rendered preview.
    pub fn duration(&self) -> f64 {
        self.parts.iter().map(|p| p.duration).sum()
    }

    pub fn invocation(&self, output: &Path) -> TranscodeInvocation {
        let mut invocation = TranscodeInvocation::new(
            format!(
                "Preview {} - {}",
                format_timecode(self.window.start),
                format_timecode(self.window.end)
            ),
            output,
        );
        for part in &self.parts {
            invocation =
                invocation.input(TranscodeInput::new(&part.source).option("-ss", secs(part.seek)));
        }
        let enc = &self.encoding;
        invocation
            .filter_complex(self.graph.clone())
            .output_option("-map", "[v_out]")
            .output_option("-map", "[a_out]")
            .output_option("-c:v", enc.video_encoder.clone())
            .output_option("-preset", enc.preset.clone())
            .output_option("-tune", enc.tune.clone())
            .output_option("-crf", enc.crf.to_string())
            .output_option("-threads", "0")
            .output_option("-c:a", enc.audio_codec.clone())
            .output_option("-b:a", enc.audio_bitrate.clone())
            .output_option("-movflags", "+faststart")
    }
}

/// Compiles preview windows over a timeline map.
#[derive(Debug, Clone)]
pub struct PreviewWindowCompiler {
    config: PreviewConfig,
    fade_duration: f64,
}

impl PreviewWindowCompiler {
    pub fn new(config: PreviewConfig, fade_duration: f64) -> Self {
        Self {
            config,
            fade_duration,
        }
    }

    /// Default window length.
    pub fn window_duration(&self) -> f64 {
        self.config.fragment_duration_secs
    }

    /// Compile the window `[window_start, window_start + window_duration)`,
    /// clamped to the map. Returns `None` when no entry contributes.
    ///
    /// `resolutions` holds the known resolution of each source file. The
    /// first segment's resolution is the reference every other part is
    /// resampled to.
    pub fn compile_window(
        &self,
        map: &TimelineMap,
        window_start: f64,
        window_duration: f64,
        resolutions: &HashMap<PathBuf, Resolution>,
    ) -> SeamcutResult<Option<PreviewPlan>> {
        let start = window_start.max(0.0);
        let end = (start + window_duration).min(map.total_duration);
        if end <= start {
            return Ok(None);
        }
        let window = PreviewWindow { start, end };

        let reference = match map.first_segment() {
            Some(entry) => Some(resolutions.get(&entry.source_file).copied().ok_or_else(|| {
                SeamcutError::probe(&entry.source_file, "reference resolution unknown")
            })?),
            None => None,
        };

        let parts: Vec<PreviewPart> = map
            .overlapping(start, end)
            .filter_map(|entry| self.part(entry, window, reference, resolutions))
            .collect();
        if parts.is_empty() {
            return Ok(None);
        }

        let graph = self.graph(&parts);
        tracing::debug!(
            start = window.start,
            end = window.end,
            parts = parts.len(),
            "Compiled preview window"
        );
        Ok(Some(PreviewPlan {
            window,
            parts,
            graph,
            encoding: self.config.clone(),
        }))
    }

    fn part(
        &self,
        entry: &TimelineEntry,
        window: PreviewWindow,
        reference: Option<Resolution>,
        resolutions: &HashMap<PathBuf, Resolution>,
    ) -> Option<PreviewPart> {
        let offset_in_entry = (window.start - entry.timeline_start).max(0.0);
        let end_in_entry = entry.duration.min(window.end - entry.timeline_start);
        let duration = end_in_entry - offset_in_entry;
        if duration <= MIN_PART_SECS {
            return None;
        }

        let source_start = entry.source_start_time + offset_in_entry;
        let seek = (source_start - self.config.seek_buffer_secs).max(0.0);

        let scale_to = match (reference, resolutions.get(&entry.source_file)) {
            (Some(target), Some(actual)) if *actual != target => Some(target),
            _ => None,
        };

        let fade = self.fade_duration;
        let (fade_in, fade_out_at) = if entry.is_segment() {
            let fade_in = offset_in_entry < FADE_IN_TOLERANCE;
            let reaches_end = (end_in_entry - entry.duration).abs() < FADE_OUT_TOLERANCE;
            let fade_out_at = (reaches_end && duration > fade).then(|| duration - fade);
            (fade_in, fade_out_at)
        } else {
            (false, None)
        };

        Some(PreviewPart {
            entry_id: entry.id.clone(),
            source: entry.source_file.clone(),
            seek,
            trim_start: source_start - seek,
            duration,
            scale_to,
            fade_in,
            fade_out_at,
        })
    }

    fn graph(&self, parts: &[PreviewPart]) -> FilterGraph {
        let fade = self.fade_duration;
        let mut graph = FilterGraph::new();

        for (i, part) in parts.iter().enumerate() {
            let mut video = FilterNode::new().input(PadRef::video(i));
            if let Some(res) = part.scale_to {
                video = video
                    .filter(Filter::new("scale").arg(res.width).arg(res.height))
                    .filter(Filter::new("setsar").arg(1));
            }
            video = video
                .filter(
                    Filter::new("trim")
                        .kv("start", secs(part.trim_start))
                        .kv("duration", secs(part.duration)),
                )
                .filter(Filter::new("setpts").arg("PTS-STARTPTS"));

            let mut audio = FilterNode::new()
                .input(PadRef::audio(i))
                .filter(
                    Filter::new("atrim")
                        .kv("start", secs(part.trim_start))
                        .kv("duration", secs(part.duration)),
                )
                .filter(Filter::new("asetpts").arg("PTS-STARTPTS"));

            if part.fade_in {
                video = video.filter(
                    Filter::new("fade")
                        .arg("in")
                        .kv("st", 0)
                        .kv("d", fade)
                        .kv("alpha", 1),
                );
                audio = audio.filter(Filter::new("afade").kv("t", "in").kv("st", 0).kv("d", fade));
            }
            if let Some(at) = part.fade_out_at {
                video = video.filter(
                    Filter::new("fade")
                        .arg("out")
                        .kv("st", secs(at))
                        .kv("d", fade)
                        .kv("alpha", 1),
                );
                audio = audio.filter(
                    Filter::new("afade")
                        .kv("t", "out")
                        .kv("st", secs(at))
                        .kv("d", fade),
                );
            }

            graph.push(video.output(format!("v{i}")));
            graph.push(audio.output(format!("a{i}")));
        }

        let n = parts.len();
        graph.push(
            FilterNode::new()
                .inputs((0..n).map(|i| PadRef::label(format!("v{i}"))))
                .filter(Filter::new("concat").kv("n", n).kv("v", 1).kv("a", 0))
                .output("v_out"),
        );
        graph.push(
            FilterNode::new()
                .inputs((0..n).map(|i| PadRef::label(format!("a{i}"))))
                .filter(Filter::new("concat").kv("n", n).kv("v", 0).kv("a", 1))
                .output("a_out"),
        );
        graph
    }
}
