//! Render plan compilation.
//!
//! A [`RenderPlan`] describes the whole export without running anything:
//!
//! ```text
//! video: intro | fade-in_1 | body_1 (copied) | fade-out_1 | fade-in_2 | ...
//! audio: [1:a] + for each segment: atrim(start..start_split) afade in
//!                                  atrim(start_split..end_split)
//!                                  atrim(end_split..end)      afade out
//! ```
//!
//! Only the fade slivers are re-encoded. The final pass stream-copies video
//! through the concat demuxer and rebuilds the audio track in one filter
//! graph.

use std::path::{Path, PathBuf};

use seamcut_common::config::{AppConfig, EditorConfig};
use seamcut_common::error::{InputValidationError, SeamcutResult};
use seamcut_edit_model::request::EditRequest;
use seamcut_edit_model::segment::ResolvedSegment;

use crate::concat::{ConcatEntry, ConcatScript};
use crate::filter_graph::{secs, Filter, FilterChain, FilterGraph, FilterNode, PadRef};
use crate::transcoder::{TranscodeInput, TranscodeInvocation};

/// Process input index of the concat script in the final invocation.
const CONCAT_INPUT: usize = 0;
/// Process input index of the intro (used for its audio).
const INTRO_INPUT: usize = 1;
/// Label of the final audio pad.
const FINAL_AUDIO: &str = "fa";

/// The intro that opens every export.
#[derive(Debug, Clone, PartialEq)]
pub struct IntroClip {
    pub path: PathBuf,
    pub duration: f64,
}

/// One clip of the output video track, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoClip {
    Intro {
        path: PathBuf,
        duration: f64,
    },
    /// Re-encoded `[start, start_split)` with a fade from black.
    FadeIn {
        segment: usize,
        source: PathBuf,
        start: f64,
        end: f64,
        output: PathBuf,
    },
    /// Stream-copied `[start_split, end_split)`.
    Body {
        segment: usize,
        source: PathBuf,
        inpoint: f64,
        outpoint: f64,
    },
    /// Re-encoded `[end_split, end)` with a fade to black starting at
    /// `fade_start` (sliver-relative).
    FadeOut {
        segment: usize,
        source: PathBuf,
        start: f64,
        end: f64,
        fade_start: f64,
        output: PathBuf,
    },
}

impl VideoClip {
    pub fn duration(&self) -> f64 {
        match self {
            Self::Intro { duration, .. } => *duration,
            Self::FadeIn { start, end, .. } | Self::FadeOut { start, end, .. } => end - start,
            Self::Body {
                inpoint, outpoint, ..
            } => outpoint - inpoint,
        }
    }

    pub fn is_reencoded(&self) -> bool {
        matches!(self, Self::FadeIn { .. } | Self::FadeOut { .. })
    }

    fn concat_entry(&self) -> ConcatEntry {
        match self {
            Self::Intro { path, .. } => ConcatEntry::whole(path),
            Self::FadeIn { output, .. } | Self::FadeOut { output, .. } => {
                ConcatEntry::whole(output)
            }
            Self::Body {
                source,
                inpoint,
                outpoint,
                ..
            } => ConcatEntry::range(source, *inpoint, *outpoint),
        }
    }
}

/// Final output container and codecs.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub path: PathBuf,
    pub video_codec: String,
    pub audio_codec: String,
    pub frame_rate: u32,
}

/// Everything needed to run an export, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub video_clips: Vec<VideoClip>,

    /// Audio sources; entry `i` is process input `i + 1` of the final pass.
    pub audio_inputs: Vec<PathBuf>,

    pub audio_graph: FilterGraph,

    /// Where the concat script is written before the final pass.
    pub concat_script_path: PathBuf,

    pub output: OutputSpec,

    fade_duration: f64,
    sliver_encoder: String,
    sliver_preset: String,
}

impl RenderPlan {
    pub fn concat_script(&self) -> ConcatScript {
        ConcatScript::new(self.video_clips.iter().map(VideoClip::concat_entry).collect())
    }

    /// Re-encode steps for the fade slivers, to run before the final pass.
    pub fn sliver_invocations(&self) -> Vec<TranscodeInvocation> {
        self.video_clips
            .iter()
            .filter_map(|clip| {
                let (segment, source, start, end, output, step, fade) = match clip {
                    VideoClip::FadeIn {
                        segment,
                        source,
                        start,
                        end,
                        output,
                    } => (
                        segment,
                        source,
                        start,
                        end,
                        output,
                        "fade-in",
                        Filter::new("fade")
                            .arg("in")
                            .kv("st", 0)
                            .kv("d", self.fade_duration),
                    ),
                    VideoClip::FadeOut {
                        segment,
                        source,
                        start,
                        end,
                        fade_start,
                        output,
                    } => (
                        segment,
                        source,
                        start,
                        end,
                        output,
                        "fade-out",
                        Filter::new("fade")
                            .arg("out")
                            .kv("st", secs(*fade_start))
                            .kv("d", self.fade_duration),
                    ),
                    _ => return None,
                };
                let title = format!("Segment {segment}: {step}");

                Some(
                    TranscodeInvocation::new(title, output)
                        .input(
                            TranscodeInput::new(source)
                                .option("-ss", secs(*start))
                                .option("-to", secs(*end)),
                        )
                        .video_filter(
                            FilterChain::new()
                                .then(fade)
                                .then(Filter::new("setpts").arg("PTS-STARTPTS")),
                        )
                        .output_flag("-an")
                        .output_option("-c:v", self.sliver_encoder.clone())
                        .output_option("-preset", self.sliver_preset.clone()),
                )
            })
            .collect()
    }

    /// The final concat-and-mix pass.
    pub fn final_invocation(&self) -> TranscodeInvocation {
        let mut invocation = TranscodeInvocation::new("Final assembly", &self.output.path).input(
            TranscodeInput::new(&self.concat_script_path)
                .option("-f", "concat")
                .option("-safe", "0"),
        );
        for audio in &self.audio_inputs {
            invocation = invocation.input(TranscodeInput::new(audio));
        }
        invocation
            .filter_complex(self.audio_graph.clone())
            .output_option("-map", format!("{CONCAT_INPUT}:v"))
            .output_option("-map", format!("[{FINAL_AUDIO}]"))
            .output_option("-c:v", self.output.video_codec.clone())
            .output_option("-r", self.output.frame_rate.to_string())
            .output_option("-c:a", self.output.audio_codec.clone())
            .output_option("-movflags", "+faststart")
    }

    /// Length of the exported video: intro plus every segment's
    /// `end - start`.
    pub fn video_duration(&self) -> f64 {
        self.video_clips.iter().map(VideoClip::duration).sum()
    }

    /// Intermediate files this plan creates.
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        self.video_clips
            .iter()
            .filter_map(|clip| match clip {
                VideoClip::FadeIn { output, .. } | VideoClip::FadeOut { output, .. } => {
                    Some(output.clone())
                }
                _ => None,
            })
            .chain(std::iter::once(self.concat_script_path.clone()))
            .collect()
    }
}

/// Builds [`RenderPlan`]s from resolved segments.
#[derive(Debug, Clone)]
pub struct RenderPlanCompiler {
    editor: EditorConfig,
}

impl RenderPlanCompiler {
    pub fn new(editor: EditorConfig) -> Self {
        Self { editor }
    }

    /// Compile a plan. Slivers and the concat script are placed in
    /// `scratch_dir`; compiling the same inputs twice yields the same plan.
    pub fn compile(
        &self,
        intro: &IntroClip,
        segments: &[ResolvedSegment],
        scratch_dir: &Path,
        output_path: PathBuf,
    ) -> SeamcutResult<RenderPlan> {
        if segments.is_empty() {
            return Err(InputValidationError::MissingPrimarySource.into());
        }

        let mut video_clips = vec![VideoClip::Intro {
            path: intro.path.clone(),
            duration: intro.duration,
        }];
        let mut audio_inputs = vec![intro.path.clone()];
        let mut audio_graph = FilterGraph::new();
        let mut concat_pads = vec![PadRef::audio(INTRO_INPUT)];

        for (i, resolved) in segments.iter().enumerate() {
            let seg = resolved.segment();
            let n = resolved.index();

            video_clips.push(VideoClip::FadeIn {
                segment: n,
                source: seg.video.clone(),
                start: resolved.start(),
                end: resolved.start_split(),
                output: scratch_dir.join(format!("segment{n}_fade_in.mkv")),
            });
            video_clips.push(VideoClip::Body {
                segment: n,
                source: seg.video.clone(),
                inpoint: resolved.start_split(),
                outpoint: resolved.end_split(),
            });
            video_clips.push(VideoClip::FadeOut {
                segment: n,
                source: seg.video.clone(),
                start: resolved.end_split(),
                end: resolved.end(),
                fade_start: resolved.fade_out_offset(),
                output: scratch_dir.join(format!("segment{n}_fade_out.mkv")),
            });

            audio_inputs.push(seg.audio.clone());
            let input = INTRO_INPUT + 1 + i;
            for node in self.segment_audio_nodes(i, input, resolved) {
                audio_graph.push(node);
            }
            concat_pads.extend(
                ["fi", "mb", "fo"]
                    .iter()
                    .map(|part| PadRef::label(format!("aud{i}{part}"))),
            );
        }

        let parts = concat_pads.len();
        audio_graph.push(
            FilterNode::new()
                .inputs(concat_pads)
                .filter(
                    Filter::new("concat")
                        .kv("n", parts)
                        .kv("v", 0)
                        .kv("a", 1),
                )
                .output(FINAL_AUDIO),
        );

        let plan = RenderPlan {
            video_clips,
            audio_inputs,
            audio_graph,
            concat_script_path: scratch_dir.join("concat.txt"),
            output: OutputSpec {
                path: output_path,
                video_codec: "copy".to_string(),
                audio_codec: self.editor.final_audio_codec.clone(),
                frame_rate: self.editor.output_fps,
            },
            fade_duration: self.editor.fade_duration_secs,
            sliver_encoder: self.editor.video_encoder.clone(),
            sliver_preset: self.editor.sliver_preset.clone(),
        };

        tracing::debug!(
            clips = plan.video_clips.len(),
            audio_inputs = plan.audio_inputs.len(),
            duration_secs = plan.video_duration(),
            "Compiled render plan"
        );
        Ok(plan)
    }

    /// `asplit` the segment's audio into the three parts matching its video
    /// clips; fade the outer two.
    fn segment_audio_nodes(
        &self,
        i: usize,
        input: usize,
        resolved: &ResolvedSegment,
    ) -> Vec<FilterNode> {
        let fade = self.editor.fade_duration_secs;
        let trim = |start: f64, end: f64| {
            Filter::new("atrim")
                .kv("start", secs(start))
                .kv("end", secs(end))
        };
        let reset = || Filter::new("asetpts").arg("PTS-STARTPTS");

        vec![
            FilterNode::new()
                .input(PadRef::audio(input))
                .filter(Filter::new("asplit").arg(3))
                .output(format!("aud{i}s1"))
                .output(format!("aud{i}s2"))
                .output(format!("aud{i}s3")),
            FilterNode::new()
                .input(PadRef::label(format!("aud{i}s1")))
                .filter(trim(resolved.start(), resolved.start_split()))
                .filter(reset())
                .filter(Filter::new("afade").kv("t", "in").kv("st", 0).kv("d", fade))
                .output(format!("aud{i}fi")),
            FilterNode::new()
                .input(PadRef::label(format!("aud{i}s2")))
                .filter(trim(resolved.start_split(), resolved.end_split()))
                .filter(reset())
                .output(format!("aud{i}mb")),
            FilterNode::new()
                .input(PadRef::label(format!("aud{i}s3")))
                .filter(trim(resolved.end_split(), resolved.end()))
                .filter(reset())
                .filter(
                    Filter::new("afade")
                        .kv("t", "out")
                        .kv("st", secs(resolved.fade_out_offset()))
                        .kv("d", fade),
                )
                .output(format!("aud{i}fo")),
        ]
    }
}

/// Resolve where the export is written.
///
/// Directory: the request's `output_dir`, else the configured one, else the
/// directory of the primary video. It must already exist. File name:
/// `<resolution>_<primary stem>_<suffix>.<extension>`.
pub fn output_path(
    request: &EditRequest,
    config: &AppConfig,
) -> Result<PathBuf, InputValidationError> {
    let primary = request.primary_video();
    let dir = request
        .output_dir
        .clone()
        .or_else(|| config.paths.output_dir.clone())
        .unwrap_or_else(|| match primary.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        });

    if !dir.is_dir() {
        return Err(InputValidationError::OutputDirectoryInvalid { path: dir });
    }

    let stem = primary
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = format!(
        "{}_{}_{}.{}",
        request.intro_resolution.tag(),
        stem,
        config.editor.output_suffix,
        config.editor.output_extension
    );
    Ok(dir.join(name))
}
