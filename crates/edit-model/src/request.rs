//! Edit requests: the loose wire form and the validated form the core uses.
//!
//! [`EditParams`] mirrors what a client sends (every field optional, empty
//! strings meaning "not chosen"). [`EditParams::validate`] turns it into an
//! [`EditRequest`] or an [`InputValidationError`]; nothing past this module
//! sees unvalidated input.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use seamcut_common::error::InputValidationError;
use seamcut_common::timecode::parse_timecode;

use crate::media::Resolution;
use crate::segment::Segment;

/// Whether the two segments come from one file or from two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Both segments are cut from `video1`.
    #[default]
    Single,
    /// Segment 2 is cut from `video2`.
    Two,
}

impl FromStr for EditMode {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "single" => Ok(Self::Single),
            "two" => Ok(Self::Two),
            other => Err(InputValidationError::UnknownMode(other.to_string())),
        }
    }
}

/// Target resolution of the prepared intro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IntroResolution {
    #[serde(rename = "fullhd")]
    FullHd,
    #[default]
    #[serde(rename = "2k")]
    TwoK,
}

impl IntroResolution {
    /// Tag used in file names and on the wire.
    pub fn tag(self) -> &'static str {
        match self {
            Self::FullHd => "fullhd",
            Self::TwoK => "2k",
        }
    }

    pub fn dimensions(self) -> Resolution {
        match self {
            Self::FullHd => Resolution::FULL_HD,
            Self::TwoK => Resolution::QHD,
        }
    }
}

impl FromStr for IntroResolution {
    type Err = InputValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "fullhd" => Ok(Self::FullHd),
            "2k" => Ok(Self::TwoK),
            other => Err(InputValidationError::UnknownIntroResolution(
                other.to_string(),
            )),
        }
    }
}

/// Edit parameters exactly as a client supplies them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditParams {
    pub mode: Option<String>,
    pub is_single_segment: bool,
    pub intro_resolution: Option<String>,
    pub intro_file: Option<String>,
    pub video1: Option<String>,
    pub video2: Option<String>,
    pub audio1: Option<String>,
    pub audio2: Option<String>,
    pub start1: Option<String>,
    pub end1: Option<String>,
    pub start2: Option<String>,
    pub end2: Option<String>,
    pub use_ram: bool,
    pub output_dir: Option<String>,
}

/// A validated edit request.
#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub mode: EditMode,
    pub intro_resolution: IntroResolution,

    /// Intro source explicitly chosen by the user.
    pub intro_file: Option<PathBuf>,

    /// One or two segments, in output order.
    pub segments: Vec<Segment>,

    /// Keep scratch artifacts on a RAM disk when one is available.
    pub use_ram: bool,

    pub output_dir: Option<PathBuf>,
}

impl EditRequest {
    /// The first segment's video, which names the output file.
    pub fn primary_video(&self) -> &PathBuf {
        &self.segments[0].video
    }
}

fn chosen(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn chosen_path(value: &Option<String>) -> Option<PathBuf> {
    chosen(value).map(PathBuf::from)
}

fn timecode(field: &str, value: &Option<String>) -> Result<f64, InputValidationError> {
    parse_timecode(field, value.as_deref().unwrap_or(""))
}

impl EditParams {
    /// Validate and normalize into an [`EditRequest`].
    ///
    /// `default_resolution` applies when the client did not pick one.
    ///
    /// Audio source fallback, per segment:
    /// - segment 1: `audio1`, else `video1`
    /// - segment 2: `audio2`, else `audio1` (single-file mode only), else the
    ///   segment's own video
    pub fn validate(
        &self,
        default_resolution: IntroResolution,
    ) -> Result<EditRequest, InputValidationError> {
        let mode = match chosen(&self.mode) {
            Some(raw) => raw.parse::<EditMode>()?,
            None => EditMode::default(),
        };
        let intro_resolution = match chosen(&self.intro_resolution) {
            Some(raw) => raw.parse::<IntroResolution>()?,
            None => default_resolution,
        };

        let video1 = chosen_path(&self.video1).ok_or(InputValidationError::MissingPrimarySource)?;
        let audio1 = chosen_path(&self.audio1);

        let mut segments = vec![Segment {
            index: 1,
            video: video1.clone(),
            audio: audio1.clone().unwrap_or_else(|| video1.clone()),
            start: timecode("start1", &self.start1)?,
            end: timecode("end1", &self.end1)?,
        }];

        let single_segment = self.is_single_segment && mode == EditMode::Single;
        if !single_segment {
            let video2 = match mode {
                EditMode::Single => video1.clone(),
                EditMode::Two => chosen_path(&self.video2)
                    .ok_or(InputValidationError::MissingSecondarySource)?,
            };
            let audio2 = chosen_path(&self.audio2)
                .or_else(|| match mode {
                    EditMode::Single => audio1.clone(),
                    EditMode::Two => None,
                })
                .unwrap_or_else(|| video2.clone());

            segments.push(Segment {
                index: 2,
                video: video2,
                audio: audio2,
                start: timecode("start2", &self.start2)?,
                end: timecode("end2", &self.end2)?,
            });
        }

        Ok(EditRequest {
            mode,
            intro_resolution,
            intro_file: chosen_path(&self.intro_file),
            segments,
            use_ram: self.use_ram,
            output_dir: chosen_path(&self.output_dir),
        })
    }
}
