//! Application configuration.
//!
//! Built once at startup and shared read-only (behind an `Arc`) with every
//! component. Nothing downstream reads ambient global state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SeamcutError, SeamcutResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Edit and final-export parameters.
    pub editor: EditorConfig,

    /// Intro lookup and preparation.
    pub intro: IntroConfig,

    /// Scrub-preview rendering.
    pub preview: PreviewConfig,

    /// Keyframe sidecar cache.
    pub keyframes: KeyframeCacheConfig,

    /// Scratch and output locations.
    pub paths: PathsConfig,

    /// External tool binaries.
    pub tools: ToolsConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Parameters of the keyframe-aligned export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Length of every fade transition, in seconds.
    pub fade_duration_secs: f64,

    /// Frame rate the final output is pinned to.
    pub output_fps: u32,

    /// Encoder used for re-encoded fade slivers and intro preparation.
    pub video_encoder: String,

    /// Encoder preset for fade slivers.
    pub sliver_preset: String,

    /// Uncompressed codec for the final audio track.
    pub final_audio_codec: String,

    /// Suffix appended to the output file stem.
    pub output_suffix: String,

    /// Output container extension.
    pub output_extension: String,
}

/// Where the intro lives and how to prepare it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntroConfig {
    /// Directory holding the intro source and prepared variants.
    pub directory: PathBuf,

    /// File stem shared by the intro source and its prepared variants.
    pub base_name: String,

    /// Encoder preset used when scaling the intro.
    pub preset: String,

    /// Intro resolution tag used when a request does not pick one.
    pub default_resolution: String,
}

/// Scrub-preview parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Length of one preview window, in seconds.
    pub fragment_duration_secs: f64,

    /// How far before the needed source range the decoder seeks.
    pub seek_buffer_secs: f64,

    pub video_encoder: String,
    pub preset: String,
    pub tune: String,
    pub crf: u32,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

/// Keyframe sidecar cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyframeCacheConfig {
    /// Suffix appended to the source path to form the sidecar path.
    pub sidecar_suffix: String,

    /// Rebuild a sidecar whose recorded content signature no longer matches
    /// the source file.
    pub validate_signature: bool,
}

/// Scratch and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Scratch directory for intermediate artifacts.
    pub scratch_dir: PathBuf,

    /// RAM-backed scratch directory, used when a request asks for it and the
    /// directory exists.
    pub ram_scratch_dir: PathBuf,

    /// Default output directory. Falls back to the primary source's directory.
    pub output_dir: Option<PathBuf>,
}

/// External tool binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "seamcut=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            fade_duration_secs: 1.0,
            output_fps: 60,
            video_encoder: "libx264".to_string(),
            sliver_preset: "ultrafast".to_string(),
            final_audio_codec: "pcm_s16le".to_string(),
            output_suffix: "final_edit".to_string(),
            output_extension: "mkv".to_string(),
        }
    }
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            directory: home_dir().join("Documents").join("seamcut"),
            base_name: "intro_new_sponsored".to_string(),
            preset: "medium".to_string(),
            default_resolution: "2k".to_string(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            fragment_duration_secs: 10.0,
            seek_buffer_secs: 10.0,
            video_encoder: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            tune: "zerolatency".to_string(),
            crf: 30,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
        }
    }
}

impl Default for KeyframeCacheConfig {
    fn default() -> Self {
        Self {
            sidecar_suffix: ".keyframes.txt".to_string(),
            validate_signature: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("seamcut"),
            ram_scratch_dir: PathBuf::from("/dev/shm"),
            output_dir: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Errors are returned, not swallowed.
    pub fn load_from(path: &Path) -> SeamcutResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SeamcutError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            SeamcutError::config(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no plan could be built from.
    pub fn validate(&self) -> SeamcutResult<()> {
        if !(self.editor.fade_duration_secs > 0.0) {
            return Err(SeamcutError::config("editor.fade_duration_secs must be positive"));
        }
        if self.editor.output_fps == 0 {
            return Err(SeamcutError::config("editor.output_fps must be positive"));
        }
        if !(self.preview.fragment_duration_secs > 0.0) {
            return Err(SeamcutError::config(
                "preview.fragment_duration_secs must be positive",
            ));
        }
        if self.preview.seek_buffer_secs < 0.0 {
            return Err(SeamcutError::config(
                "preview.seek_buffer_secs must not be negative",
            ));
        }
        Ok(())
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    base.join("seamcut").join("config.json")
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}
