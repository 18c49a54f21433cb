pub mod check;
pub mod export;
pub mod keyframes;
pub mod map;
pub mod preview;
pub mod serve;

use std::sync::Arc;

use seamcut_common::config::AppConfig;
use seamcut_processing_core::probe::FfprobeProber;
use seamcut_render_engine::export::EditPipeline;
use seamcut_render_engine::transcoder::{FfmpegTranscoder, LogSink};

/// A pipeline over the configured ffprobe/ffmpeg binaries.
pub fn pipeline(config: AppConfig) -> EditPipeline {
    let prober = Arc::new(FfprobeProber::from_config(&config.tools));
    let transcoder = Arc::new(FfmpegTranscoder::from_config(&config.tools));
    EditPipeline::new(Arc::new(config), prober, transcoder)
}

/// Print transcoder progress to stdout.
pub fn stdout_sink() -> LogSink {
    Arc::new(|line: &str| println!("  {line}"))
}
