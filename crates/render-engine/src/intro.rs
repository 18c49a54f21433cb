//! Intro lookup and preparation.
//!
//! The prepared intro for a resolution lives at
//! `<intro dir>/<base>_<resolution>.mkv`. When it is missing it is scaled
//! from a source intro: the user's chosen file, else `<base>.mkv`, else
//! `<base>.mp4` in the intro directory.

use std::path::{Path, PathBuf};

use seamcut_common::config::IntroConfig;
use seamcut_common::error::{InputValidationError, SeamcutResult};
use seamcut_edit_model::request::{EditRequest, IntroResolution};

use crate::filter_graph::{Filter, FilterChain};
use crate::transcoder::{LogSink, TranscodeInput, TranscodeInvocation, Transcoder};

#[derive(Debug, Clone)]
pub struct IntroLocator {
    config: IntroConfig,
    video_encoder: String,
}

impl IntroLocator {
    pub fn new(config: IntroConfig, video_encoder: impl Into<String>) -> Self {
        Self {
            config,
            video_encoder: video_encoder.into(),
        }
    }

    pub fn prepared_path(&self, resolution: IntroResolution) -> PathBuf {
        self.config.directory.join(format!(
            "{}_{}.mkv",
            self.config.base_name,
            resolution.tag()
        ))
    }

    /// Candidate sources for preparation, in priority order.
    pub fn source_candidates(&self, user_intro: Option<&Path>) -> Vec<PathBuf> {
        let dir = &self.config.directory;
        let base = &self.config.base_name;
        user_intro
            .map(Path::to_path_buf)
            .into_iter()
            .chain([
                dir.join(format!("{base}.mkv")),
                dir.join(format!("{base}.mp4")),
            ])
            .collect()
    }

    /// The intro shown on the preview timeline. Follows the same order as
    /// [`ensure_prepared`](Self::ensure_prepared): an already-prepared intro,
    /// else the user's file it would be prepared from. Never prepares one.
    pub fn timeline_intro(&self, request: &EditRequest) -> Option<PathBuf> {
        Some(self.prepared_path(request.intro_resolution))
            .filter(|p| p.is_file())
            .or_else(|| request.intro_file.clone().filter(|p| p.is_file()))
    }

    /// Scale `source` to `resolution` into the prepared path.
    pub fn preparation(&self, source: &Path, resolution: IntroResolution) -> TranscodeInvocation {
        let dims = resolution.dimensions();
        TranscodeInvocation::new(
            format!("Preparing {} intro", resolution.tag()),
            self.prepared_path(resolution),
        )
        .input(TranscodeInput::new(source))
        .video_filter(FilterChain::new().then(Filter::new("scale").arg(dims.width).arg(dims.height)))
        .output_option("-c:v", self.video_encoder.clone())
        .output_option("-preset", self.config.preset.clone())
        .output_option("-c:a", "copy")
    }

    /// Return the prepared intro for the request, preparing it first if
    /// needed.
    pub async fn ensure_prepared(
        &self,
        request: &EditRequest,
        transcoder: &dyn Transcoder,
        log: &LogSink,
    ) -> SeamcutResult<PathBuf> {
        let prepared = self.prepared_path(request.intro_resolution);
        if prepared.is_file() {
            return Ok(prepared);
        }

        log(&format!(
            "Intro {} not found, looking for a source",
            prepared.display()
        ));
        // A user-chosen intro is trusted as-is; defaults must exist.
        let source = match &request.intro_file {
            Some(user) => user.clone(),
            None => self
                .source_candidates(None)
                .into_iter()
                .find(|p| p.is_file())
                .ok_or(InputValidationError::IntroUnavailable)?,
        };

        tokio::fs::create_dir_all(&self.config.directory).await?;
        tracing::info!(
            source = %source.display(),
            target = %prepared.display(),
            "Preparing intro"
        );
        transcoder
            .run(&self.preparation(&source, request.intro_resolution), log)
            .await?;
        Ok(prepared)
    }
}
