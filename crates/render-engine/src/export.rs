//! The edit pipeline: timeline maps, preview fragments, and full exports.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use seamcut_common::config::AppConfig;
use seamcut_common::error::{CleanupWarning, SeamcutError, SeamcutResult};
use seamcut_edit_model::request::{EditParams, EditRequest, IntroResolution};
use seamcut_edit_model::segment::{ResolvedSegment, Segment};
use seamcut_edit_model::timeline::{map_timeline, TimelineMap, TimelineSpan};
use seamcut_processing_core::keyframes::KeyframeCache;
use seamcut_processing_core::probe::MediaProber;
use seamcut_processing_core::split::SplitPointResolver;

use crate::intro::IntroLocator;
use crate::plan::{self, IntroClip, RenderPlanCompiler};
use crate::preview::PreviewWindowCompiler;
use crate::transcoder::{LogSink, Transcoder};

/// Outcome of a successful export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub output: PathBuf,
    pub duration_secs: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cleanup_warnings: Vec<CleanupWarning>,
}

/// A rendered preview window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewFragment {
    /// Requested timeline position.
    pub start_time: f64,
    /// Measured length of the rendered file.
    pub duration: f64,
    pub path: PathBuf,
}

/// Runs every request type against shared collaborators.
///
/// The pipeline holds no per-request state; concurrent calls share only the
/// on-disk keyframe cache.
pub struct EditPipeline {
    config: Arc<AppConfig>,
    prober: Arc<dyn MediaProber>,
    transcoder: Arc<dyn Transcoder>,
    keyframes: KeyframeCache,
    intro: IntroLocator,
    resolver: SplitPointResolver,
    plans: RenderPlanCompiler,
    previews: PreviewWindowCompiler,
}

impl EditPipeline {
    pub fn new(
        config: Arc<AppConfig>,
        prober: Arc<dyn MediaProber>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            keyframes: KeyframeCache::new(prober.clone(), config.keyframes.clone()),
            intro: IntroLocator::new(config.intro.clone(), config.editor.video_encoder.clone()),
            resolver: SplitPointResolver::from_config(&config.editor),
            plans: RenderPlanCompiler::new(config.editor.clone()),
            previews: PreviewWindowCompiler::new(
                config.preview.clone(),
                config.editor.fade_duration_secs,
            ),
            config,
            prober,
            transcoder,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn keyframes(&self) -> &KeyframeCache {
        &self.keyframes
    }

    pub fn resolver(&self) -> &SplitPointResolver {
        &self.resolver
    }

    pub fn prober(&self) -> &dyn MediaProber {
        self.prober.as_ref()
    }

    pub fn transcoder(&self) -> &dyn Transcoder {
        self.transcoder.as_ref()
    }

    /// Validate client parameters against the configured defaults.
    pub fn validate(&self, params: &EditParams) -> SeamcutResult<EditRequest> {
        let default_resolution = self
            .config
            .intro
            .default_resolution
            .parse::<IntroResolution>()
            .map_err(|e| SeamcutError::config(format!("intro.default_resolution: {e}")))?;
        Ok(params.validate(default_resolution)?)
    }

    /// Snap a segment to keyframes, filling in a missing out-point first.
    pub async fn resolve_segment(&self, segment: &Segment) -> SeamcutResult<ResolvedSegment> {
        let segment = if segment.has_end() {
            segment.clone()
        } else {
            let media_duration = self.prober.duration(&segment.video).await?;
            segment.with_effective_end(media_duration)
        };
        let index = self.keyframes.load_or_build(&segment.video).await?;
        self.resolver.resolve(&segment, &index)
    }

    /// Build the timeline map used for scrubbing.
    pub async fn timeline_map(&self, params: &EditParams) -> SeamcutResult<TimelineMap> {
        let request = self.validate(params)?;
        self.map_request(&request).await
    }

    async fn map_request(&self, request: &EditRequest) -> SeamcutResult<TimelineMap> {
        let intro = match self.intro.timeline_intro(request) {
            Some(path) => match self.prober.duration(&path).await {
                Ok(duration) => Some(TimelineSpan::intro(path, duration)),
                Err(e) => {
                    tracing::warn!(error = %e, "Leaving unprobeable intro off the timeline");
                    None
                }
            },
            None => None,
        };

        let mut spans = Vec::with_capacity(request.segments.len());
        for segment in &request.segments {
            let media_duration = if segment.has_end() {
                segment.end
            } else {
                self.prober.duration(&segment.video).await?
            };
            spans.push(TimelineSpan::segment(segment, media_duration));
        }

        let map = map_timeline(intro, spans);
        tracing::debug!(
            entries = map.entries.len(),
            total_duration = map.total_duration,
            "Built timeline map"
        );
        Ok(map)
    }

    /// Render the preview window starting at `start_time`. Returns `None`
    /// when nothing on the timeline falls inside the window.
    pub async fn preview_fragment(
        &self,
        params: &EditParams,
        start_time: f64,
        log: &LogSink,
    ) -> SeamcutResult<Option<PreviewFragment>> {
        let request = self.validate(params)?;
        let map = self.map_request(&request).await?;
        if map.is_empty() {
            return Ok(None);
        }

        let mut resolutions = HashMap::new();
        for entry in &map.entries {
            if resolutions.contains_key(&entry.source_file) {
                continue;
            }
            match self.prober.resolution(&entry.source_file).await {
                Ok(res) => {
                    resolutions.insert(entry.source_file.clone(), res);
                }
                Err(e) => tracing::debug!(error = %e, "No resolution for preview source"),
            }
        }

        let Some(plan) = self.previews.compile_window(
            &map,
            start_time,
            self.previews.window_duration(),
            &resolutions,
        )?
        else {
            return Ok(None);
        };

        let dir = self.scratch_base(request.use_ram);
        tokio::fs::create_dir_all(&dir).await?;
        let output = dir.join(format!("preview_{}.mkv", uuid::Uuid::new_v4()));

        let rendered = async {
            self.transcoder.run(&plan.invocation(&output), log).await?;
            self.prober.duration(&output).await
        }
        .await;

        match rendered {
            Ok(duration) => Ok(Some(PreviewFragment {
                start_time,
                duration,
                path: output,
            })),
            Err(e) => {
                if let Some(warning) = remove_if_present(&output).await {
                    tracing::warn!(%warning, "Failed to remove partial preview");
                }
                Err(e)
            }
        }
    }

    /// Run a full export. Scratch files are removed whether or not the
    /// export succeeds.
    pub async fn export(&self, params: &EditParams, log: &LogSink) -> SeamcutResult<ExportReport> {
        let started_at = Utc::now();
        let request = self.validate(params)?;
        let output = plan::output_path(&request, &self.config)?;

        let scratch = ScratchSpace::create(&self.scratch_base(request.use_ram)).await?;
        tracing::info!(
            output = %output.display(),
            scratch = %scratch.dir().display(),
            segments = request.segments.len(),
            "Starting export"
        );

        let result = self.render(&request, output.clone(), scratch.dir(), log).await;

        log("--- Cleanup ---");
        let cleanup_warnings = scratch.cleanup(log).await;
        let duration_secs = result?;

        log(&format!("Done: {}", output.display()));
        Ok(ExportReport {
            output,
            duration_secs,
            started_at,
            finished_at: Utc::now(),
            cleanup_warnings,
        })
    }

    async fn render(
        &self,
        request: &EditRequest,
        output: PathBuf,
        scratch_dir: &Path,
        log: &LogSink,
    ) -> SeamcutResult<f64> {
        log("--- Intro ---");
        let intro_path = self
            .intro
            .ensure_prepared(request, self.transcoder.as_ref(), log)
            .await?;
        let intro = IntroClip {
            duration: self.prober.duration(&intro_path).await?,
            path: intro_path,
        };

        let mut resolved = Vec::with_capacity(request.segments.len());
        for segment in &request.segments {
            log(&format!("--- Segment {} ---", segment.index));
            let segment = self.resolve_segment(segment).await?;
            log(&format!(
                "Split points: {:.3} -> {:.3}",
                segment.start_split(),
                segment.end_split()
            ));
            resolved.push(segment);
        }

        let plan = self.plans.compile(&intro, &resolved, scratch_dir, output)?;
        for invocation in plan.sliver_invocations() {
            self.transcoder.run(&invocation, log).await?;
        }
        tokio::fs::write(&plan.concat_script_path, plan.concat_script().to_string()).await?;
        self.transcoder.run(&plan.final_invocation(), log).await?;

        Ok(plan.video_duration())
    }

    /// The RAM disk when requested and present, else the configured scratch
    /// directory.
    fn scratch_base(&self, use_ram: bool) -> PathBuf {
        let ram = &self.config.paths.ram_scratch_dir;
        if use_ram && ram.is_dir() {
            ram.clone()
        } else {
            self.config.paths.scratch_dir.clone()
        }
    }
}

/// A private per-export directory for intermediate artifacts.
struct ScratchSpace {
    dir: PathBuf,
}

impl ScratchSpace {
    async fn create(base: &Path) -> SeamcutResult<Self> {
        let dir = base.join(format!("seamcut-export-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove everything in the directory, then the directory. Failures are
    /// reported, never raised.
    async fn cleanup(self, log: &LogSink) -> Vec<CleanupWarning> {
        let mut warnings = Vec::new();

        match tokio::fs::read_dir(&self.dir).await {
            Ok(mut entries) => loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        let path = entry.path();
                        match remove_if_present(&path).await {
                            Some(warning) => warnings.push(warning),
                            None => log(&format!("Removed {}", path.display())),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warnings.push(CleanupWarning {
                            path: self.dir.clone(),
                            message: e.to_string(),
                        });
                        break;
                    }
                }
            },
            Err(e) => warnings.push(CleanupWarning {
                path: self.dir.clone(),
                message: e.to_string(),
            }),
        }

        if let Err(e) = tokio::fs::remove_dir(&self.dir).await {
            warnings.push(CleanupWarning {
                path: self.dir.clone(),
                message: e.to_string(),
            });
        }

        for warning in &warnings {
            tracing::warn!(%warning, "Scratch cleanup incomplete");
            log(&format!("Could not remove {}: {}", warning.path.display(), warning.message));
        }
        warnings
    }
}

async fn remove_if_present(path: &Path) -> Option<CleanupWarning> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => None,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => Some(CleanupWarning {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}
