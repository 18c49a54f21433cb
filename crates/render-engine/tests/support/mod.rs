#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use seamcut_common::config::AppConfig;
use seamcut_common::error::{SeamcutError, SeamcutResult};
use seamcut_edit_model::media::Resolution;
use seamcut_edit_model::request::EditParams;
use seamcut_processing_core::probe::{MediaProber, PacketRecord};
use seamcut_render_engine::export::EditPipeline;
use seamcut_render_engine::transcoder::{LogSink, TranscodeInvocation, Transcoder};

pub const SOURCE_DURATION: f64 = 300.0;
pub const INTRO_DURATION: f64 = 5.0;
pub const PREVIEW_DURATION: f64 = 10.0;

/// Keyframes every two seconds, one extra frame per second in between.
pub struct FakeProber {
    durations: Mutex<HashMap<PathBuf, f64>>,
}

impl FakeProber {
    pub fn new() -> Self {
        Self {
            durations: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_duration(&self, path: impl Into<PathBuf>, duration: f64) {
        self.durations.lock().unwrap().insert(path.into(), duration);
    }
}

#[async_trait::async_trait]
impl MediaProber for FakeProber {
    async fn packets(&self, _path: &Path) -> SeamcutResult<Vec<PacketRecord>> {
        Ok((0..SOURCE_DURATION as u32)
            .map(|t| PacketRecord {
                timestamp: Some(f64::from(t)),
                keyframe: t % 2 == 0,
            })
            .collect())
    }

    async fn duration(&self, path: &Path) -> SeamcutResult<f64> {
        if let Some(duration) = self.durations.lock().unwrap().get(path) {
            return Ok(*duration);
        }
        let is_preview = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with("preview_"));
        if is_preview {
            Ok(PREVIEW_DURATION)
        } else if path.exists() {
            Ok(SOURCE_DURATION)
        } else {
            Err(SeamcutError::probe(path, "no such file"))
        }
    }

    async fn resolution(&self, _path: &Path) -> SeamcutResult<Resolution> {
        Ok(Resolution::QHD)
    }
}

/// Records every invocation and touches its output file. Invocations whose
/// title contains `fail_on` leave a partial output behind and fail.
pub struct FakeTranscoder {
    runs: Mutex<Vec<TranscodeInvocation>>,
    fail_on: Option<String>,
}

impl FakeTranscoder {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    pub fn failing_on(title: &str) -> Self {
        Self {
            fail_on: Some(title.to_string()),
            ..Self::new()
        }
    }

    pub fn runs(&self) -> Vec<TranscodeInvocation> {
        self.runs.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.runs().into_iter().map(|inv| inv.title).collect()
    }
}

#[async_trait::async_trait]
impl Transcoder for FakeTranscoder {
    async fn run(&self, invocation: &TranscodeInvocation, log: &LogSink) -> SeamcutResult<()> {
        log(&format!("--- {} ---", invocation.title));
        self.runs.lock().unwrap().push(invocation.clone());
        tokio::fs::write(&invocation.output, b"rendered").await?;

        match &self.fail_on {
            Some(title) if invocation.title.contains(title.as_str()) => Err(
                SeamcutError::transcode(Some(1), format!("{} failed: boom", invocation.title)),
            ),
            _ => Ok(()),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// A temporary workspace with a source video, an intro directory, and a
/// scratch directory.
pub struct Workspace {
    pub root: tempfile::TempDir,
    pub source: PathBuf,
    pub config: AppConfig,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("lecture.mkv");
        std::fs::write(&source, b"not really video").unwrap();

        let mut config = AppConfig::default();
        config.intro.directory = root.path().join("intros");
        config.paths.scratch_dir = root.path().join("scratch");
        config.paths.ram_scratch_dir = root.path().join("no-ram-disk");
        std::fs::create_dir_all(&config.intro.directory).unwrap();

        Self {
            root,
            source,
            config,
        }
    }

    pub fn prepared_intro(&self) -> PathBuf {
        self.config.intro.directory.join("intro_new_sponsored_2k.mkv")
    }

    /// Create the prepared 2k intro and register its duration.
    pub fn with_prepared_intro(self, prober: &FakeProber) -> Self {
        std::fs::write(self.prepared_intro(), b"intro").unwrap();
        prober.set_duration(self.prepared_intro(), INTRO_DURATION);
        self
    }

    pub fn scratch_entries(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(&self.config.paths.scratch_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// One segment, 00:00:10 to 00:01:10.
    pub fn single_segment(&self) -> EditParams {
        EditParams {
            mode: Some("single".to_string()),
            is_single_segment: true,
            video1: Some(self.source.to_string_lossy().into_owned()),
            start1: Some("00:00:10".to_string()),
            end1: Some("00:01:10".to_string()),
            ..Default::default()
        }
    }

    /// Two segments from the same file: 10-70 and 120-180.
    pub fn two_segments(&self) -> EditParams {
        EditParams {
            is_single_segment: false,
            start2: Some("00:02:00".to_string()),
            end2: Some("00:03:00".to_string()),
            ..self.single_segment()
        }
    }

    pub fn pipeline(
        &self,
        prober: Arc<FakeProber>,
        transcoder: Arc<FakeTranscoder>,
    ) -> EditPipeline {
        EditPipeline::new(Arc::new(self.config.clone()), prober, transcoder)
    }
}

/// A log sink that keeps every line.
pub fn recording_sink() -> (LogSink, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink_lines = lines.clone();
    let sink: LogSink = Arc::new(move |line: &str| {
        sink_lines.lock().unwrap().push(line.to_string());
    });
    (sink, lines)
}
