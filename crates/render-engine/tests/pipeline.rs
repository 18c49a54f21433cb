mod support;

use std::path::PathBuf;
use std::sync::Arc;

use seamcut_common::error::{InputValidationError, SeamcutError};
use seamcut_edit_model::request::EditParams;
use seamcut_edit_model::timeline::EntryKind;
use seamcut_render_engine::transcoder::null_sink;

use support::{
    recording_sink, FakeProber, FakeTranscoder, Workspace, INTRO_DURATION, PREVIEW_DURATION,
};

#[tokio::test]
async fn export_runs_slivers_then_final_and_cleans_scratch() {
    let prober = Arc::new(FakeProber::new());
    let transcoder = Arc::new(FakeTranscoder::new());
    let ws = Workspace::new().with_prepared_intro(&prober);
    let pipeline = ws.pipeline(prober.clone(), transcoder.clone());

    let (log, lines) = recording_sink();
    let report = pipeline.export(&ws.single_segment(), &log).await.unwrap();

    assert_eq!(
        report.output,
        ws.root.path().join("2k_lecture_final_edit.mkv")
    );
    // 5s intro + the full 60s segment window.
    assert!((report.duration_secs - (INTRO_DURATION + 60.0)).abs() < 1e-9);
    assert!(report.cleanup_warnings.is_empty());
    assert!(report.finished_at >= report.started_at);

    assert_eq!(
        transcoder.titles(),
        ["Segment 1: fade-in", "Segment 1: fade-out", "Final assembly"]
    );
    assert!(ws.scratch_entries().is_empty());

    let sidecar = PathBuf::from(format!("{}.keyframes.txt", ws.source.display()));
    assert!(sidecar.is_file());

    let lines = lines.lock().unwrap();
    assert!(lines.iter().any(|l| l == "Split points: 12.000 -> 68.000"));
    assert!(lines.iter().any(|l| l.starts_with("Done: ")));
}

#[tokio::test]
async fn two_segment_export_renders_four_slivers() {
    let prober = Arc::new(FakeProber::new());
    let transcoder = Arc::new(FakeTranscoder::new());
    let ws = Workspace::new().with_prepared_intro(&prober);
    let pipeline = ws.pipeline(prober, transcoder.clone());

    let report = pipeline.export(&ws.two_segments(), &null_sink()).await.unwrap();

    assert!((report.duration_secs - (INTRO_DURATION + 120.0)).abs() < 1e-9);
    assert_eq!(transcoder.runs().len(), 5);

    let final_run = transcoder.runs().pop().unwrap();
    let args = final_run.to_args();
    assert!(args.iter().any(|a| a == "+faststart"));
    assert!(args.iter().any(|a| a == "pcm_s16le"));
}

#[tokio::test]
async fn missing_prepared_intro_is_built_from_default_source() {
    let prober = Arc::new(FakeProber::new());
    let transcoder = Arc::new(FakeTranscoder::new());
    let ws = Workspace::new();
    let source = ws.config.intro.directory.join("intro_new_sponsored.mp4");
    std::fs::write(&source, b"intro source").unwrap();
    prober.set_duration(ws.prepared_intro(), INTRO_DURATION);
    let pipeline = ws.pipeline(prober, transcoder.clone());

    pipeline.export(&ws.single_segment(), &null_sink()).await.unwrap();

    let runs = transcoder.runs();
    assert_eq!(runs[0].title, "Preparing 2k intro");
    assert_eq!(runs[0].inputs[0].path, source);
    assert_eq!(runs[0].output, ws.prepared_intro());
    assert!(ws.prepared_intro().is_file());
}

#[tokio::test]
async fn export_without_any_intro_fails_before_transcoding() {
    let prober = Arc::new(FakeProber::new());
    let transcoder = Arc::new(FakeTranscoder::new());
    let ws = Workspace::new();
    let pipeline = ws.pipeline(prober, transcoder.clone());

    let err = pipeline
        .export(&ws.single_segment(), &null_sink())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SeamcutError::InputValidation(InputValidationError::IntroUnavailable)
    ));
    assert!(transcoder.runs().is_empty());
    assert!(ws.scratch_entries().is_empty());
}

#[tokio::test]
async fn segment_without_room_for_fades_is_rejected() {
    let prober = Arc::new(FakeProber::new());
    let transcoder = Arc::new(FakeTranscoder::new());
    let ws = Workspace::new().with_prepared_intro(&prober);
    let pipeline = ws.pipeline(prober, transcoder.clone());

    let params = EditParams {
        start1: Some("00:00:10".to_string()),
        end1: Some("00:00:12".to_string()),
        ..ws.single_segment()
    };
    let err = pipeline.export(&params, &null_sink()).await.unwrap_err();

    assert_eq!(err.kind(), "insufficient_segment_length");
    assert!(transcoder.runs().is_empty());
    assert!(ws.scratch_entries().is_empty());
}

#[tokio::test]
async fn failed_final_pass_still_removes_scratch_files() {
    let prober = Arc::new(FakeProber::new());
    let transcoder = Arc::new(FakeTranscoder::failing_on("Final assembly"));
    let ws = Workspace::new().with_prepared_intro(&prober);
    let pipeline = ws.pipeline(prober, transcoder.clone());

    let err = pipeline
        .export(&ws.two_segments(), &null_sink())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "transcode");
    assert_eq!(transcoder.runs().len(), 5);
    assert!(ws.scratch_entries().is_empty());
}

#[tokio::test]
async fn missing_output_directory_is_rejected() {
    let prober = Arc::new(FakeProber::new());
    let transcoder = Arc::new(FakeTranscoder::new());
    let ws = Workspace::new().with_prepared_intro(&prober);
    let pipeline = ws.pipeline(prober, transcoder.clone());

    let params = EditParams {
        output_dir: Some(ws.root.path().join("nowhere").to_string_lossy().into_owned()),
        ..ws.single_segment()
    };
    let err = pipeline.export(&params, &null_sink()).await.unwrap_err();

    assert!(matches!(
        err,
        SeamcutError::InputValidation(InputValidationError::OutputDirectoryInvalid { .. })
    ));
    assert!(transcoder.runs().is_empty());
}

#[tokio::test]
async fn timeline_map_places_intro_then_segments() {
    let prober = Arc::new(FakeProber::new());
    let transcoder = Arc::new(FakeTranscoder::new());
    let ws = Workspace::new().with_prepared_intro(&prober);
    let pipeline = ws.pipeline(prober, transcoder.clone());

    let map = pipeline.timeline_map(&ws.two_segments()).await.unwrap();

    assert_eq!(map.entries.len(), 3);
    assert_eq!(map.entries[0].kind, EntryKind::Intro);
    assert_eq!(map.entries[1].id, "segment1");
    assert_eq!(map.entries[1].timeline_start, INTRO_DURATION);
    assert_eq!(map.entries[1].source_start_time, 10.0);
    assert_eq!(map.entries[2].id, "segment2");
    assert_eq!(map.entries[2].timeline_start, INTRO_DURATION + 60.0);
    assert_eq!(map.entries[2].source_start_time, 120.0);
    assert_eq!(map.total_duration, INTRO_DURATION + 120.0);
    assert!(transcoder.runs().is_empty());
}

#[tokio::test]
async fn timeline_map_without_intro_and_open_ended_segment() {
    let prober = Arc::new(FakeProber::new());
    let ws = Workspace::new();
    let pipeline = ws.pipeline(prober, Arc::new(FakeTranscoder::new()));

    let params = EditParams {
        end1: Some(String::new()),
        ..ws.single_segment()
    };
    let map = pipeline.timeline_map(&params).await.unwrap();

    assert_eq!(map.entries.len(), 1);
    assert_eq!(map.entries[0].timeline_start, 0.0);
    // Runs to the end of the 300s source.
    assert_eq!(map.total_duration, 290.0);
}

#[tokio::test]
async fn preview_fragment_renders_window_into_scratch() {
    let prober = Arc::new(FakeProber::new());
    let transcoder = Arc::new(FakeTranscoder::new());
    let ws = Workspace::new().with_prepared_intro(&prober);
    let pipeline = ws.pipeline(prober, transcoder.clone());

    let fragment = pipeline
        .preview_fragment(&ws.single_segment(), 0.0, &null_sink())
        .await
        .unwrap()
        .expect("window overlaps the intro");

    assert_eq!(fragment.start_time, 0.0);
    assert_eq!(fragment.duration, PREVIEW_DURATION);
    assert!(fragment.path.starts_with(&ws.config.paths.scratch_dir));
    assert!(fragment.path.is_file());

    let runs = transcoder.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].inputs.len(), 2);
    assert_eq!(runs[0].inputs[0].path, ws.prepared_intro());
    assert_eq!(runs[0].inputs[1].path, ws.source);
}

#[tokio::test]
async fn preview_past_the_end_renders_nothing() {
    let prober = Arc::new(FakeProber::new());
    let transcoder = Arc::new(FakeTranscoder::new());
    let ws = Workspace::new().with_prepared_intro(&prober);
    let pipeline = ws.pipeline(prober, transcoder.clone());

    let fragment = pipeline
        .preview_fragment(&ws.single_segment(), 500.0, &null_sink())
        .await
        .unwrap();

    assert!(fragment.is_none());
    assert!(transcoder.runs().is_empty());
}

#[tokio::test]
async fn failed_preview_removes_partial_output() {
    let prober = Arc::new(FakeProber::new());
    let transcoder = Arc::new(FakeTranscoder::failing_on("Preview"));
    let ws = Workspace::new().with_prepared_intro(&prober);
    let pipeline = ws.pipeline(prober, transcoder.clone());

    let err = pipeline
        .preview_fragment(&ws.single_segment(), 20.0, &null_sink())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "transcode");
    assert_eq!(transcoder.runs().len(), 1);
    assert!(ws.scratch_entries().is_empty());
}
