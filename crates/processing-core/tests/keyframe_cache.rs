use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use seamcut_common::config::KeyframeCacheConfig;
use seamcut_common::error::{SeamcutError, SeamcutResult};
use seamcut_edit_model::media::Resolution;
use seamcut_edit_model::segment::Segment;
use seamcut_processing_core::keyframes::{KeyframeCache, KeyframeIndex};
use seamcut_processing_core::probe::{parse_packet_records, MediaProber, PacketRecord};
use seamcut_processing_core::split::SplitPointResolver;

fn fixture_packets() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("probe")
        .join("packets.csv");

    let content = std::fs::read_to_string(path).expect("fixture packets should be readable");
    content
        .lines()
        .filter(|line| !line.trim().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serves the fixture packet list and counts probe calls.
struct FixtureProber {
    packet_calls: AtomicUsize,
}

impl FixtureProber {
    fn new() -> Self {
        Self {
            packet_calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.packet_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MediaProber for FixtureProber {
    async fn packets(&self, path: &Path) -> SeamcutResult<Vec<PacketRecord>> {
        self.packet_calls.fetch_add(1, Ordering::SeqCst);
        parse_packet_records(path, &fixture_packets())
    }

    async fn duration(&self, _path: &Path) -> SeamcutResult<f64> {
        Ok(80.0)
    }

    async fn resolution(&self, _path: &Path) -> SeamcutResult<Resolution> {
        Ok(Resolution::QHD)
    }
}

fn source_in(dir: &tempfile::TempDir) -> PathBuf {
    let source = dir.path().join("lecture.mkv");
    std::fs::write(&source, b"not really video").unwrap();
    source
}

#[test]
fn fixture_yields_keyframes_every_two_seconds() {
    let records = parse_packet_records(Path::new("packets.csv"), &fixture_packets()).unwrap();
    assert_eq!(records.len(), 401);
    let index = KeyframeIndex::from_records(Path::new("packets.csv"), &records).unwrap();
    assert_eq!(index.len(), 40);
    assert_eq!(index.timestamps()[1], 2.0);
    assert_eq!(index.timestamps().last().copied(), Some(78.0));
}

#[tokio::test]
async fn first_load_builds_sidecar_and_second_load_reuses_it() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_in(&dir);
    let prober = Arc::new(FixtureProber::new());
    let cache = KeyframeCache::new(prober.clone(), KeyframeCacheConfig::default());

    let built = cache.load_or_build(&source).await.unwrap();
    assert_eq!(prober.calls(), 1);

    let sidecar = dir.path().join("lecture.mkv.keyframes.txt");
    let text = std::fs::read_to_string(&sidecar).unwrap();
    assert!(text.starts_with("# signature "));

    let loaded = cache.load_or_build(&source).await.unwrap();
    assert_eq!(prober.calls(), 1);
    assert_eq!(loaded, built);

    // No temp files left behind.
    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn changed_source_invalidates_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_in(&dir);
    let prober = Arc::new(FixtureProber::new());
    let cache = KeyframeCache::new(prober.clone(), KeyframeCacheConfig::default());

    cache.load_or_build(&source).await.unwrap();
    std::fs::write(&source, b"a re-recorded, longer file").unwrap();
    cache.load_or_build(&source).await.unwrap();
    assert_eq!(prober.calls(), 2);
}

#[tokio::test]
async fn signature_check_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_in(&dir);
    let prober = Arc::new(FixtureProber::new());
    let config = KeyframeCacheConfig {
        validate_signature: false,
        ..KeyframeCacheConfig::default()
    };
    let cache = KeyframeCache::new(prober.clone(), config);

    cache.load_or_build(&source).await.unwrap();
    std::fs::write(&source, b"a re-recorded, longer file").unwrap();
    cache.load_or_build(&source).await.unwrap();
    assert_eq!(prober.calls(), 1);
}

#[tokio::test]
async fn legacy_sidecar_is_trusted() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_in(&dir);
    std::fs::write(dir.path().join("lecture.mkv.keyframes.txt"), "0\n5\n10\n").unwrap();

    let prober = Arc::new(FixtureProber::new());
    let cache = KeyframeCache::new(prober.clone(), KeyframeCacheConfig::default());
    let index = cache.load_or_build(&source).await.unwrap();

    assert_eq!(prober.calls(), 0);
    assert_eq!(index.timestamps(), &[0.0, 5.0, 10.0]);
}

#[tokio::test]
async fn corrupt_sidecar_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_in(&dir);
    std::fs::write(dir.path().join("lecture.mkv.keyframes.txt"), "0\n5\ngarb").unwrap();

    let prober = Arc::new(FixtureProber::new());
    let cache = KeyframeCache::new(prober.clone(), KeyframeCacheConfig::default());
    let index = cache.load_or_build(&source).await.unwrap();

    assert_eq!(prober.calls(), 1);
    assert_eq!(index.len(), 40);
}

#[tokio::test]
async fn missing_source_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let cache = KeyframeCache::new(Arc::new(FixtureProber::new()), KeyframeCacheConfig::default());
    let err = cache
        .load_or_build(&dir.path().join("absent.mkv"))
        .await
        .unwrap_err();
    assert!(matches!(err, SeamcutError::FileNotFound { .. }));
}

#[tokio::test]
async fn fixture_index_resolves_documented_example() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_in(&dir);
    let cache = KeyframeCache::new(Arc::new(FixtureProber::new()), KeyframeCacheConfig::default());
    let index = cache.load_or_build(&source).await.unwrap();

    let segment = Segment {
        index: 1,
        video: source.clone(),
        audio: source,
        start: 10.0,
        end: 70.0,
    };
    let resolved = SplitPointResolver::new(1.0).resolve(&segment, &index).unwrap();
    assert_eq!(resolved.start_split(), 12.0);
    assert_eq!(resolved.end_split(), 68.0);
    assert_eq!(5.0 + resolved.duration(), 65.0);
}
