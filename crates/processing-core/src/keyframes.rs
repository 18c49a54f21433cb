//! Keyframe index and its on-disk sidecar cache.
//!
//! Sidecar format, one entry per line:
//!
//! ```text
//! # signature 104857600:1718000000123456789
//! 0
//! 2.002
//! 4.004
//! ```
//!
//! Lines starting with `#` are comments. The optional signature comment
//! records the source's size and modification time when the index was built.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use seamcut_common::config::KeyframeCacheConfig;
use seamcut_common::error::{SeamcutError, SeamcutResult};

use crate::probe::{MediaProber, PacketRecord};

const SIGNATURE_PREFIX: &str = "# signature ";

/// Sorted, de-duplicated keyframe timestamps of one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyframeIndex {
    timestamps: Vec<f64>,
}

/// A monotonic keyframe query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyframeQuery {
    /// First keyframe strictly greater than the value.
    FirstAfter(f64),
    /// Last keyframe strictly less than the value.
    LastBefore(f64),
}

impl KeyframeIndex {
    pub fn new(mut timestamps: Vec<f64>) -> Self {
        timestamps.retain(|t| t.is_finite());
        timestamps.sort_by(f64::total_cmp);
        timestamps.dedup();
        Self { timestamps }
    }

    /// Keep the timestamped keyframe packets. An index with no keyframes is a
    /// probe failure.
    pub fn from_records(path: &Path, records: &[PacketRecord]) -> SeamcutResult<Self> {
        let index = Self::new(
            records
                .iter()
                .filter(|r| r.keyframe)
                .filter_map(|r| r.timestamp)
                .collect(),
        );
        if index.is_empty() {
            return Err(SeamcutError::probe(path, "no keyframes in primary video stream"));
        }
        Ok(index)
    }

    /// Parse sidecar content, returning the index and the recorded signature.
    pub fn parse_sidecar(
        path: &Path,
        content: &str,
    ) -> SeamcutResult<(Self, Option<ContentSignature>)> {
        let mut signature = None;
        let mut timestamps = Vec::new();

        for line in content.lines().map(str::trim) {
            if let Some(raw) = line.strip_prefix(SIGNATURE_PREFIX) {
                signature = raw.parse().ok();
                continue;
            }
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let ts = line.parse::<f64>().map_err(|e| {
                SeamcutError::probe(path, format!("bad sidecar timestamp {line:?}: {e}"))
            })?;
            timestamps.push(ts);
        }

        let index = Self::new(timestamps);
        if index.is_empty() {
            return Err(SeamcutError::probe(path, "sidecar holds no keyframes"));
        }
        Ok((index, signature))
    }

    pub fn to_sidecar(&self, signature: Option<&ContentSignature>) -> String {
        let mut out = String::new();
        if let Some(sig) = signature {
            out.push_str(SIGNATURE_PREFIX);
            out.push_str(&sig.to_string());
            out.push('\n');
        }
        for ts in &self.timestamps {
            out.push_str(&ts.to_string());
            out.push('\n');
        }
        out
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn first_after(&self, t: f64) -> Option<f64> {
        let i = self.timestamps.partition_point(|&k| k <= t);
        self.timestamps.get(i).copied()
    }

    pub fn last_before(&self, t: f64) -> Option<f64> {
        let i = self.timestamps.partition_point(|&k| k < t);
        i.checked_sub(1).map(|i| self.timestamps[i])
    }

    pub fn lookup(&self, query: KeyframeQuery) -> Option<f64> {
        match query {
            KeyframeQuery::FirstAfter(t) => self.first_after(t),
            KeyframeQuery::LastBefore(t) => self.last_before(t),
        }
    }
}

/// Size and modification time of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentSignature {
    pub size: u64,
    pub mtime_ns: u128,
}

impl ContentSignature {
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let mtime_ns = meta
            .modified()
            .ok()
            .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Self {
            size: meta.len(),
            mtime_ns,
        }
    }

    pub async fn of(path: &Path) -> SeamcutResult<Self> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(Self::from_metadata(&meta)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SeamcutError::FileNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl fmt::Display for ContentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.size, self.mtime_ns)
    }
}

impl FromStr for ContentSignature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (size, mtime) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected SIZE:MTIME_NS, got {s:?}"))?;
        Ok(Self {
            size: size.parse().map_err(|e| format!("bad size {size:?}: {e}"))?,
            mtime_ns: mtime.parse().map_err(|e| format!("bad mtime {mtime:?}: {e}"))?,
        })
    }
}

/// Loads keyframe indexes from sidecars, building them on a miss.
///
/// There is no locking: two first-time loads of the same source may both
/// probe and both write the sidecar. Writes go through a temporary file and a
/// rename, so readers only ever see a complete sidecar.
#[derive(Clone)]
pub struct KeyframeCache {
    prober: Arc<dyn MediaProber>,
    config: KeyframeCacheConfig,
}

impl KeyframeCache {
    pub fn new(prober: Arc<dyn MediaProber>, config: KeyframeCacheConfig) -> Self {
        Self { prober, config }
    }

    /// `<source><suffix>`, e.g. `talk.mkv.keyframes.txt`.
    pub fn sidecar_path(&self, source: &Path) -> PathBuf {
        let mut name = OsString::from(source.as_os_str());
        name.push(&self.config.sidecar_suffix);
        PathBuf::from(name)
    }

    /// Return the cached index for `source`, building it when the sidecar is
    /// missing, unreadable, or (with signature validation on) stale.
    pub async fn load_or_build(&self, source: &Path) -> SeamcutResult<KeyframeIndex> {
        let signature = ContentSignature::of(source).await?;
        let sidecar = self.sidecar_path(source);

        match tokio::fs::read_to_string(&sidecar).await {
            Ok(content) => match KeyframeIndex::parse_sidecar(&sidecar, &content) {
                Ok((index, stored)) => {
                    let stale = self.config.validate_signature
                        && stored.is_some_and(|s| s != signature);
                    if !stale {
                        tracing::debug!(
                            sidecar = %sidecar.display(),
                            keyframes = index.len(),
                            "Loaded keyframe index"
                        );
                        return Ok(index);
                    }
                    tracing::info!(sidecar = %sidecar.display(), "Keyframe sidecar is stale, rebuilding");
                }
                Err(e) => {
                    tracing::warn!(sidecar = %sidecar.display(), error = %e, "Ignoring unreadable keyframe sidecar");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(sidecar = %sidecar.display(), error = %e, "Failed to read keyframe sidecar");
            }
        }

        self.build(source, signature).await
    }

    /// Probe `source` and persist a fresh sidecar.
    ///
    /// Failing to write the sidecar is logged and does not fail the build.
    pub async fn build(
        &self,
        source: &Path,
        signature: ContentSignature,
    ) -> SeamcutResult<KeyframeIndex> {
        let started = std::time::Instant::now();
        let records = self.prober.packets(source).await?;
        let index = KeyframeIndex::from_records(source, &records)?;

        tracing::info!(
            source = %source.display(),
            packets = records.len(),
            keyframes = index.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Built keyframe index"
        );

        let sidecar = self.sidecar_path(source);
        if let Err(e) = write_atomic(&sidecar, &index.to_sidecar(Some(&signature))).await {
            tracing::warn!(sidecar = %sidecar.display(), error = %e, "Failed to persist keyframe sidecar");
        }

        Ok(index)
    }
}

async fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    let tmp = PathBuf::from(tmp);

    let result = async {
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}
