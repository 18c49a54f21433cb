//! Media probing.
//!
//! [`MediaProber`] is the seam between planning and the external probe tool.
//! [`FfprobeProber`] implements it over `ffprobe`; tests substitute an
//! in-memory prober. The output parsers are free functions so they can be
//! exercised without a child process.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use seamcut_common::config::ToolsConfig;
use seamcut_common::error::{SeamcutError, SeamcutResult};
use seamcut_edit_model::media::{Resolution, SourceMedia};

/// One packet of the primary video stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketRecord {
    /// Presentation time in seconds. `None` when the prober reports `N/A`.
    pub timestamp: Option<f64>,

    /// Whether the packet starts a keyframe.
    pub keyframe: bool,
}

/// Source of media facts.
#[async_trait::async_trait]
pub trait MediaProber: Send + Sync {
    /// Packet records of the primary video stream, in stream order.
    async fn packets(&self, path: &Path) -> SeamcutResult<Vec<PacketRecord>>;

    /// Container duration in seconds.
    async fn duration(&self, path: &Path) -> SeamcutResult<f64>;

    /// Dimensions of the primary video stream.
    async fn resolution(&self, path: &Path) -> SeamcutResult<Resolution>;
}

/// Probe duration and, when available, resolution of a source.
pub async fn probe_source(prober: &dyn MediaProber, path: &Path) -> SeamcutResult<SourceMedia> {
    let duration = prober.duration(path).await?;
    let media = SourceMedia::new(path, duration);
    match prober.resolution(path).await {
        Ok(resolution) => Ok(media.with_resolution(resolution)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "No video resolution for source");
            Ok(media)
        }
    }
}

/// [`MediaProber`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    binary: String,
}

impl FfprobeProber {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(tools.ffprobe.clone())
    }

    async fn run(&self, path: &Path, args: &[&str]) -> SeamcutResult<String> {
        tracing::debug!(binary = %self.binary, ?args, path = %path.display(), "Running probe");
        let output = Command::new(&self.binary)
            .args(["-v", "error"])
            .args(args)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SeamcutError::probe(path, format!("failed to start {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SeamcutError::probe(
                path,
                format!("{} exited with {}: {}", self.binary, output.status, stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl MediaProber for FfprobeProber {
    async fn packets(&self, path: &Path) -> SeamcutResult<Vec<PacketRecord>> {
        let raw = self
            .run(
                path,
                &[
                    "-select_streams",
                    "v:0",
                    "-show_entries",
                    "packet=pts_time,flags",
                    "-of",
                    "csv=p=0",
                ],
            )
            .await?;
        parse_packet_records(path, &raw)
    }

    async fn duration(&self, path: &Path) -> SeamcutResult<f64> {
        let raw = self
            .run(
                path,
                &[
                    "-show_entries",
                    "format=duration",
                    "-of",
                    "default=noprint_wrappers=1:nokey=1",
                ],
            )
            .await?;
        parse_duration(path, &raw)
    }

    async fn resolution(&self, path: &Path) -> SeamcutResult<Resolution> {
        let raw = self
            .run(
                path,
                &[
                    "-select_streams",
                    "v:0",
                    "-show_entries",
                    "stream=width,height",
                    "-of",
                    "csv=s=x:p=0",
                ],
            )
            .await?;
        parse_resolution(path, &raw)
    }
}

/// Parse `pts_time,flags` CSV lines.
///
/// `N/A` timestamps yield `timestamp: None`. A line without a flags column,
/// or a keyframe whose timestamp does not parse, is an error.
pub fn parse_packet_records(path: &Path, raw: &str) -> SeamcutResult<Vec<PacketRecord>> {
    let mut records = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split(',');
        let pts = fields.next().unwrap_or_default().trim();
        let flags = fields.next().ok_or_else(|| {
            SeamcutError::probe(path, format!("line {}: missing flags column: {line:?}", line_no + 1))
        })?;
        let keyframe = flags.contains('K');

        let timestamp = match pts {
            "N/A" | "" => None,
            value => match value.parse::<f64>() {
                Ok(ts) if ts.is_finite() => Some(ts),
                _ if keyframe => {
                    return Err(SeamcutError::probe(
                        path,
                        format!("line {}: bad keyframe timestamp {value:?}", line_no + 1),
                    ));
                }
                _ => None,
            },
        };

        records.push(PacketRecord {
            timestamp,
            keyframe,
        });
    }
    Ok(records)
}

/// Parse a bare duration value.
pub fn parse_duration(path: &Path, raw: &str) -> SeamcutResult<f64> {
    let value = first_line(raw);
    match value.parse::<f64>() {
        Ok(d) if d.is_finite() && d >= 0.0 => Ok(d),
        _ => Err(SeamcutError::probe(path, format!("unparsable duration {value:?}"))),
    }
}

/// Parse a `WIDTHxHEIGHT` value.
pub fn parse_resolution(path: &Path, raw: &str) -> SeamcutResult<Resolution> {
    first_line(raw)
        .parse::<Resolution>()
        .map_err(|e| SeamcutError::probe(path, e))
}

fn first_line(raw: &str) -> &str {
    raw.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
}
