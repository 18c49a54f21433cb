//! Transcoder invocations and the ffmpeg-backed [`Transcoder`].

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use seamcut_common::config::ToolsConfig;
use seamcut_common::error::{SeamcutError, SeamcutResult};

use crate::filter_graph::{FilterChain, FilterGraph};

/// Receives transcoder output and progress lines as they arrive.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// A sink that drops everything.
pub fn null_sink() -> LogSink {
    Arc::new(|_| {})
}

/// Lines of stderr kept for the error message of a failed run.
const ERROR_TAIL_LINES: usize = 8;

/// One input file with the options that precede its `-i`.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeInput {
    pub options: Vec<String>,
    pub path: PathBuf,
}

impl TranscodeInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            options: Vec::new(),
            path: path.into(),
        }
    }

    pub fn option(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.options.push(flag.to_string());
        self.options.push(value.into());
        self
    }
}

/// A complete transcoder run.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeInvocation {
    /// Human-readable step name, echoed to the log sink.
    pub title: String,
    pub inputs: Vec<TranscodeInput>,
    pub filter_complex: Option<FilterGraph>,
    pub video_filter: Option<FilterChain>,
    /// Mapping, codec, and container options, placed before the output path.
    pub output_options: Vec<String>,
    pub output: PathBuf,
}

impl TranscodeInvocation {
    pub fn new(title: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            title: title.into(),
            inputs: Vec::new(),
            filter_complex: None,
            video_filter: None,
            output_options: Vec::new(),
            output: output.into(),
        }
    }

    pub fn input(mut self, input: TranscodeInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn filter_complex(mut self, graph: FilterGraph) -> Self {
        self.filter_complex = Some(graph);
        self
    }

    pub fn video_filter(mut self, chain: FilterChain) -> Self {
        self.video_filter = Some(chain);
        self
    }

    pub fn output_option(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.output_options.push(flag.to_string());
        self.output_options.push(value.into());
        self
    }

    pub fn output_flag(mut self, flag: &str) -> Self {
        self.output_options.push(flag.to_string());
        self
    }

    /// Full argument list, excluding the binary itself.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-stats", "-y"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        for input in &self.inputs {
            args.extend(input.options.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().into_owned());
        }
        if let Some(graph) = &self.filter_complex {
            args.push("-filter_complex".to_string());
            args.push(graph.to_string());
        }
        if let Some(chain) = &self.video_filter {
            args.push("-vf".to_string());
            args.push(chain.to_string());
        }
        args.extend(self.output_options.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Runs transcoder invocations.
#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    /// Run to completion, forwarding output lines to `log`. A non-zero exit
    /// is a [`SeamcutError::Transcode`].
    async fn run(&self, invocation: &TranscodeInvocation, log: &LogSink) -> SeamcutResult<()>;

    /// Whether the backing tool can be started.
    async fn is_available(&self) -> bool;
}

/// [`Transcoder`] backed by the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: String,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(tools: &ToolsConfig) -> Self {
        Self::new(tools.ffmpeg.clone())
    }
}

#[async_trait::async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn run(&self, invocation: &TranscodeInvocation, log: &LogSink) -> SeamcutResult<()> {
        let args = invocation.to_args();
        log(&format!("--- {} ---", invocation.title));
        tracing::debug!(binary = %self.binary, ?args, "Running transcoder");

        let started = std::time::Instant::now();
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SeamcutError::transcode(None, format!("failed to start {}: {e}", self.binary)))?;

        tracing::info!(pid = child.id(), title = %invocation.title, "Transcoder started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SeamcutError::transcode(None, "failed to capture transcoder stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SeamcutError::transcode(None, "failed to capture transcoder stderr"))?;

        // Both pipes drain concurrently so neither can fill and stall the child.
        let (out_tail, err_tail, status) =
            tokio::join!(drain(stdout, log), drain(stderr, log), child.wait());

        let status = status?;
        let mut tail = out_tail?;
        tail.extend(err_tail?);

        tracing::info!(
            title = %invocation.title,
            status = %status,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Transcoder exited"
        );

        if !status.success() {
            let tail: Vec<String> = tail.into_iter().collect();
            return Err(SeamcutError::transcode(
                status.code(),
                format!("{} failed: {}", invocation.title, tail.join(" | ")),
            ));
        }
        Ok(())
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

/// Forward every line of `reader` to `log`, returning the last few lines.
async fn drain<R: AsyncRead + Unpin>(
    mut reader: R,
    log: &LogSink,
) -> std::io::Result<VecDeque<String>> {
    let mut splitter = LineSplitter::default();
    let mut tail = VecDeque::with_capacity(ERROR_TAIL_LINES);
    let mut buf = [0u8; 4096];

    let mut emit = |line: String| {
        tracing::debug!(target: "seamcut::transcoder", "{line}");
        log(&line);
        if tail.len() == ERROR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    };

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        for line in splitter.push(&buf[..n]) {
            emit(line);
        }
    }
    if let Some(line) = splitter.finish() {
        emit(line);
    }
    Ok(tail)
}

/// Splits a byte stream into lines on `\r` or `\n`, so `-stats` progress
/// updates (which end in `\r`) come out one at a time. Blank lines are
/// dropped; bytes are buffered across chunk boundaries.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\r' || byte == b'\n' {
                if let Some(line) = self.take_line() {
                    lines.push(line);
                }
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Flush whatever follows the last separator.
    pub fn finish(&mut self) -> Option<String> {
        self.take_line()
    }

    fn take_line(&mut self) -> Option<String> {
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!line.is_empty()).then_some(line)
    }
}
