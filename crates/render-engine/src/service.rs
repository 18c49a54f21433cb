//! Request handling over the tagged protocol.
//!
//! Every request runs as its own task, so a long export never holds up a
//! preview. Failures are caught at the task boundary and reported as an
//! `error` event; they never reach other tasks.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use seamcut_common::error::{SeamcutError, SeamcutResult};
use seamcut_common::timecode::format_timecode;
use seamcut_edit_model::protocol::{Request, Response};

use crate::export::EditPipeline;
use crate::transcoder::LogSink;

/// Outbound event channel.
pub type EventSender = mpsc::UnboundedSender<Response>;

/// A [`LogSink`] that forwards lines as `log` events.
pub fn event_log_sink(events: EventSender) -> LogSink {
    Arc::new(move |line: &str| {
        let _ = events.send(Response::log(line));
    })
}

#[derive(Clone)]
pub struct EditorService {
    pipeline: Arc<EditPipeline>,
}

impl EditorService {
    pub fn new(pipeline: Arc<EditPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &EditPipeline {
        &self.pipeline
    }

    /// Handle `request` on a new task.
    pub fn spawn(&self, request: Request, events: EventSender) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move { service.handle(request, events).await })
    }

    /// Handle `request` to completion, emitting its events.
    pub async fn handle(&self, request: Request, events: EventSender) {
        let action = request.action();
        let span = tracing::info_span!("request", action);
        self.dispatch(request, events).instrument(span).await
    }

    async fn dispatch(&self, request: Request, events: EventSender) {
        let action = request.action();
        let log = event_log_sink(events.clone());
        tracing::info!("Request started");

        match request {
            Request::GeneratePreviewMap { params } => {
                match self.pipeline.timeline_map(&params).await {
                    Ok(map) => send(
                        &events,
                        Response::PreviewMapReady {
                            total_duration: map.total_duration,
                            timeline_map: map.entries,
                        },
                    ),
                    Err(e) => report(&events, action, &e),
                }
            }
            Request::GeneratePreviewFragment { params, start_time } => {
                match self
                    .pipeline
                    .preview_fragment(&params, start_time, &log)
                    .await
                {
                    Ok(Some(fragment)) => send(
                        &events,
                        Response::PreviewFragmentReady {
                            start_time: fragment.start_time,
                            duration: fragment.duration,
                            path: fragment.path,
                        },
                    ),
                    Ok(None) => send(
                        &events,
                        Response::log(format!(
                            "Nothing to preview at {}",
                            format_timecode(start_time)
                        )),
                    ),
                    Err(e) => report(&events, action, &e),
                }
            }
            Request::Process { params } => {
                match self.pipeline.export(&params, &log).await {
                    Ok(report) => {
                        for warning in &report.cleanup_warnings {
                            tracing::warn!(%warning, "Export left scratch files behind");
                        }
                        send(
                            &events,
                            Response::ExportComplete {
                                output: report.output,
                                duration: report.duration_secs,
                            },
                        );
                    }
                    Err(e) => report(&events, action, &e),
                }
                send(&events, Response::Finished);
            }
        }
        tracing::info!("Request finished");
    }
}

fn send(events: &EventSender, response: Response) {
    if events.send(response).is_err() {
        tracing::debug!("Event receiver closed");
    }
}

fn report(events: &EventSender, action: &str, err: &SeamcutError) {
    tracing::error!(action, kind = err.kind(), error = %err, "Request failed");
    send(
        events,
        Response::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        },
    );
}

/// Serve newline-delimited JSON requests from `input`, writing one event per
/// line to `output`. Returns once the input is exhausted and every spawned
/// request has finished.
///
/// A line that is not UTF-8 or not a valid request is answered with a
/// `protocol` error and skipped; only a failing read or write ends the loop.
pub async fn serve<R, W>(service: EditorService, mut input: R, mut output: W) -> SeamcutResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let mut sender = Some(tx);
    let mut buf = Vec::new();

    loop {
        tokio::select! {
            read = input.read_until(b'\n', &mut buf), if sender.is_some() => {
                if read? == 0 {
                    // Input closed; keep draining until running tasks finish.
                    sender = None;
                    continue;
                }
                let raw = std::mem::take(&mut buf);
                if let Some(tx) = sender.as_ref() {
                    accept_line(&service, raw, tx);
                }
            }
            event = rx.recv() => {
                let Some(event) = event else { break };
                output.write_all(event.to_line()?.as_bytes()).await?;
                output.write_all(b"\n").await?;
                output.flush().await?;
            }
        }
    }
    Ok(())
}

fn accept_line(service: &EditorService, raw: Vec<u8>, events: &EventSender) {
    let parsed = String::from_utf8(raw)
        .map_err(|e| format!("request is not valid UTF-8: {e}"))
        .and_then(|line| {
            if line.trim().is_empty() {
                Ok(None)
            } else {
                Request::parse_line(&line).map(Some).map_err(|e| e.to_string())
            }
        });

    match parsed {
        Ok(Some(request)) => {
            service.spawn(request, events.clone());
        }
        Ok(None) => {}
        Err(message) => {
            tracing::warn!(error = %message, "Rejected malformed request");
            send(
                events,
                Response::Error {
                    kind: "protocol".to_string(),
                    message,
                },
            );
        }
    }
}
