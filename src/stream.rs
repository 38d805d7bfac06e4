use std::env;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

use reqwest::header::ACCEPT;
use thiserror::Error;

use crate::decode;
use crate::http_client::stream_client;
use crate::state::Delta;
use crate::sync::{SequenceGate, SharedState};

pub const DEFAULT_STREAM_URL: &str = "https://www.blaseball.com/events/streamData";

pub fn stream_url() -> String {
    env::var("STREAM_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STREAM_URL.to_string())
}

#[derive(Debug, Error)]
pub enum StreamError {
    /// Network failure on the live connection. Fatal for the supervisor.
    #[error("stream transport failure: {0}")]
    Transport(String),
    /// A payload that cannot be decoded, or a watched index with no game.
    /// The frame is dropped; the connection stays up.
    #[error("malformed stream event: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Disconnected,
    Connecting,
    Streaming,
    Closed,
    Failed,
}

impl StreamPhase {
    pub fn label(self) -> &'static str {
        match self {
            StreamPhase::Disconnected => "disconnected",
            StreamPhase::Connecting => "connecting",
            StreamPhase::Streaming => "streaming",
            StreamPhase::Closed => "closed",
            StreamPhase::Failed => "failed",
        }
    }
}

/// Handle the main thread uses to stop the supervisor at process shutdown.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    closed: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent. The reader exits at its next frame boundary.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Accumulates SSE lines into complete data payloads. `data:` lines within a
/// frame are joined with newlines; `event:`/`id:`/`retry:` fields and `:`
/// comments are skipped. Lines are fed without their terminator.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    data: String,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a complete payload on the frame-ending blank line.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.data));
        }
        if let Some(rest) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
        None
    }
}

/// Decodes one frame at the watched index, gates it, and publishes. The
/// schedule and the event travel together: an undecodable frame publishes
/// neither.
pub fn handle_message(
    raw: &str,
    watched_index: usize,
    gate: &mut SequenceGate,
    shared: &SharedState,
) -> Result<(), StreamError> {
    let update = decode::parse_stream_payload(raw, watched_index)?;
    shared.publish_schedule(update.schedule);
    if gate.admit(update.event.sequence) {
        shared.publish_event(update.event);
    }
    Ok(())
}

/// Owns the SSE connection lifecycle on its own thread:
/// disconnected → connecting → streaming → (closed | failed).
///
/// A severed connection is terminal for this component; there is no
/// reconnect policy. Restarting the supervisor would be the place to hang
/// one.
pub fn spawn_supervisor(
    shared: Arc<SharedState>,
    watched: Arc<AtomicUsize>,
    tx: Sender<Delta>,
    shutdown: ShutdownHandle,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        send_phase(&tx, StreamPhase::Connecting, None);
        match run_stream(&shared, &watched, &tx, &shutdown) {
            Ok(()) => send_phase(&tx, StreamPhase::Closed, None),
            Err(err) => send_phase(&tx, StreamPhase::Failed, Some(err.to_string())),
        }
    })
}

fn send_phase(tx: &Sender<Delta>, phase: StreamPhase, detail: Option<String>) {
    let _ = tx.send(Delta::StreamPhase { phase, detail });
}

fn run_stream(
    shared: &SharedState,
    watched: &AtomicUsize,
    tx: &Sender<Delta>,
    shutdown: &ShutdownHandle,
) -> Result<(), StreamError> {
    let client = stream_client().map_err(|err| StreamError::Transport(err.to_string()))?;
    let response = client
        .get(stream_url())
        .header(ACCEPT, "text/event-stream")
        .send()
        .map_err(|err| StreamError::Transport(err.to_string()))?;
    if !response.status().is_success() {
        return Err(StreamError::Transport(format!("http {}", response.status())));
    }

    send_phase(tx, StreamPhase::Streaming, None);

    let mut gate = SequenceGate::new();
    let mut frames = FrameBuffer::new();
    let mut reader = BufReader::new(response);
    let mut line = String::new();

    loop {
        if shutdown.is_closed() {
            return Ok(());
        }
        line.clear();
        let read = reader
            .read_line(&mut line)
            .map_err(|err| StreamError::Transport(err.to_string()))?;
        if read == 0 {
            if shutdown.is_closed() {
                return Ok(());
            }
            return Err(StreamError::Transport(
                "connection closed by server".to_string(),
            ));
        }

        let Some(payload) = frames.push_line(line.trim_end_matches(['\r', '\n'])) else {
            continue;
        };

        // The selector can move at any time; the index read here binds this
        // frame only.
        let index = watched.load(Ordering::SeqCst);
        if let Err(err) = handle_message(&payload, index, &mut gate, shared) {
            // One bad frame must not kill the connection.
            let _ = tx.send(Delta::Log(format!("[WARN] {err}")));
        }
    }
}
