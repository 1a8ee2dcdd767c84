//! `OfflineSession` — scripted stand-in for a realtime conversation provider.
//!
//! Plays the role of a stub backend so the console app, capture pump,
//! playback path and wish tool can be exercised end-to-end with no network
//! transport. Once roughly two seconds of microphone audio have arrived it
//! runs one scripted turn: speech detected, a transcript delta, then a wish
//! tool invocation; the function output comes back as a streaming text
//! delta.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info};

use carol_core::{BYTES_PER_SAMPLE, SAMPLE_RATE};

use crate::realtime::{RealtimeSession, SessionOptions, SessionUpdate};
use crate::wish_tool;

/// Received audio that triggers the scripted turn (2 s of capture audio).
const SCRIPT_TRIGGER_BYTES: usize = 2 * SAMPLE_RATE as usize * BYTES_PER_SAMPLE;

/// Capture bytes per millisecond, used for the scripted speech timestamps.
const BYTES_PER_MS: usize = SAMPLE_RATE as usize * BYTES_PER_SAMPLE / 1000;

const SCRIPT_CALL_ID: &str = "offline-call-1";
const SCRIPT_WISH_NAME: &str = "Emma";
const SCRIPT_LANGUAGE: &str = "English";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptPhase {
    WaitingForAudio,
    ToolCallIssued,
    Finished,
}

/// Scripted offline session backend.
pub struct OfflineSession {
    updates_tx: broadcast::Sender<SessionUpdate>,
    started: AtomicBool,
    received_bytes: AtomicUsize,
    phase: Mutex<ScriptPhase>,
    pending_output: Mutex<Option<String>>,
}

impl OfflineSession {
    pub fn new() -> Self {
        let (updates_tx, _) = broadcast::channel(64);
        Self {
            updates_tx,
            started: AtomicBool::new(false),
            received_bytes: AtomicUsize::new(0),
            phase: Mutex::new(ScriptPhase::WaitingForAudio),
            pending_output: Mutex::new(None),
        }
    }
}

impl Default for OfflineSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeSession for OfflineSession {
    async fn configure(&self, options: SessionOptions) -> anyhow::Result<()> {
        debug!(
            voice = %options.voice,
            tools = options.tools.len(),
            transcription_model = %options.input_transcription_model,
            "offline session configured"
        );
        Ok(())
    }

    async fn send_input_audio(&self, chunk: Vec<u8>) -> anyhow::Result<()> {
        let total = self.received_bytes.fetch_add(chunk.len(), Ordering::Relaxed) + chunk.len();
        if total < SCRIPT_TRIGGER_BYTES {
            return Ok(());
        }

        {
            let mut phase = self.phase.lock();
            if *phase != ScriptPhase::WaitingForAudio {
                return Ok(());
            }
            *phase = ScriptPhase::ToolCallIssued;
        }

        let audio_end_ms = (total / BYTES_PER_MS) as u64;
        let _ = self.updates_tx.send(SessionUpdate::SpeechStarted {
            audio_start_ms: audio_end_ms.saturating_sub(2_000),
        });
        let _ = self
            .updates_tx
            .send(SessionUpdate::SpeechFinished { audio_end_ms });
        let _ = self.updates_tx.send(SessionUpdate::StreamingDelta {
            transcript: Some(format!("What is on {SCRIPT_WISH_NAME}'s wish list?")),
            text: None,
            audio: None,
        });
        let _ = self.updates_tx.send(SessionUpdate::ItemFinished {
            function_name: Some(wish_tool::WISH_TOOL_NAME.to_string()),
            function_call_id: Some(SCRIPT_CALL_ID.to_string()),
            function_arguments: Some(format!(
                r#"{{"name":"{SCRIPT_WISH_NAME}","language":"{SCRIPT_LANGUAGE}"}}"#
            )),
        });
        info!("offline script issued a wish tool call");
        Ok(())
    }

    async fn add_function_output(&self, call_id: &str, output: &str) -> anyhow::Result<()> {
        if call_id != SCRIPT_CALL_ID {
            anyhow::bail!("unknown function call id: {call_id}");
        }
        *self.pending_output.lock() = Some(output.to_string());
        Ok(())
    }

    async fn start_response(&self) -> anyhow::Result<()> {
        let Some(output) = self.pending_output.lock().take() else {
            anyhow::bail!("start_response called without a pending function output");
        };
        *self.phase.lock() = ScriptPhase::Finished;
        let _ = self.updates_tx.send(SessionUpdate::StreamingDelta {
            transcript: None,
            text: Some(output),
            audio: None,
        });
        let _ = self.updates_tx.send(SessionUpdate::ItemFinished {
            function_name: None,
            function_call_id: None,
            function_arguments: None,
        });
        Ok(())
    }

    fn subscribe_updates(&self) -> broadcast::Receiver<SessionUpdate> {
        let rx = self.updates_tx.subscribe();
        // A realtime service reports session start on connect; do the same
        // the first time a consumer attaches.
        if !self.started.swap(true, Ordering::SeqCst) {
            let _ = self.updates_tx.send(SessionUpdate::SessionStarted);
        }
        rx
    }
}
