//! Conversation session orchestration.
//!
//! Routes the session's update stream to the console, the playback sink and
//! the wish tool, and pumps microphone audio into the session while it
//! runs. The loop owns the capture ring so shutdown can cancel a pump
//! blocked in `read_exact` deterministically.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use carol_core::{AudioCapture, CaptureRing, CarolError, RingConfig};

use crate::chat::ChatModel;
use crate::console;
use crate::realtime::{RealtimeSession, SessionUpdate};
use crate::wish_tool;

/// Bytes pulled from the capture ring per outbound chunk (100 ms of audio).
pub const READ_CHUNK_BYTES: usize = 4_800;

/// Queue depth between the blocking capture pump and the async forwarder.
const AUDIO_QUEUE_CHUNKS: usize = 32;

/// Seam for the playback side so tests can observe enqueue/clear calls.
pub trait PlaybackSink: Send + Sync {
    /// Queue a chunk of 16-bit PCM for playback.
    fn enqueue(&self, chunk: &[u8]);
    /// Flush pending playback (user interruption).
    fn clear(&self);
}

impl PlaybackSink for carol_core::Playback {
    fn enqueue(&self, chunk: &[u8]) {
        carol_core::Playback::enqueue(self, chunk);
    }

    fn clear(&self) {
        carol_core::Playback::clear(self);
    }
}

/// Drive one conversation session until its update stream ends or reports
/// an error.
pub async fn run_session<S>(
    session: Arc<S>,
    chat: Arc<dyn ChatModel>,
    playback: Arc<dyn PlaybackSink>,
) -> anyhow::Result<()>
where
    S: RealtimeSession + 'static,
{
    let mut updates = session.subscribe_updates();
    let ring = Arc::new(CaptureRing::new(RingConfig::default()));

    loop {
        match updates.recv().await {
            Ok(SessionUpdate::SessionStarted) => {
                console::display_line(" <<< Connected: session started");
                spawn_capture_pump(Arc::clone(&ring), Arc::clone(&session));
            }

            Ok(SessionUpdate::SpeechStarted { audio_start_ms }) => {
                console::display_line(&format!(
                    " <<< Start of speech detected @ {audio_start_ms} ms"
                ));
                playback.clear();
            }

            Ok(SessionUpdate::SpeechFinished { audio_end_ms }) => {
                console::display_line(&format!(
                    " <<< End of speech detected @ {audio_end_ms} ms"
                ));
            }

            Ok(SessionUpdate::StreamingDelta {
                transcript,
                text,
                audio,
            }) => {
                if let Some(transcript) = transcript {
                    console::display_inline(&transcript);
                }
                if let Some(text) = text {
                    console::display_inline(&text);
                }
                if let Some(audio) = audio {
                    playback.enqueue(&audio);
                }
            }

            Ok(SessionUpdate::ItemFinished {
                function_name,
                function_call_id,
                function_arguments,
            }) => {
                console::display_line("");
                if function_name.as_deref() == Some(wish_tool::WISH_TOOL_NAME) {
                    match (function_call_id, function_arguments) {
                        (Some(call_id), Some(arguments)) => {
                            if let Err(e) = wish_tool::handle_wish_tool(
                                chat.as_ref(),
                                session.as_ref(),
                                &call_id,
                                &arguments,
                            )
                            .await
                            {
                                warn!("wish tool handling failed: {e:#}");
                            }
                        }
                        _ => warn!("wish tool item finished without call id or arguments"),
                    }
                }
            }

            Ok(SessionUpdate::Error { message }) => {
                console::display_error(&format!(" <<< ERROR: {message}"));
                break;
            }

            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("update receiver lagged by {n} events");
            }

            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    // Unblock a pump stuck in read_exact so its thread exits promptly.
    ring.cancel();
    info!("conversation session ended");
    Ok(())
}

/// Start pulling fixed-size capture chunks and forwarding them to the
/// session.
///
/// The capture handle is `!Send`, so it is created, used and dropped inside
/// one `spawn_blocking` thread; a bounded channel bridges to the async
/// forwarder.
fn spawn_capture_pump<S>(ring: Arc<CaptureRing>, session: Arc<S>)
where
    S: RealtimeSession + 'static,
{
    let (audio_tx, mut audio_rx) = mpsc::channel::<Vec<u8>>(AUDIO_QUEUE_CHUNKS);

    tokio::task::spawn_blocking(move || {
        let capture = match AudioCapture::start_with_ring(Arc::clone(&ring)) {
            Ok(capture) => capture,
            Err(e) => {
                error!("failed to open capture device: {e}");
                return;
            }
        };
        console::display_line(" >>> Listening to microphone input");

        let mut chunk = vec![0u8; READ_CHUNK_BYTES];
        loop {
            match capture.read_exact(&mut chunk) {
                Ok(_) => {
                    // Send fails only when the forwarder is gone.
                    if audio_tx.blocking_send(chunk.clone()).is_err() {
                        break;
                    }
                }
                Err(CarolError::ReadCancelled) => break,
                Err(e) => {
                    error!("capture read failed: {e}");
                    break;
                }
            }
        }
        drop(capture);
    });

    tokio::spawn(async move {
        while let Some(chunk) = audio_rx.recv().await {
            if let Err(e) = session.send_input_audio(chunk).await {
                warn!("failed to forward capture chunk: {e:#}");
                break;
            }
        }
    });
}
