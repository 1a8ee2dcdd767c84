//! Realtime conversation session boundary.
//!
//! Wire protocol framing, session negotiation and function-call dispatch
//! belong to the conversation provider; the orchestration loop only needs
//! the operations below. Update delivery uses a tokio broadcast channel so
//! multiple observers (the loop, tests) can attach.

use async_trait::async_trait;
use tokio::sync::broadcast;

/// A function tool offered to the conversation model.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool arguments.
    pub parameters: serde_json::Value,
}

/// Options applied to a session before audio starts flowing.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Voice the model answers with.
    pub voice: String,
    /// Persona instructions.
    pub instructions: String,
    pub tools: Vec<ToolDefinition>,
    /// Model used to transcribe the user's speech.
    pub input_transcription_model: String,
}

/// One update from the conversation service.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// The session is live; capture should start.
    SessionStarted,
    /// The service detected the user starting to speak.
    SpeechStarted { audio_start_ms: u64 },
    /// The service detected the end of the user's speech.
    SpeechFinished { audio_end_ms: u64 },
    /// Incremental model output: transcript text and/or audio to play.
    StreamingDelta {
        transcript: Option<String>,
        text: Option<String>,
        audio: Option<Vec<u8>>,
    },
    /// A conversation item finished streaming. Function call metadata is
    /// present when the item was a tool invocation.
    ItemFinished {
        function_name: Option<String>,
        function_call_id: Option<String>,
        function_arguments: Option<String>,
    },
    /// The service reported an error; the session is over.
    Error { message: String },
}

/// Contract for realtime conversation backends.
#[async_trait]
pub trait RealtimeSession: Send + Sync {
    /// Apply session options. Called once, before audio flows.
    async fn configure(&self, options: SessionOptions) -> anyhow::Result<()>;

    /// Forward one chunk of captured audio (16-bit 24 kHz mono PCM).
    async fn send_input_audio(&self, chunk: Vec<u8>) -> anyhow::Result<()>;

    /// Attach the output of a finished function call to the conversation.
    async fn add_function_output(&self, call_id: &str, output: &str) -> anyhow::Result<()>;

    /// Ask the model to produce a response (after a function output).
    async fn start_response(&self) -> anyhow::Result<()>;

    /// Subscribe to the session's update stream.
    fn subscribe_updates(&self) -> broadcast::Receiver<SessionUpdate>;
}
