//! Carol console entry point.
//!
//! Flow: pick a host, collect credentials and model names, then run one
//! conversation session that pumps microphone audio in and plays the
//! model's audio back. The realtime transport itself is pluggable behind
//! `RealtimeSession`; this binary wires in the scripted offline backend.

mod chat;
mod console;
mod offline;
mod prompts;
mod providers;
mod realtime;
mod session;
mod wish_tool;
mod wishes;

use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::info;

use carol_core::Playback;

use chat::{ChatClient, ChatModel};
use offline::OfflineSession;
use realtime::{RealtimeSession, SessionOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carol=info".parse().expect("valid default filter")),
        )
        .init();

    console::show_header();

    // ── Host and model selection ──────────────────────────────────────────
    let host = console::select_from_options(
        &[providers::AZURE_OPENAI, providers::OPENAI],
        "Select the host for the conversation.",
    )?;

    let (chat_client, realtime_model) = match host.as_str() {
        providers::AZURE_OPENAI => {
            let endpoint = console::prompt_url("Enter the Azure OpenAI endpoint.")?;
            let api_key = console::prompt_string("Enter your Azure OpenAI API key.")?;
            let chat_deployment =
                console::prompt_string("Enter your Azure OpenAI chat model deployment.")?;
            let realtime_deployment =
                console::prompt_string("Enter your Azure OpenAI realtime model deployment.")?;
            (
                ChatClient::azure(endpoint, api_key, chat_deployment),
                realtime_deployment,
            )
        }
        providers::OPENAI => {
            let api_key = console::prompt_string("Enter your OpenAI API key.")?;
            let chat_model = console::select_from_options(
                providers::OPENAI_CHAT_MODELS,
                "Select the model for the chat.",
            )?;
            (
                ChatClient::openai(api_key, chat_model),
                providers::OPENAI_REALTIME_MODEL.to_string(),
            )
        }
        other => bail!("unknown host selection: {other}"),
    };

    console::show_header();

    // ── Audio output ──────────────────────────────────────────────────────
    let playback = Arc::new(Playback::start().context("failed to open audio output")?);

    // ── Conversation session ──────────────────────────────────────────────
    // No realtime transport is wired in yet; the scripted offline backend
    // runs behind the same trait.
    tracing::warn!("realtime transport not configured — using the offline scripted session");
    let session = Arc::new(OfflineSession::new());

    session
        .configure(SessionOptions {
            voice: "echo".into(),
            instructions: prompts::GENERAL_PROMPT.into(),
            tools: vec![wish_tool::wish_tool()],
            input_transcription_model: "whisper-1".into(),
        })
        .await?;

    info!(host = %host, realtime_model = %realtime_model, "conversation session configured");

    session::run_session(
        session,
        Arc::new(chat_client) as Arc<dyn ChatModel>,
        playback as Arc<dyn session::PlaybackSink>,
    )
    .await
}
