//! Live Consultation Demo
//!
//! Streams the default microphone to the speech endpoint and plays the
//! consultant's replies back through the default output device. Configured
//! entirely through the environment:
//!
//! - `VOICE_API_KEY`   endpoint API key (required unless VOICE_ENDPOINT set)
//! - `VOICE_ENDPOINT`  full WebSocket URL, overrides the default endpoint
//! - `VOICE_MODEL`     model identifier
//! - `VOICE_NAME`      prebuilt voice name
//! - `BRAND_NAME`      brand the consultation is about

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use live_voice_streamer::audio::CpalBackend;
use live_voice_streamer::constants::{DEFAULT_MODEL, DEFAULT_VOICE};
use live_voice_streamer::transport::WsTransport;
use live_voice_streamer::{SessionConfig, SessionState, VoiceSession};

const DEFAULT_ENDPOINT_BASE: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting live consultation");

    let endpoint = match std::env::var("VOICE_ENDPOINT") {
        Ok(url) => url,
        Err(_) => {
            let key = std::env::var("VOICE_API_KEY")
                .context("set VOICE_API_KEY or VOICE_ENDPOINT")?;
            format!("{}?key={}", DEFAULT_ENDPOINT_BASE, key)
        }
    };

    let brand = std::env::var("BRAND_NAME").unwrap_or_else(|_| "your venture".to_string());
    let config = SessionConfig {
        model: std::env::var("VOICE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        voice: std::env::var("VOICE_NAME").unwrap_or_else(|_| DEFAULT_VOICE.to_string()),
        system_prompt: format!(
            "You are a world-class startup consultant. The user is building a brand \
             called \"{brand}\". Be professional, encouraging, and highly strategic."
        ),
        ..SessionConfig::default()
    };

    let session = VoiceSession::new(
        Arc::new(WsTransport::new(endpoint)),
        Arc::new(CpalBackend),
    );

    session.start(config).await?;
    tracing::info!("Session started - speak into the microphone, Ctrl+C to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Stop requested");
        }
        _ = wait_for_end(&session) => {
            tracing::info!("Session ended by remote");
        }
    }

    session.stop();
    Ok(())
}

/// Poll until the session leaves its active states
async fn wait_for_end(session: &VoiceSession) {
    loop {
        match session.state() {
            SessionState::Closed | SessionState::Failed => return,
            _ => tokio::time::sleep(std::time::Duration::from_millis(200)).await,
        }
    }
}
