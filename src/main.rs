use anyhow::{Context, Result};
use clap::Parser;
use speech_session::audio::AudioBackend;
use speech_session::{
    create_router, AppState, AudioCapture, BroadcastSink, Config, FileBackend, NatsClient,
    NatsEngine, SessionController, StaticPermissionGate,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "speech-session", about = "Streams microphone audio into a speech recognizer")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/speech-session")]
    config: String,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Loaded config: {}", cfg.service.name);

    let nats = Arc::new(NatsClient::connect(&cfg.nats.url).await?);
    let engine = Arc::new(NatsEngine::new(nats, cfg.recognition.locales.clone()));

    let audio_config = cfg.audio.clone();
    let capture = AudioCapture::new(move || -> Result<Box<dyn AudioBackend>> {
        Ok(Box::new(FileBackend::new(audio_config.clone())?))
    });

    let permissions = Arc::new(StaticPermissionGate::new(&cfg.permissions));
    let events = BroadcastSink::new(cfg.recognition.event_capacity);

    let controller = SessionController::new(
        capture,
        engine,
        permissions,
        Arc::new(events.clone()),
    );

    let state = AppState::new(controller, events, cfg.recognition.defaults.clone());
    let app = create_router(state);

    let bind = args.bind.unwrap_or(cfg.service.http.bind);
    let port = args.port.unwrap_or(cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind((bind.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", bind, port))?;

    info!("HTTP server listening on {}:{}", bind, port);
    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}
