use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parkvoice::stt::UnsupportedRecognizer;
use parkvoice::{create_router, AppState, Config, HttpBookingGateway, TracingSpeaker};
use tracing::info;

#[derive(Parser)]
#[command(name = "parkvoice", about = "Voice quick-booking engine for shared campus parking")]
struct Args {
    /// Config file (without extension), e.g. config/parkvoice
    #[arg(long, default_value = "config/parkvoice")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("parkvoice v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!(
        "Silence window {}ms, restart settle {}ms",
        cfg.voice.silence_window_ms, cfg.voice.restart_settle_ms
    );
    info!("Booking gateway: {}", cfg.gateway.base_url);

    let state = AppState::new(
        Arc::new(HttpBookingGateway::new(&cfg.gateway)),
        Arc::new(TracingSpeaker),
        // Recognition runs on the user's device; sessions opened against
        // this process fall back to manual controls.
        Arc::new(UnsupportedRecognizer),
        cfg.voice.clone(),
    );

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server failed")?;

    Ok(())
}
