use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dropflow_filter::{Filter, PortSlot};

mod api;
mod config;
mod replay;
mod state;

use config::{CliArgs, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();

    // Load config from file if provided, otherwise use defaults.
    let mut config = if let Some(ref config_path) = cli.config {
        Config::from_file(Path::new(config_path))?
    } else {
        Config::default()
    };
    config.merge_cli(&cli);

    // Logging.
    if config.quiet {
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new("error"))
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            ))
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // ── Port store ────────────────────────────────────────────────────
    // Seeding happens exactly once, here at startup, before any frame is
    // processed. A drop_port from config/CLI then overrides the default.
    let slot = Arc::new(PortSlot::new());
    if slot.seed_default() {
        tracing::info!(
            "seeded default drop port {}",
            dropflow_filter::DEFAULT_PORT
        );
    }
    if let Some(port) = config.drop_port {
        slot.set(port);
        tracing::info!("drop port set to {}", port);
    }

    // ── Filter & Stats ────────────────────────────────────────────────
    let filter = Arc::new(Filter::new(slot.clone()));
    let stats = Arc::new(state::FilterStats::new());

    // ── Replay Task ───────────────────────────────────────────────────
    if let Some(ref input) = config.input {
        let path = PathBuf::from(input);
        let filter_replay = filter.clone();
        let stats_replay = stats.clone();
        tokio::task::spawn_blocking(move || {
            match replay::replay_file(&path, &filter_replay, &stats_replay) {
                Ok(processed) => {
                    tracing::info!("replay finished: {} frames processed", processed);
                }
                Err(e) => {
                    tracing::error!("replay failed: {}", e);
                }
            }
        });
    }

    // Signal handler for graceful shutdown.
    ctrlc::set_handler(move || {
        tracing::info!("shutdown signal received");
        std::process::exit(0);
    })?;

    // ── HTTP API ──────────────────────────────────────────────────────
    let app_state = Arc::new(api::AppState {
        stats: stats.clone(),
        slot: slot.clone(),
        start_time: std::time::Instant::now(),
    });

    let allowed_ips = config.allowed_ips.clone();
    let app = api::router(app_state, &allowed_ips);

    let listener =
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.api_port)).await?;
    tracing::info!("API listening on http://0.0.0.0:{}", config.api_port);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
