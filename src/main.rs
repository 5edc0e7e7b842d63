// =============================================================================
// Aurora TA — Main Entry Point
// =============================================================================
//
// Loads the engine config (writing defaults on first start), then serves the
// indicator API until Ctrl+C.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use aurora_ta::api;
use aurora_ta::app_state::AppState;
use aurora_ta::runtime_config::{EngineConfig, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Aurora TA — Progressive Indicator Engine          ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    // ── 2. Config ────────────────────────────────────────────────────────
    let config_path =
        std::env::var("TA_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

    let mut config = match EngineConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, path = %config_path, "Failed to load config, using defaults");
            let cfg = EngineConfig::default();
            if let Err(e) = cfg.save(&config_path) {
                warn!(error = %e, "Failed to write default config");
            }
            cfg
        }
    };
    config.apply_env_overrides();

    info!(
        enabled = ?config.enabled_indicators,
        max_bars = config.max_bars_per_series,
        "Indicators configured"
    );

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, &config_path));

    // ── 3. API server ────────────────────────────────────────────────────
    let app = api::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            warn!("Shutdown signal received — stopping gracefully");
        })
        .await
        .context("API server failed")?;

    // ── 4. Persist config ────────────────────────────────────────────────
    if let Err(e) = state.engine_config.read().save(&state.config_path) {
        error!(error = %e, "Failed to save engine config on shutdown");
    }

    info!(series = state.series_store.len(), "Aurora TA shut down complete.");
    Ok(())
}
