//! Application entry point for the `glomma-swimrisk` service.
//!
//! Startup sequence:
//! - Loading configuration and the model profile from the environment or `.env`
//! - Initializing structured logging/tracing
//! - Building the shared HTTP client and the cached provider clients
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `NVE_API_KEY` (optional) – HydAPI key; without it temperature risk is `UNKNOWN`
//! - `LISTEN_ADDR` (optional) – bind address (default: `0.0.0.0:8080`)
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
//! - `MODEL_*` (optional) – model profile overrides
use std::{env, sync::Arc};

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use glomma_swimrisk::providers::{
    CachedObservationSource, CachedWindSource, MetNoClient, NveClient, TtlCache,
};
use glomma_swimrisk::routes::{self, AppState};
use glomma_swimrisk::{load_from_env, ModelProfile, SystemClock};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = load_from_env()?;
    cfg.log_config();
    let profile = ModelProfile::load_from_env()?;
    profile.log_profile();

    let http = reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .timeout(cfg.http_timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

    let observation_cache = Arc::new(TtlCache::new(cfg.cache_max_entries));
    let forecast_cache = Arc::new(TtlCache::new(cfg.cache_max_entries));

    let nve = NveClient::new(http.clone(), cfg.nve_base_url.clone(), cfg.nve_api_key.clone());
    let met = MetNoClient::new(http, cfg.met_base_url.clone());

    let state = AppState {
        observations: Arc::new(CachedObservationSource::new(
            nve,
            Arc::clone(&observation_cache),
            cfg.observation_cache_ttl,
        )),
        wind: Arc::new(CachedWindSource::new(
            met,
            Arc::clone(&forecast_cache),
            cfg.forecast_cache_ttl,
        )),
        observation_cache,
        forecast_cache,
        clock: Arc::new(SystemClock),
        profile: Arc::new(profile),
        config: cfg.clone(),
    };

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(state);

    tracing::info!("Listening on {}", cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(cfg.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// - Color output: `FORCE_COLOR=1|true|yes` forces it on, `0|false|no`
///   forces it off, anything else auto-detects a TTY
/// - Span events: `AXUM_SPAN_EVENTS=full` or `enter_exit`, default CLOSE only
/// - Level: `RUST_LOG` if set, otherwise `AXUM_LOG_LEVEL` (default `debug`)
///
/// Call once, before any logging macro runs.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AXUM_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        // Keep connection-level chatter out of the pipeline logs.
        EnvFilter::new(format!("{level},hyper=warn,hyper_util=warn,reqwest=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
