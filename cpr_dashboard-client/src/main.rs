// src/main.rs

mod events;
mod events_ws;
use dotenv::dotenv;
use std::{env, error::Error, fmt::Display, str::FromStr};
use log::{info, error};
use cpr_dashboard_lib::{
    ClientConfig,     // CPR_* environment
    Context,          // broadcast render surface
    DashboardClient,  // stream → dashboard
};

/* RUST_LOG=cpr_dashboard_lib=debug,cpr_dashboard_client=info \
cargo run -p cpr_dashboard-client */

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // ──────── ① Load .env when present ────────
    let dotenv_loaded = dotenv().is_ok();

    // initialize logger and panic hook
    env_logger::init();
    std::panic::set_hook(Box::new(|info| {
        error!("Thread panic: {:?}", info);
    }));
    if !dotenv_loaded {
        info!("No .env file found; using process environment and defaults");
    }

    // ──────── ② Client + fan-out settings ────────
    let config = ClientConfig::from_env()?;
    let http_port: u16 = env_or("DASHBOARD_HTTP_PORT", 3030)?;
    let capacity: usize = env_or("DASHBOARD_EVENT_CAPACITY", 1024)?;

    info!("Stream: {}", config.endpoint.url());
    info!(
        "Retry : every {:?}, backoff x{}, max attempts {:?}",
        config.retry.delay, config.retry.backoff, config.retry.max_attempts
    );

    // build shared broadcast context (holds a broadcast::Sender<_>)
    let ctx = Context::new(capacity);

    // ──────── ③ Render fan-out ────────
    let events_tx = ctx.tx.clone();
    tokio::spawn(async move {
        events::serve_events(events_tx, http_port).await;
    });
    info!("HTTP  : 0.0.0.0:{}/health", http_port);
    info!("SSE   : 0.0.0.0:{}/events", http_port);
    info!("WS    : 0.0.0.0:{}/ws", http_port);

    // ──────── ④ Telemetry stream until Ctrl-C ────────
    let client = DashboardClient::new(config, ctx);
    let dashboard = client
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
        })
        .await;

    info!(
        "Session summary: {} packets, {} quarantined, {} advisories",
        dashboard.packets(),
        dashboard.quarantined(),
        dashboard.advisories().len()
    );
    Ok(())
}

/// Parse `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("Environment variable {} is invalid: {}", key, e)),
        Err(_) => Ok(default),
    }
}
