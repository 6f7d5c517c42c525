//! Gold Price Service - Main entry point
//!
//! Loads configuration from the environment, wires the upstream client into the
//! refresh cache and serves `GET /price` until interrupted.

use anyhow::Result;
use gold_price_service::client::{AsyncPriceClient, PriceFetcher};
use gold_price_service::{AppState, Clock, Config, Metrics, PriceClient, RefreshCache, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // RUST_LOG wins, then LOG_LEVEL
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Using provider {} at {}",
        config.provider, config.price_api_url
    );

    let metrics = Metrics::new();
    let client = PriceClient::new(&config, metrics.clone());
    let fetcher = Arc::new(AsyncPriceClient::new(client)) as Arc<dyn PriceFetcher>;
    let clock = Arc::new(SystemClock) as Arc<dyn Clock>;

    let cache = RefreshCache::new(
        fetcher,
        clock,
        Duration::from_secs(config.cache_ttl_seconds),
        metrics.clone(),
    );
    info!(
        "Cache TTL: {}s, request timeout: {}s",
        config.cache_ttl_seconds, config.request_timeout
    );

    info!(
        "Daily candles from {} ({} days by default)",
        config.chart_api_url, config.volatility_days
    );

    let state = AppState::new(cache, metrics, &config);

    tokio::select! {
        result = gold_price_service::server::run_server(config.listen_addr, state) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("Gold Price Service shutdown complete");
    Ok(())
}
