//! HTTP server exposing the cached gold price.
//!
//! One hyper HTTP/1 connection task is spawned per accepted socket. All
//! connections share one [`AppState`].

pub mod handlers;

pub use handlers::handle_request;

use crate::cache::RefreshCache;
use crate::client::{AsyncChartClient, CandleFetcher, ChartClient};
use crate::config::Config;
use crate::history::PriceHistory;
use crate::metrics::Metrics;
use anyhow::{Context, Result};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// State shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: RefreshCache,
    pub history: Arc<Mutex<PriceHistory>>,
    pub candles: Arc<dyn CandleFetcher>,
    pub metrics: Metrics,
    pub ma_window: usize,
    pub critical_energy: f64,
    pub volatility_days: u32,
}

impl AppState {
    /// Build the shared state, with daily candles read from `config.chart_api_url`.
    pub fn new(cache: RefreshCache, metrics: Metrics, config: &Config) -> Self {
        let chart = ChartClient::new(config, metrics.clone());

        Self {
            cache,
            history: Arc::new(Mutex::new(PriceHistory::new(config.history_capacity))),
            candles: Arc::new(AsyncChartClient::new(chart)),
            metrics,
            ma_window: config.history_ma_window,
            critical_energy: config.critical_energy,
            volatility_days: config.volatility_days,
        }
    }

    /// Replace the source of daily candles.
    pub fn with_candles(mut self, candles: Arc<dyn CandleFetcher>) -> Self {
        self.candles = candles;
        self
    }
}

/// Bind `addr` and serve until the accept loop fails.
pub async fn run_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    serve(listener, state).await
}

/// Serve requests from an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {:#}", peer_addr, e);
            }
        });
    }
}

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: AppState) -> Result<()> {
    debug!("New connection from {}", peer_addr);

    http1::Builder::new()
        .serve_connection(
            TokioIo::new(stream),
            service_fn(move |req| {
                let state = state.clone();
                async move { handle_request(req, state).await }
            }),
        )
        .await
        .context("HTTP connection error")?;

    debug!("Connection closed from {}", peer_addr);
    Ok(())
}
