//! HTTP client for the configured upstream pricing provider.
//!
//! This module provides a synchronous HTTP client that can be used from async contexts
//! via `tokio::task::spawn_blocking`. The client performs exactly one request per
//! fetch and maps every failure to a typed `FetchError`.

mod async_wrapper;
mod chart;
mod provider;

pub use async_wrapper::{AsyncChartClient, AsyncPriceClient, CandleFetcher, PriceFetcher};
pub use chart::{parse_chart, ChartClient};
pub use provider::Provider;

use crate::config::Config;
use crate::error::{FetchError, FetchResult};
use crate::metrics::{FetchTimer, Metrics};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Timeout used by [`PriceClient::with_url`] unless overridden.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

/// HTTP client for one upstream pricing provider.
///
/// This client uses `ureq` for synchronous HTTP requests and can be called
/// from async contexts using `tokio::task::spawn_blocking`.
#[derive(Clone)]
pub struct PriceClient {
    provider: Provider,

    /// Full upstream URL
    url: String,

    /// API key, sent only when the provider takes one
    api_key: Option<String>,

    /// HTTP client agent
    agent: Arc<ureq::Agent>,

    /// Metrics collector
    metrics: Metrics,
}

impl PriceClient {
    /// Create a new PriceClient from configuration.
    pub fn new(config: &Config, metrics: Metrics) -> Self {
        let agent = build_agent(Duration::from_secs(config.request_timeout));

        Self {
            provider: config.provider,
            url: config.price_api_url.clone(),
            api_key: config.price_api_key.clone(),
            agent: Arc::new(agent),
            metrics,
        }
    }

    /// Create a PriceClient against a custom URL (useful for testing).
    #[doc(hidden)]
    pub fn with_url(provider: Provider, url: String, api_key: Option<String>) -> Self {
        Self {
            provider,
            url,
            api_key,
            agent: Arc::new(build_agent(DEFAULT_TIMEOUT)),
            metrics: Metrics::new(),
        }
    }

    /// Replace the overall request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = Arc::new(build_agent(timeout));
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Get a reference to the metrics collector.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Fetch the current quote with a single GET request.
    pub fn fetch_price(&self) -> FetchResult<f64> {
        let timer = FetchTimer::new(self.metrics.clone());
        let result = self.request_price();
        timer.complete();

        match &result {
            Ok(price) => tracing::debug!(provider = %self.provider, price, "Fetched quote"),
            Err(e) => tracing::debug!(provider = %self.provider, error = %e, "Quote fetch failed"),
        }

        result
    }

    fn request_price(&self) -> FetchResult<f64> {
        let mut request = self
            .agent
            .get(&self.url)
            .set("Accept", "application/json");

        if let (Some(header), Some(key)) = (self.provider.auth_header(), self.api_key.as_deref()) {
            request = request.set(header, key);
        }

        let response = request.call().map_err(Self::map_error)?;
        let body = response.into_string().map_err(Self::map_io_error)?;

        let json: serde_json::Value = serde_json::from_str(&body)?;
        self.provider.extract(&json)
    }

    /// Map a ureq error to a FetchError.
    fn map_error(error: ureq::Error) -> FetchError {
        match error {
            ureq::Error::Status(status, response) => {
                let message = response
                    .into_string()
                    .unwrap_or_else(|_| "Unknown error".to_string());
                FetchError::Upstream { status, message }
            }
            ureq::Error::Transport(transport) => match transport.kind() {
                ureq::ErrorKind::ConnectionFailed => {
                    FetchError::Network("Connection failed".to_string())
                }
                ureq::ErrorKind::Io => {
                    let timed_out = std::error::Error::source(&transport)
                        .and_then(|source| source.downcast_ref::<io::Error>())
                        .is_some_and(is_timeout);
                    if timed_out {
                        FetchError::Timeout
                    } else {
                        FetchError::Network(transport.to_string())
                    }
                }
                _ => FetchError::Network(transport.to_string()),
            },
        }
    }

    /// Map an error while reading the response body.
    fn map_io_error(error: io::Error) -> FetchError {
        if is_timeout(&error) {
            FetchError::Timeout
        } else {
            FetchError::Network(error.to_string())
        }
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
