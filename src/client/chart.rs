//! Daily OHLC candles from the Yahoo chart API.

use crate::analytics::{Candle, DailyCandle};
use crate::client::PriceClient;
use crate::config::Config;
use crate::error::{FetchError, FetchResult};
use crate::metrics::{FetchTimer, Metrics};
use chrono::DateTime;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Client for the daily chart endpoint, queried with `interval=1d&range=<days>d`.
#[derive(Clone)]
pub struct ChartClient {
    url: String,
    agent: Arc<ureq::Agent>,
    metrics: Metrics,
}

impl ChartClient {
    pub fn new(config: &Config, metrics: Metrics) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout))
            .build();

        Self {
            url: config.chart_api_url.clone(),
            agent: Arc::new(agent),
            metrics,
        }
    }

    /// Create a ChartClient against a custom URL (useful for testing).
    #[doc(hidden)]
    pub fn with_url(url: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(5))
            .build();

        Self {
            url,
            agent: Arc::new(agent),
            metrics: Metrics::new(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Fetch up to `days` daily candles, oldest first.
    pub fn fetch_candles(&self, days: u32) -> FetchResult<Vec<DailyCandle>> {
        let timer = FetchTimer::new(self.metrics.clone());
        let result = self.request_candles(days);
        timer.complete();

        match &result {
            Ok(candles) => tracing::debug!(days, count = candles.len(), "Fetched daily candles"),
            Err(e) => tracing::debug!(days, error = %e, "Daily candle fetch failed"),
        }

        result
    }

    fn request_candles(&self, days: u32) -> FetchResult<Vec<DailyCandle>> {
        let response = self
            .agent
            .get(&self.url)
            .query("interval", "1d")
            .query("range", &format!("{}d", days))
            .set("Accept", "application/json")
            .call()
            .map_err(PriceClient::map_error)?;

        let body = response
            .into_string()
            .map_err(PriceClient::map_io_error)?;
        let json: Value = serde_json::from_str(&body)?;
        parse_chart(&json)
    }
}

/// Pull daily candles out of a chart response.
///
/// Days where any of open, high, low or close is `null` are skipped.
pub fn parse_chart(body: &Value) -> FetchResult<Vec<DailyCandle>> {
    let result = body
        .pointer("/chart/result/0")
        .ok_or_else(|| FetchError::Parse("missing field /chart/result/0".to_string()))?;

    let timestamps = array_at(result, "/timestamp")?;
    let open = array_at(result, "/indicators/quote/0/open")?;
    let high = array_at(result, "/indicators/quote/0/high")?;
    let low = array_at(result, "/indicators/quote/0/low")?;
    let close = array_at(result, "/indicators/quote/0/close")?;

    let mut candles = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let ts = ts
            .as_i64()
            .ok_or_else(|| FetchError::Parse(format!("timestamp {} is not an integer", ts)))?;
        let date = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| FetchError::Parse(format!("timestamp {} out of range", ts)))?
            .date_naive();

        let values = (
            number_at(open, i),
            number_at(high, i),
            number_at(low, i),
            number_at(close, i),
        );
        if let (Some(open), Some(high), Some(low), Some(close)) = values {
            candles.push(DailyCandle {
                date,
                candle: Candle {
                    open,
                    high,
                    low,
                    close,
                },
            });
        }
    }

    Ok(candles)
}

fn array_at<'a>(value: &'a Value, pointer: &str) -> FetchResult<&'a Vec<Value>> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse(format!("missing array {}", pointer)))
}

fn number_at(values: &[Value], i: usize) -> Option<f64> {
    values
        .get(i)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}
