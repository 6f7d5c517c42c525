//! Configuration management for the gold price service.
//!
//! This module handles loading and validating configuration from environment variables.
//! A `.env` file in the working directory is loaded first if present.

use crate::client::Provider;
use crate::error::{ConfigError, ConfigResult};
use std::env;
use std::net::SocketAddr;

/// Yahoo chart endpoint for the gold spot ticker, without query parameters.
pub const DEFAULT_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart/XAUUSD=X";

pub const DEFAULT_VOLATILITY_DAYS: u32 = 365;

/// Upper bound on the volatility window, in days.
pub const MAX_VOLATILITY_DAYS: u32 = 3650;

/// Configuration for the gold price service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream pricing provider (default: yahoo)
    pub provider: Provider,

    /// Upstream URL (default: the provider's public endpoint)
    pub price_api_url: String,

    /// API key, only sent to providers that need one
    pub price_api_key: Option<String>,

    /// Cache TTL in seconds (default: 10)
    pub cache_ttl_seconds: u64,

    /// HTTP request timeout in seconds (default: 10)
    pub request_timeout: u64,

    /// Address the HTTP server binds to (default: 0.0.0.0:8000)
    pub listen_addr: SocketAddr,

    /// Maximum number of observations kept in the session history (default: 8640)
    pub history_capacity: usize,

    /// Rolling mean window over the history (default: 10)
    pub history_ma_window: usize,

    /// Price range above which the day is flagged critical, in USD (default: 50.0)
    pub critical_energy: f64,

    /// Daily OHLC chart endpoint, queried with `interval=1d&range=<days>d`
    pub chart_api_url: String,

    /// Default number of daily candles in the volatility report (default: 365)
    pub volatility_days: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `PRICE_PROVIDER`: `goldapi`, `yahoo` or `backend` (default: yahoo)
    /// - `PRICE_API_URL`: Upstream URL (default depends on provider, required for `backend`)
    /// - `PRICE_API_KEY`: API key (required for `goldapi`)
    /// - `CACHE_TTL_SECONDS`: Cache TTL in seconds (default: 10)
    /// - `REQUEST_TIMEOUT`: HTTP timeout in seconds (default: 10)
    /// - `LISTEN_ADDR`: Bind address (default: 0.0.0.0:8000)
    /// - `HISTORY_CAPACITY`: History ring buffer size (default: 8640)
    /// - `HISTORY_MA_WINDOW`: Rolling mean window (default: 10)
    /// - `CRITICAL_ENERGY`: Critical range level (default: 50.0)
    /// - `CHART_API_URL`: Daily OHLC chart endpoint (default: Yahoo `XAUUSD=X`)
    /// - `VOLATILITY_DAYS`: Days of daily candles in `/volatility` (default: 365)
    ///
    /// `LOG_LEVEL` is read by the binary before configuration loads.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();

        let provider = match env::var("PRICE_PROVIDER") {
            Ok(val) => val.parse::<Provider>().map_err(|reason| ConfigError::InvalidValue {
                var: "PRICE_PROVIDER".to_string(),
                reason,
            })?,
            Err(_) => Provider::Yahoo,
        };

        let price_api_url = match (env::var("PRICE_API_URL"), provider.default_url()) {
            (Ok(url), _) => url,
            (Err(_), Some(url)) => url.to_string(),
            (Err(_), None) => return Err(ConfigError::MissingVar("PRICE_API_URL".to_string())),
        };

        if !price_api_url.starts_with("http://") && !price_api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                var: "PRICE_API_URL".to_string(),
                reason: "Must start with http:// or https://".to_string(),
            });
        }

        let price_api_key = env::var("PRICE_API_KEY").ok();
        if provider.requires_api_key() {
            match price_api_key.as_deref() {
                None => return Err(ConfigError::MissingVar("PRICE_API_KEY".to_string())),
                Some(key) if key.trim().is_empty() => {
                    return Err(ConfigError::InvalidValue {
                        var: "PRICE_API_KEY".to_string(),
                        reason: "Cannot be empty".to_string(),
                    })
                }
                Some(_) => {}
            }
        }

        let cache_ttl_seconds = Self::parse_env("CACHE_TTL_SECONDS", 10u64)?;
        let request_timeout = Self::parse_env("REQUEST_TIMEOUT", 10u64)?;
        if request_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                var: "REQUEST_TIMEOUT".to_string(),
                reason: "Must be greater than zero".to_string(),
            });
        }

        let listen_addr = Self::parse_env("LISTEN_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?;

        let history_capacity = Self::parse_env("HISTORY_CAPACITY", 8640usize)?;
        if history_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                var: "HISTORY_CAPACITY".to_string(),
                reason: "Must be greater than zero".to_string(),
            });
        }

        let history_ma_window = Self::parse_env("HISTORY_MA_WINDOW", 10usize)?;
        let critical_energy = Self::parse_env("CRITICAL_ENERGY", 50.0f64)?;
        if !critical_energy.is_finite() || critical_energy < 0.0 {
            return Err(ConfigError::InvalidValue {
                var: "CRITICAL_ENERGY".to_string(),
                reason: "Must be a non-negative number".to_string(),
            });
        }

        let chart_api_url = env::var("CHART_API_URL").unwrap_or_else(|_| DEFAULT_CHART_URL.to_string());
        if !chart_api_url.starts_with("http://") && !chart_api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                var: "CHART_API_URL".to_string(),
                reason: "Must start with http:// or https://".to_string(),
            });
        }

        let volatility_days = Self::parse_env("VOLATILITY_DAYS", DEFAULT_VOLATILITY_DAYS)?;
        if !(1..=MAX_VOLATILITY_DAYS).contains(&volatility_days) {
            return Err(ConfigError::InvalidValue {
                var: "VOLATILITY_DAYS".to_string(),
                reason: format!("Must be between 1 and {}", MAX_VOLATILITY_DAYS),
            });
        }

        Ok(Config {
            provider,
            price_api_url,
            price_api_key,
            cache_ttl_seconds,
            request_timeout,
            listen_addr,
            history_capacity,
            history_ma_window,
            critical_energy,
            chart_api_url,
            volatility_days,
        })
    }

    /// Parse an environment variable with a default value.
    fn parse_env<T>(var_name: &str, default: T) -> ConfigResult<T>
    where
        T: std::str::FromStr,
    {
        match env::var(var_name) {
            Ok(val) => val.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
                var: var_name.to_string(),
                reason: format!("Could not parse value: {}", val),
            }),
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: Provider::Yahoo,
            price_api_url: Provider::Yahoo.default_url().unwrap_or_default().to_string(),
            price_api_key: None,
            cache_ttl_seconds: 10,
            request_timeout: 10,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            history_capacity: 8640,
            history_ma_window: 10,
            critical_energy: 50.0,
            chart_api_url: DEFAULT_CHART_URL.to_string(),
            volatility_days: DEFAULT_VOLATILITY_DAYS,
        }
    }
}
