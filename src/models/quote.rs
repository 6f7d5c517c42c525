//! Quote models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single price observation in USD, absent when no fetch has ever succeeded.
pub type Quote = Option<f64>;

/// Body of `GET /price`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceResponse {
    /// Serialized as `null` when absent
    pub gold_price_usd: Quote,
}

impl From<Quote> for PriceResponse {
    fn from(gold_price_usd: Quote) -> Self {
        Self { gold_price_usd }
    }
}

/// A quote together with the wall-clock time it was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

impl PricePoint {
    pub fn new(price: f64, observed_at: DateTime<Utc>) -> Self {
        Self { price, observed_at }
    }
}
