//! Bounded in-memory history of observed quotes for the current UTC day.
//!
//! Points are kept in a ring buffer of fixed capacity. The first point of a
//! new UTC day clears everything recorded on the previous one.

use crate::analytics;
use crate::models::PricePoint;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Session history of observed quotes.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    points: VecDeque<PricePoint>,
    capacity: usize,
    day: Option<NaiveDate>,
}

/// One history point with its normalized position in the day's range.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryPoint {
    pub price: f64,
    pub observed_at: DateTime<Utc>,
    pub normalized: f64,
}

/// Body of `GET /history`.
#[derive(Debug, Clone, Serialize)]
pub struct HistorySummary {
    pub day: Option<NaiveDate>,
    pub points: Vec<SummaryPoint>,
    /// High-low range of the day's observed prices
    pub energy: f64,
    /// Trailing mean of the latest prices, once the window is full
    pub moving_average: Option<f64>,
    /// Whether `energy` exceeds the configured critical level
    pub critical: bool,
}

impl PriceHistory {
    /// Create an empty history holding at most `capacity` points (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            day: None,
        }
    }

    /// Append an observation, resetting on a new day and evicting the oldest when full.
    pub fn record(&mut self, point: PricePoint) {
        let day = point.observed_at.date_naive();
        if self.day != Some(day) {
            if self.day.is_some() {
                tracing::info!(
                    previous = ?self.day,
                    points = self.points.len(),
                    "New day, clearing price history"
                );
            }
            self.points.clear();
            self.day = Some(day);
        }

        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn day(&self) -> Option<NaiveDate> {
        self.day
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.back()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    /// Summarize the day: range, trailing mean and per-point normalization.
    pub fn summary(&self, ma_window: usize, critical_level: f64) -> HistorySummary {
        let prices = self.prices();
        let energy = analytics::price_range(&prices);
        let moving_average = analytics::rolling_mean(&prices, ma_window)
            .last()
            .copied()
            .flatten();
        let normalized = analytics::min_max_normalize(&prices);

        let points = self
            .points
            .iter()
            .zip(normalized)
            .map(|(point, normalized)| SummaryPoint {
                price: point.price,
                observed_at: point.observed_at,
                normalized,
            })
            .collect();

        HistorySummary {
            day: self.day,
            points,
            energy,
            moving_average,
            critical: energy > critical_level,
        }
    }
}
