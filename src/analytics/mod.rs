//! Price-series arithmetic used by the dashboards.
//!
//! "Energy" is the high-low range of a series: over a day of observed quotes,
//! or per candle for daily OHLC data. [`volatility_report`] combines the
//! per-day ranges with their rolling mean, normalization and critical flag.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Added to the denominator of min-max normalization.
const NORMALIZE_EPSILON: f64 = 1e-12;

/// One OHLC bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// A candle for one UTC trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyCandle {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub candle: Candle,
}

/// One day of the volatility report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityPoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub candle: Candle,
    /// `high - low` for the day
    pub energy: f64,
    pub moving_average: Option<f64>,
    /// Energy scaled into `[0, 1]` across the report
    pub normalized: f64,
    pub critical: bool,
}

/// Daily high-low volatility over a run of candles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilityReport {
    pub ma_window: usize,
    pub critical_level: f64,
    pub points: Vec<VolatilityPoint>,
    /// Whether the most recent day is above the critical level
    pub critical: bool,
}

/// Build the volatility report for `candles`, oldest first.
pub fn volatility_report(
    candles: &[DailyCandle],
    ma_window: usize,
    critical_level: f64,
) -> VolatilityReport {
    let bars: Vec<Candle> = candles.iter().map(|daily| daily.candle).collect();
    let energy = candle_ranges(&bars);
    let moving_average = rolling_mean(&energy, ma_window);
    let normalized = min_max_normalize(&energy);

    let points: Vec<VolatilityPoint> = candles
        .iter()
        .zip(energy)
        .zip(moving_average)
        .zip(normalized)
        .map(|(((daily, energy), moving_average), normalized)| VolatilityPoint {
            date: daily.date,
            candle: daily.candle,
            energy,
            moving_average,
            normalized,
            critical: energy > critical_level,
        })
        .collect();

    VolatilityReport {
        ma_window: ma_window.max(1),
        critical_level,
        critical: points.last().is_some_and(|point| point.critical),
        points,
    }
}

/// `max - min` of the series, or `0.0` with fewer than two values.
pub fn price_range(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let (min, max) = min_max(values);
    max - min
}

/// High-low range of each candle.
pub fn candle_ranges(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(Candle::range).collect()
}

/// Trailing mean over `window` values; `None` until the window is full.
///
/// A window of zero is treated as one.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }

    out
}

/// Scale values into `[0, 1]` by min-max normalization.
///
/// All zeros when the slice is empty or its maximum is zero.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let (min, max) = min_max(values);
    if max == 0.0 {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|v| (v - min) / (max - min + NORMALIZE_EPSILON))
        .collect()
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        })
}
