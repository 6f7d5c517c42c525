//! Data models for quotes and the JSON bodies the service exchanges.

pub mod quote;

pub use quote::{PricePoint, PriceResponse, Quote};
