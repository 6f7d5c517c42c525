//! Upstream pricing providers and their response shapes.
//!
//! Exactly one provider is configured per deployment. Each provider knows its
//! default endpoint, whether it needs an API key, and where the quote lives in
//! its JSON response.

use crate::error::{FetchError, FetchResult};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A free market-data provider serving a gold spot quote in USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// goldapi.io, authenticated with an `x-access-token` header
    GoldApi,
    /// Yahoo Finance chart API for the `XAUUSD=X` ticker
    Yahoo,
    /// Another instance of this service, read through its `/price` endpoint
    Backend,
}

impl Provider {
    /// Public endpoint used when `PRICE_API_URL` is not set.
    ///
    /// `Backend` has none; it must never point back at this instance.
    pub fn default_url(&self) -> Option<&'static str> {
        match self {
            Provider::GoldApi => Some("https://www.goldapi.io/api/XAU/USD"),
            Provider::Yahoo => Some(
                "https://query1.finance.yahoo.com/v8/finance/chart/XAUUSD=X?interval=1d&range=1d",
            ),
            Provider::Backend => None,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, Provider::GoldApi)
    }

    /// Header carrying the API key, if the provider takes one.
    pub fn auth_header(&self) -> Option<&'static str> {
        match self {
            Provider::GoldApi => Some("x-access-token"),
            Provider::Yahoo | Provider::Backend => None,
        }
    }

    /// JSON pointer to the quote in the provider's response.
    pub fn price_pointer(&self) -> &'static str {
        match self {
            Provider::GoldApi => "/price",
            Provider::Yahoo => "/chart/result/0/meta/regularMarketPrice",
            Provider::Backend => "/gold_price_usd",
        }
    }

    /// Extract the quote from a parsed response body.
    ///
    /// Extra fields are ignored. A missing field, `null`, or a non-numeric
    /// value is a parse failure. Zero is a valid price.
    pub fn extract(&self, body: &Value) -> FetchResult<f64> {
        let pointer = self.price_pointer();
        let field = body
            .pointer(pointer)
            .ok_or_else(|| FetchError::Parse(format!("missing field {}", pointer)))?;

        field
            .as_f64()
            .filter(|price| price.is_finite())
            .ok_or_else(|| FetchError::Parse(format!("field {} is not a number: {}", pointer, field)))
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "goldapi" => Ok(Provider::GoldApi),
            "yahoo" => Ok(Provider::Yahoo),
            "backend" => Ok(Provider::Backend),
            other => Err(format!(
                "Unknown provider '{}', expected goldapi, yahoo or backend",
                other
            )),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::GoldApi => "goldapi",
            Provider::Yahoo => "yahoo",
            Provider::Backend => "backend",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_provider() {
        assert_eq!("goldapi".parse::<Provider>().unwrap(), Provider::GoldApi);
        assert_eq!(" Yahoo ".parse::<Provider>().unwrap(), Provider::Yahoo);
        assert_eq!("BACKEND".parse::<Provider>().unwrap(), Provider::Backend);
        assert!("kitco".parse::<Provider>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for provider in [Provider::GoldApi, Provider::Yahoo, Provider::Backend] {
            assert_eq!(provider.to_string().parse::<Provider>().unwrap(), provider);
        }
    }

    #[test]
    fn test_extract_goldapi() {
        let body = json!({
            "timestamp": 1731500000,
            "metal": "XAU",
            "currency": "USD",
            "price": 2650.12,
            "ch": -3.1
        });
        assert_eq!(Provider::GoldApi.extract(&body).unwrap(), 2650.12);
    }

    #[test]
    fn test_extract_yahoo() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "XAUUSD=X", "regularMarketPrice": 2651.0 }
                }],
                "error": null
            }
        });
        assert_eq!(Provider::Yahoo.extract(&body).unwrap(), 2651.0);
    }

    #[test]
    fn test_extract_backend_zero_is_a_price() {
        let body = json!({ "gold_price_usd": 0 });
        assert_eq!(Provider::Backend.extract(&body).unwrap(), 0.0);
    }

    #[test]
    fn test_extract_null_is_parse_error() {
        let body = json!({ "gold_price_usd": null });
        let err = Provider::Backend.extract(&body).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn test_extract_missing_field() {
        let body = json!({ "chart": { "result": [] } });
        let err = Provider::Yahoo.extract(&body).unwrap_err();
        assert!(matches!(err, FetchError::Parse(ref msg) if msg.contains("missing field")));
    }

    #[test]
    fn test_extract_string_is_rejected() {
        let body = json!({ "price": "2650.12" });
        assert!(matches!(
            Provider::GoldApi.extract(&body),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_backend_has_no_default_url() {
        assert!(Provider::GoldApi.default_url().is_some());
        assert!(Provider::Yahoo.default_url().is_some());
        assert_eq!(Provider::Backend.default_url(), None);
    }

    #[test]
    fn test_only_goldapi_needs_a_key() {
        assert!(Provider::GoldApi.requires_api_key());
        assert_eq!(Provider::GoldApi.auth_header(), Some("x-access-token"));
        assert!(!Provider::Yahoo.requires_api_key());
        assert!(Provider::Backend.auth_header().is_none());
    }
}
