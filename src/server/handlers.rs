//! Request routing and JSON handlers.

use crate::analytics::volatility_report;
use crate::cache::{CacheState, LookupOutcome};
use crate::config::MAX_VOLATILITY_DAYS;
use crate::models::{PricePoint, PriceResponse};
use crate::server::AppState;
use chrono::Utc;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;

const ROUTES: &[&str] = &["/price", "/history", "/health", "/metrics", "/volatility"];

/// Route one request. Only the method and path are read; the body is ignored.
pub async fn handle_request<B>(
    req: Request<B>,
    state: AppState,
) -> Result<Response<Full<Bytes>>, Infallible> {
    state.metrics.record_request();

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    drop(req);

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/price") => price(&state).await,
        (&Method::GET, "/history") => history(&state).await,
        (&Method::GET, "/health") => health(&state),
        (&Method::GET, "/metrics") => json_response(StatusCode::OK, &state.metrics.summary()),
        (&Method::GET, "/volatility") => volatility(&state, query.as_deref()).await,
        (_, path) if ROUTES.contains(&path) => {
            let mut response = json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &json!({ "error": "method not allowed" }),
            );
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET"));
            response
        }
        _ => json_response(StatusCode::NOT_FOUND, &json!({ "error": "not found" })),
    };

    tracing::debug!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        "Handled request"
    );

    Ok(response)
}

async fn price(state: &AppState) -> Response<Full<Bytes>> {
    let lookup = state.cache.lookup_now().await;

    if let (LookupOutcome::Refreshed, Some(price)) = (lookup.outcome, lookup.quote) {
        state
            .history
            .lock()
            .await
            .record(PricePoint::new(price, Utc::now()));
    }

    json_response(StatusCode::OK, &PriceResponse::from(lookup.quote))
}

async fn history(state: &AppState) -> Response<Full<Bytes>> {
    let summary = state
        .history
        .lock()
        .await
        .summary(state.ma_window, state.critical_energy);
    json_response(StatusCode::OK, &summary)
}

fn health(state: &AppState) -> Response<Full<Bytes>> {
    let body = match state.cache.state_now() {
        CacheState::Empty => json!({ "status": "ok", "cache": "empty" }),
        CacheState::Warm { age, .. } => json!({
            "status": "ok",
            "cache": "warm",
            "age_secs": age.as_secs(),
        }),
    };
    json_response(StatusCode::OK, &body)
}

async fn volatility(state: &AppState, query: Option<&str>) -> Response<Full<Bytes>> {
    let days = match days_param(query) {
        Ok(days) => days.unwrap_or(state.volatility_days),
        Err(reason) => {
            return json_response(StatusCode::BAD_REQUEST, &json!({ "error": reason }));
        }
    };

    match state.candles.fetch_candles(days).await {
        Ok(candles) => {
            let report = volatility_report(&candles, state.ma_window, state.critical_energy);
            json_response(StatusCode::OK, &report)
        }
        Err(e) => {
            let kind = e.kind();
            state.metrics.record_fetch_error(kind);
            tracing::warn!(kind = %kind, error = %e, days, "Daily candle fetch failed");
            json_response(
                StatusCode::BAD_GATEWAY,
                &json!({ "error": e.to_string(), "kind": kind.as_str() }),
            )
        }
    }
}

/// `days` from the query string, if present.
fn days_param(query: Option<&str>) -> Result<Option<u32>, String> {
    let Some(raw) = query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .find_map(|pair| pair.strip_prefix("days="))
    else {
        return Ok(None);
    };

    match raw.parse::<u32>() {
        Ok(days) if (1..=MAX_VOLATILITY_DAYS).contains(&days) => Ok(Some(days)),
        _ => Err(format!(
            "days must be an integer between 1 and {}",
            MAX_VOLATILITY_DAYS
        )),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, bytes),
        Err(e) => {
            tracing::error!("Failed to serialize response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":"internal error"}"#.to_vec(),
            )
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(bytes)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{Candle, DailyCandle};
    use crate::cache::{ManualClock, RefreshCache};
    use crate::client::{CandleFetcher, PriceFetcher};
    use crate::config::Config;
    use crate::error::{FetchError, FetchErrorKind, FetchResult};
    use crate::metrics::Metrics;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use http_body_util::{BodyExt, Empty};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Returns `price` on every call, or fails when `price` is `None`.
    struct FixedFetcher {
        price: Option<f64>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceFetcher for FixedFetcher {
        async fn fetch(&self) -> FetchResult<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.price
                .ok_or_else(|| FetchError::Upstream {
                    status: 503,
                    message: "unavailable".to_string(),
                })
        }
    }

    fn state_with(price: Option<f64>) -> (AppState, ManualClock) {
        let clock = ManualClock::new();
        let metrics = Metrics::new();
        let fetcher = Arc::new(FixedFetcher {
            price,
            calls: AtomicUsize::new(0),
        });
        let cache = RefreshCache::new(
            fetcher,
            Arc::new(clock.clone()),
            Duration::from_secs(10),
            metrics.clone(),
        );
        (AppState::new(cache, metrics, &Config::default()), clock)
    }

    async fn call(state: &AppState, method: Method, path: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .body(Empty::<Bytes>::new())
            .unwrap();
        let response = handle_request(req, state.clone()).await.unwrap();
        let status = response.status();
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_price_endpoint() {
        let (state, _) = state_with(Some(2650.12));
        let (status, body) = call(&state, Method::GET, "/price").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "gold_price_usd": 2650.12 }));
    }

    #[tokio::test]
    async fn test_price_endpoint_null_when_never_fetched() {
        let (state, _) = state_with(None);
        let (status, body) = call(&state, Method::GET, "/price").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "gold_price_usd": null }));
        assert_eq!(state.metrics.fetch_errors(FetchErrorKind::Upstream), 1);
    }

    #[tokio::test]
    async fn test_only_refreshes_are_recorded_in_history() {
        let (state, clock) = state_with(Some(2650.0));

        call(&state, Method::GET, "/price").await;
        call(&state, Method::GET, "/price").await;
        clock.advance(Duration::from_secs(11));
        call(&state, Method::GET, "/price").await;

        let (_, body) = call(&state, Method::GET, "/history").await;
        assert_eq!(body["points"].as_array().unwrap().len(), 2);
        assert_eq!(body["energy"], 0.0);
        assert_eq!(body["critical"], false);
    }

    #[tokio::test]
    async fn test_health_reports_cache_state() {
        let (state, _) = state_with(Some(1.0));

        let (_, body) = call(&state, Method::GET, "/health").await;
        assert_eq!(body["cache"], "empty");

        call(&state, Method::GET, "/price").await;
        let (_, body) = call(&state, Method::GET, "/health").await;
        assert_eq!(body["cache"], "warm");
        assert_eq!(body["age_secs"], 0);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (state, _) = state_with(Some(1.0));
        call(&state, Method::GET, "/price").await;
        call(&state, Method::GET, "/price").await;

        let (status, body) = call(&state, Method::GET, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cache_hits_total"], 1);
        assert_eq!(body["requests_total"], 3);
    }

    #[tokio::test]
    async fn test_unknown_path_and_wrong_method() {
        let (state, _) = state_with(Some(1.0));

        let (status, body) = call(&state, Method::GET, "/prices").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not found");

        let req = Request::builder()
            .method(Method::POST)
            .uri("/price")
            .body(Empty::<Bytes>::new())
            .unwrap();
        let response = handle_request(req, state.clone()).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(ALLOW).unwrap(), "GET");
    }

    /// Parks every fetch for `delay` before answering.
    struct SlowFetcher {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceFetcher for SlowFetcher {
        async fn fetch(&self) -> FetchResult<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(2650.12)
        }
    }

    #[tokio::test]
    async fn test_health_answers_while_refresh_in_flight() {
        let fetcher = Arc::new(SlowFetcher {
            delay: Duration::from_secs(3),
            calls: AtomicUsize::new(0),
        });
        let metrics = Metrics::new();
        let cache = RefreshCache::new(
            fetcher.clone(),
            Arc::new(ManualClock::new()),
            Duration::from_secs(10),
            metrics.clone(),
        );
        let state = AppState::new(cache, metrics, &Config::default());

        let pending = {
            let state = state.clone();
            tokio::spawn(async move { call(&state, Method::GET, "/price").await })
        };
        while fetcher.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let (status, body) = tokio::time::timeout(
            Duration::from_millis(500),
            call(&state, Method::GET, "/health"),
        )
        .await
        .expect("/health waited on the upstream fetch");

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cache"], "empty");
        pending.abort();
    }

    /// Serves fixed candles, or fails when `candles` is `None`.
    struct FixedCandles {
        candles: Option<Vec<DailyCandle>>,
        requested_days: std::sync::Mutex<Vec<u32>>,
    }

    impl FixedCandles {
        fn new(candles: Option<Vec<DailyCandle>>) -> Arc<Self> {
            Arc::new(Self {
                candles,
                requested_days: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CandleFetcher for FixedCandles {
        async fn fetch_candles(&self, days: u32) -> FetchResult<Vec<DailyCandle>> {
            self.requested_days.lock().unwrap().push(days);
            self.candles
                .clone()
                .ok_or_else(|| FetchError::Network("Connection failed".to_string()))
        }
    }

    fn candle(day: u32, high: f64, low: f64) -> DailyCandle {
        DailyCandle {
            date: NaiveDate::from_ymd_opt(2024, 11, day).unwrap(),
            candle: Candle {
                open: low,
                high,
                low,
                close: high,
            },
        }
    }

    #[tokio::test]
    async fn test_volatility_endpoint() {
        let candles = FixedCandles::new(Some(vec![
            candle(11, 2660.0, 2630.0),
            candle(12, 2656.0, 2650.0),
            candle(13, 2700.0, 2640.0),
        ]));
        let (state, _) = state_with(Some(1.0));
        let state = state.with_candles(candles.clone());

        let (status, body) = call(&state, Method::GET, "/volatility?days=30").await;

        assert_eq!(status, StatusCode::OK);
        let points = body["points"].as_array().unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0]["date"], "2024-11-11");
        assert_eq!(points[0]["energy"], 30.0);
        assert_eq!(points[2]["critical"], true);
        assert_eq!(body["critical"], true);
        assert_eq!(body["critical_level"], 50.0);

        call(&state, Method::GET, "/volatility").await;
        assert_eq!(*candles.requested_days.lock().unwrap(), vec![30, 365]);
    }

    #[tokio::test]
    async fn test_volatility_rejects_bad_days() {
        let candles = FixedCandles::new(Some(Vec::new()));
        let (state, _) = state_with(Some(1.0));
        let state = state.with_candles(candles.clone());

        for query in ["days=0", "days=abc", "days=9999"] {
            let (status, body) = call(&state, Method::GET, &format!("/volatility?{}", query)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].as_str().unwrap().contains("days"));
        }
        assert!(candles.requested_days.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_volatility_upstream_failure_is_bad_gateway() {
        let (state, _) = state_with(Some(1.0));
        let state = state.with_candles(FixedCandles::new(None));

        let (status, body) = call(&state, Method::GET, "/volatility").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "network");
        assert_eq!(state.metrics.fetch_errors(FetchErrorKind::Network), 1);
    }

    #[test]
    fn test_days_param() {
        assert_eq!(days_param(None), Ok(None));
        assert_eq!(days_param(Some("foo=1")), Ok(None));
        assert_eq!(days_param(Some("foo=1&days=90")), Ok(Some(90)));
        assert!(days_param(Some("days=")).is_err());
    }
}
