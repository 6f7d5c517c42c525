use async_trait::async_trait;
use gold_price_service::error::{FetchError, FetchResult};
use gold_price_service::PriceFetcher;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock price fetcher for testing.
///
/// Replays queued outcomes in order and counts calls. Once the queue is
/// empty every call fails with a network error.
#[allow(dead_code)]
#[derive(Clone)]
pub struct MockPriceFetcher {
    outcomes: Arc<Mutex<VecDeque<FetchResult<f64>>>>,
    calls: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MockPriceFetcher {
    /// Create a new MockPriceFetcher with nothing queued.
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a successful fetch.
    pub fn push_price(&self, price: f64) -> &Self {
        self.outcomes.lock().unwrap().push_back(Ok(price));
        self
    }

    /// Queue a failed fetch.
    pub fn push_error(&self, error: FetchError) -> &Self {
        self.outcomes.lock().unwrap().push_back(Err(error));
        self
    }

    /// Get the number of times fetch was called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockPriceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceFetcher for MockPriceFetcher {
    async fn fetch(&self) -> FetchResult<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Network("no outcome queued".to_string())))
    }
}
