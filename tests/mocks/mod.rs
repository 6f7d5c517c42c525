pub mod mock_price_fetcher;

pub use mock_price_fetcher::MockPriceFetcher;
