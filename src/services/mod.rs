pub mod eastmoney;
pub mod market_data;
pub mod retry;

pub use eastmoney::EastmoneyProvider;
pub use market_data::{FetchError, MarketDataProvider};
pub use retry::{retry, retry_with_sleeper, RetryPolicy, RetryingFetcher};
