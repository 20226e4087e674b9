//! Market data access port trait.
//!
//! The core never fetches over the network itself; a data adapter hands it
//! already-materialized bars. Failures surface as `DataUnavailable` with no
//! internal retry.

use chrono::NaiveDate;

use crate::domain::error::StockscopeError;
use crate::domain::ohlcv::PriceBar;

pub trait MarketDataPort {
    /// Ordered bars for a ticker within the date range, strictly
    /// increasing by date.
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, StockscopeError>;

    /// Most recent known price for a ticker.
    fn latest_price(&self, ticker: &str) -> Result<f64, StockscopeError>;

    fn list_tickers(&self) -> Result<Vec<String>, StockscopeError>;
}
