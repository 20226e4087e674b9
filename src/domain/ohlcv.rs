//! Daily OHLCV bar representation.

use chrono::NaiveDate;

/// One trading session for one ticker. Ordered sequences of bars are
/// strictly increasing by date; bars are immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBar {
    /// Percentage change from the previous close. Zero when the previous
    /// close is zero so corporate-action artifacts cannot divide by zero.
    pub fn return_from(&self, prev_close: f64) -> f64 {
        if prev_close == 0.0 {
            0.0
        } else {
            (self.close - prev_close) / prev_close
        }
    }
}
