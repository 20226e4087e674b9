#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

use stockscope::domain::error::StockscopeError;
pub use stockscope::domain::ohlcv::PriceBar;
use stockscope::ports::data_port::MarketDataPort;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(ticker: &str, date_str: &str, close: f64) -> PriceBar {
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap();
    PriceBar {
        ticker: ticker.to_string(),
        date,
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 10_000,
    }
}

/// Consecutive daily bars with closes from `start_close` stepping by
/// `step` per day.
pub fn generate_bars(
    ticker: &str,
    start_date: &str,
    count: usize,
    start_close: f64,
    step: f64,
) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let close = start_close + step * i as f64;
            PriceBar {
                ticker: ticker.to_string(),
                date: start + Duration::days(i as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 10_000 + i as i64,
            }
        })
        .collect()
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, StockscopeError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(StockscopeError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self
            .data
            .get(ticker)
            .ok_or_else(|| StockscopeError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: "no mock data".into(),
            })?;
        Ok(bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect())
    }

    fn latest_price(&self, ticker: &str) -> Result<f64, StockscopeError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(StockscopeError::DataUnavailable {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        self.data
            .get(ticker)
            .and_then(|bars| bars.last())
            .map(|b| b.close)
            .ok_or_else(|| StockscopeError::PriceUnavailable {
                ticker: ticker.to_string(),
            })
    }

    fn list_tickers(&self) -> Result<Vec<String>, StockscopeError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}
