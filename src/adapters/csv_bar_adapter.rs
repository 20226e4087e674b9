//! CSV market data adapter.
//!
//! One file per ticker at `<dir>/<TICKER>.csv` with a
//! `date,open,high,low,close,volume` header row.

use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::error::StockscopeError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::MarketDataPort;

pub struct CsvBarAdapter {
    base_path: PathBuf,
}

impl CsvBarAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn bar_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker.to_uppercase()))
    }

    fn read_all(&self, ticker: &str) -> Result<Vec<PriceBar>, StockscopeError> {
        let path = self.bar_path(ticker);
        let content =
            fs::read_to_string(&path).map_err(|e| StockscopeError::DataUnavailable {
                ticker: ticker.to_uppercase(),
                reason: format!("failed to read {}: {e}", path.display()),
            })?;

        let unavailable = |reason: String| StockscopeError::DataUnavailable {
            ticker: ticker.to_uppercase(),
            reason,
        };

        fn field<T: FromStr>(
            record: &csv::StringRecord,
            index: usize,
            name: &str,
        ) -> Result<T, String>
        where
            T::Err: std::fmt::Display,
        {
            let raw = record
                .get(index)
                .ok_or_else(|| format!("missing {name} column"))?;
            raw.parse()
                .map_err(|e| format!("invalid {name} value {raw:?}: {e}"))
        }

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| unavailable(format!("CSV parse error: {e}")))?;

            let date_str: String = field(&record, 0, "date").map_err(&unavailable)?;
            let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                .map_err(|e| unavailable(format!("invalid date {date_str:?}: {e}")))?;

            bars.push(PriceBar {
                ticker: ticker.to_uppercase(),
                date,
                open: field(&record, 1, "open").map_err(&unavailable)?,
                high: field(&record, 2, "high").map_err(&unavailable)?,
                low: field(&record, 3, "low").map_err(&unavailable)?,
                close: field(&record, 4, "close").map_err(&unavailable)?,
                volume: field(&record, 5, "volume").map_err(&unavailable)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

impl MarketDataPort for CsvBarAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, StockscopeError> {
        let mut bars = self.read_all(ticker)?;
        bars.retain(|b| b.date >= start && b.date <= end);
        Ok(bars)
    }

    fn latest_price(&self, ticker: &str) -> Result<f64, StockscopeError> {
        let bars = self.read_all(ticker)?;
        bars.last()
            .map(|b| b.close)
            .ok_or_else(|| StockscopeError::PriceUnavailable {
                ticker: ticker.to_uppercase(),
            })
    }

    fn list_tickers(&self) -> Result<Vec<String>, StockscopeError> {
        let entries = fs::read_dir(&self.base_path).map_err(StockscopeError::Io)?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StockscopeError::Io)?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(ticker) = name.strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}
