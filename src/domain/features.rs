//! Feature engineering over daily bars.
//!
//! Turns an ordered OHLCV series into a supervised-learning table: trailing
//! moving averages, rolling volatility, daily return, and an integer time
//! axis. Rows whose lookback window reaches before the start of the series
//! are dropped (no padding), and `sequence_index` restarts at 0 on the first
//! retained row.

use chrono::{Datelike, NaiveDate};

use super::error::StockscopeError;
use super::ohlcv::PriceBar;

pub const MA_SHORT: usize = 5;
pub const MA_MID: usize = 10;
pub const MA_LONG: usize = 20;
pub const VOLATILITY_WINDOW: usize = 10;

/// Longest lookback plus one prior bar for the first daily return.
pub const MIN_BARS: usize = MA_LONG + 1;

/// Which columns a built table carries. Calendar columns are opt-in and the
/// choice is recorded here rather than inferred from row contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureSet {
    Base,
    WithCalendar,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarFeatures {
    /// Monday = 0 .. Sunday = 6.
    pub day_of_week: f64,
    /// 1 = January .. 12 = December.
    pub month: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    /// Zero-based chronological index over retained rows; the regression's
    /// time variable.
    pub sequence_index: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    /// Training target and forecast window seed; not a design-matrix column.
    pub close: f64,
    pub volume: f64,
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    pub volatility10: f64,
    pub daily_return: f64,
    pub calendar: Option<CalendarFeatures>,
}

impl FeatureRow {
    /// Design-matrix row, in `FeatureTable::feature_names` order.
    pub fn design_vector(&self) -> Vec<f64> {
        let mut v = vec![
            self.sequence_index as f64,
            self.open,
            self.high,
            self.low,
            self.volume,
            self.ma5,
            self.ma10,
            self.ma20,
            self.volatility10,
            self.daily_return,
        ];
        if let Some(cal) = self.calendar {
            v.push(cal.day_of_week);
            v.push(cal.month);
        }
        v
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub rows: Vec<FeatureRow>,
    pub feature_set: FeatureSet,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        let mut names = vec![
            "sequence_index",
            "open",
            "high",
            "low",
            "volume",
            "ma5",
            "ma10",
            "ma20",
            "volatility10",
            "daily_return",
        ];
        if self.feature_set == FeatureSet::WithCalendar {
            names.push("day_of_week");
            names.push("month");
        }
        names
    }

    pub fn design_matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(FeatureRow::design_vector).collect()
    }

    /// Close prices in row order.
    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 divisor). Zero for windows shorter
/// than two values.
pub(crate) fn sample_stddev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Build the model-ready table from an ordered bar series.
///
/// Fails with `InsufficientData` when fewer than [`MIN_BARS`] bars are
/// supplied. Pure and deterministic; identical input yields an identical
/// table.
pub fn build_features(
    bars: &[PriceBar],
    with_calendar: bool,
) -> Result<FeatureTable, StockscopeError> {
    if bars.len() < MIN_BARS {
        return Err(StockscopeError::InsufficientData {
            ticker: bars.first().map(|b| b.ticker.clone()).unwrap_or_default(),
            bars: bars.len(),
            minimum: MIN_BARS,
        });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    // First row with a full 20-bar lookback; the daily return and the
    // shorter windows are all available from here.
    let warmup = MA_LONG - 1;

    let mut rows = Vec::with_capacity(bars.len() - warmup);
    for (offset, i) in (warmup..bars.len()).enumerate() {
        let bar = &bars[i];
        let ma5 = mean(&closes[i + 1 - MA_SHORT..=i]);
        let ma10 = mean(&closes[i + 1 - MA_MID..=i]);
        let ma20 = mean(&closes[i + 1 - MA_LONG..=i]);
        let volatility10 = sample_stddev(&closes[i + 1 - VOLATILITY_WINDOW..=i]);
        let daily_return = bar.return_from(closes[i - 1]);

        let calendar = with_calendar.then(|| CalendarFeatures {
            day_of_week: bar.date.weekday().num_days_from_monday() as f64,
            month: bar.date.month() as f64,
        });

        rows.push(FeatureRow {
            date: bar.date,
            sequence_index: offset as i64,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume as f64,
            ma5,
            ma10,
            ma20,
            volatility10,
            daily_return,
            calendar,
        });
    }

    let feature_set = if with_calendar {
        FeatureSet::WithCalendar
    } else {
        FeatureSet::Base
    };
    Ok(FeatureTable { rows, feature_set })
}
