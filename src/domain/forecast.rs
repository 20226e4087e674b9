//! Iterative multi-day forecasting.
//!
//! Feeding one frozen feature row into a trained model for every future day
//! collapses the forecast to a flat line, because the moving averages and
//! returns never move. The forecaster instead owns a rolling close window
//! (real closes followed by its own predictions) and rebuilds the derived
//! columns from that window at every step.
//!
//! Forecast dates advance by one calendar day per step with no
//! weekend/holiday skipping. That matches the upstream product behavior and
//! is asserted in tests rather than corrected here.

use chrono::{Datelike, Duration, NaiveDate};

use super::error::StockscopeError;
use super::features::{
    mean, sample_stddev, FeatureSet, FeatureTable, MA_LONG, MA_MID, MA_SHORT, VOLATILITY_WINDOW,
};
use super::model::TrainedModel;
use super::ohlcv::PriceBar;

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_close: f64,
}

/// Drive a trained model forward `horizon_days` days past the end of the
/// feature table.
///
/// Open/high/low/volume are carried forward from the last real row; the
/// derived columns roll with the window. Each predicted close is appended
/// to the window before the next step, so no two steps see identical
/// derived features unless the model itself is degenerate.
pub fn forecast(
    model: &TrainedModel,
    table: &FeatureTable,
    horizon_days: u32,
) -> Result<Vec<ForecastPoint>, StockscopeError> {
    if horizon_days == 0 {
        return Err(StockscopeError::Validation {
            field: "horizon_days".into(),
            reason: "must be greater than zero".into(),
        });
    }
    let Some(last) = table.rows.last() else {
        return Err(StockscopeError::Validation {
            field: "features".into(),
            reason: "empty feature table".into(),
        });
    };

    let with_calendar = table.feature_set == FeatureSet::WithCalendar;

    // Private rolling window; the caller's history is never touched.
    let mut window: Vec<f64> = table.rows.iter().map(|r| r.close).collect();
    let mut sequence_index = last.sequence_index;
    let mut date = last.date;
    let mut points = Vec::with_capacity(horizon_days as usize);

    for _ in 0..horizon_days {
        sequence_index += 1;
        date += Duration::days(1);

        let ma5 = tail_mean(&window, MA_SHORT);
        let ma10 = tail_mean(&window, MA_MID);
        let ma20 = tail_mean(&window, MA_LONG);
        let volatility10 = tail_stddev(&window, VOLATILITY_WINDOW);
        let daily_return = last_return(&window);

        let mut features = vec![
            sequence_index as f64,
            last.open,
            last.high,
            last.low,
            last.volume,
            ma5,
            ma10,
            ma20,
            volatility10,
            daily_return,
        ];
        if with_calendar {
            features.push(date.weekday().num_days_from_monday() as f64);
            features.push(date.month() as f64);
        }

        let predicted_close = model.predict_row(&features)?;
        window.push(predicted_close);
        points.push(ForecastPoint {
            date,
            predicted_close,
        });
    }

    Ok(points)
}

fn tail_mean(window: &[f64], k: usize) -> f64 {
    let start = window.len().saturating_sub(k);
    mean(&window[start..])
}

fn tail_stddev(window: &[f64], k: usize) -> f64 {
    let start = window.len().saturating_sub(k);
    sample_stddev(&window[start..])
}

fn last_return(window: &[f64]) -> f64 {
    if window.len() < 2 {
        return 0.0;
    }
    let prev = window[window.len() - 2];
    let curr = window[window.len() - 1];
    if prev == 0.0 {
        0.0
    } else {
        (curr - prev) / prev
    }
}

/// Lightweight alternative forecast: extrapolate the slope of the trailing
/// moving average. No model required.
pub fn trend_forecast(
    bars: &[PriceBar],
    window: usize,
    horizon_days: u32,
) -> Result<Vec<ForecastPoint>, StockscopeError> {
    if horizon_days == 0 {
        return Err(StockscopeError::Validation {
            field: "horizon_days".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if window < 2 {
        return Err(StockscopeError::Validation {
            field: "window".into(),
            reason: "must be at least 2".into(),
        });
    }
    // `window` MA values need `window` bars each; the oldest MA value
    // looks back a further window-1 bars.
    let minimum = 2 * window - 1;
    if bars.len() < minimum {
        return Err(StockscopeError::InsufficientData {
            ticker: bars.first().map(|b| b.ticker.clone()).unwrap_or_default(),
            bars: bars.len(),
            minimum,
        });
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ma: Vec<f64> = (window - 1..closes.len())
        .map(|i| mean(&closes[i + 1 - window..=i]))
        .collect();

    let recent = &ma[ma.len() - window..];
    let trend = (recent[recent.len() - 1] - recent[0]) / recent.len() as f64;

    let last_close = closes[closes.len() - 1];
    let last_date = bars[bars.len() - 1].date;

    Ok((1..=horizon_days as i64)
        .map(|i| ForecastPoint {
            date: last_date + Duration::days(i),
            predicted_close: last_close + trend * i as f64,
        })
        .collect())
}

/// Headline view of a forecast path against the current price.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSummary {
    pub current_price: f64,
    pub predicted_7d: Option<f64>,
    pub predicted_final: f64,
    pub change_7d_pct: Option<f64>,
    pub change_final_pct: f64,
}

pub fn summarize_forecast(
    points: &[ForecastPoint],
    current_price: f64,
) -> Result<ForecastSummary, StockscopeError> {
    let Some(last) = points.last() else {
        return Err(StockscopeError::Validation {
            field: "forecast".into(),
            reason: "empty forecast path".into(),
        });
    };
    if current_price <= 0.0 {
        return Err(StockscopeError::Validation {
            field: "current_price".into(),
            reason: "must be positive".into(),
        });
    }

    let pct = |p: f64| (p - current_price) / current_price * 100.0;
    let predicted_7d = points.get(6).map(|p| p.predicted_close);

    Ok(ForecastSummary {
        current_price,
        predicted_7d,
        predicted_final: last.predicted_close,
        change_7d_pct: predicted_7d.map(pct),
        change_final_pct: pct(last.predicted_close),
    })
}
