//! End-to-end journeys across the domain and the CSV adapters.
//!
//! Tests cover:
//! - Full forecast pipeline with a mock data port (bars → features →
//!   fit → iterative forecast) for both model variants
//! - Error propagation: short history, unavailable ticker
//! - Ledger lifecycle against a real CSV store: add/average/remove,
//!   reload, valuation with a missing price
//! - Forecast/valuation consistency between port and ledger views

mod common;

use common::*;
use std::collections::HashMap;
use stockscope::adapters::csv_ledger_adapter::CsvLedgerAdapter;
use stockscope::domain::error::StockscopeError;
use stockscope::domain::features::build_features;
use stockscope::domain::forecast::{forecast, summarize_forecast};
use stockscope::domain::ledger::PortfolioLedger;
use stockscope::domain::model::{fit, Hyperparameters, ModelKind};
use stockscope::ports::data_port::MarketDataPort;
use stockscope::ports::ledger_port::LedgerStorePort;

mod forecast_pipeline {
    use super::*;

    #[test]
    fn linear_pipeline_from_port_to_forecast() {
        let bars = generate_bars("AAPL", "2024-01-01", 90, 100.0, 0.5);
        let port = MockDataPort::new().with_bars("AAPL", bars);

        let history = port
            .fetch_bars("AAPL", date(2024, 1, 1), date(2024, 12, 31))
            .unwrap();
        assert_eq!(history.len(), 90);

        let table = build_features(&history, false).unwrap();
        assert_eq!(table.len(), 90 - 19);

        let (model, report) =
            fit(&table, ModelKind::Linear, &Hyperparameters::default()).unwrap();
        assert!(report.test.r2 > 0.9, "test r2 = {}", report.test.r2);

        let points = forecast(&model, &table, 30).unwrap();
        assert_eq!(points.len(), 30);

        // Path starts the day after the last bar and never flattens.
        let last_date = table.rows.last().unwrap().date;
        assert_eq!(points[0].date, last_date + chrono::Duration::days(1));
        let first = points[0].predicted_close;
        assert!(points.iter().any(|p| p.predicted_close != first));

        // A rising series forecast keeps rising under a linear model.
        assert!(points[29].predicted_close > points[0].predicted_close);

        let current = port.latest_price("AAPL").unwrap();
        let summary = summarize_forecast(&points, current).unwrap();
        assert!(summary.change_final_pct > 0.0);
    }

    #[test]
    fn ensemble_pipeline_reports_importances() {
        let bars = generate_bars("MSFT", "2024-01-01", 120, 300.0, -0.25);
        let table = build_features(&bars, true).unwrap();

        let hp = Hyperparameters {
            trees: 30,
            ..Hyperparameters::default()
        };
        let (model, report) = fit(&table, ModelKind::Ensemble, &hp).unwrap();

        let importance = report.feature_importance.expect("ensemble importances");
        assert_eq!(importance.len(), 12);
        let sum: f64 = importance.iter().map(|(_, v)| v).sum();
        assert!((sum - 1.0).abs() < 1e-9);

        let points = forecast(&model, &table, 10).unwrap();
        assert_eq!(points.len(), 10);

        // Tree leaves interpolate the training range; a falling series
        // must not forecast above its own maximum.
        let max_close = bars.iter().map(|b| b.close).fold(f64::MIN, f64::max);
        for point in &points {
            assert!(point.predicted_close <= max_close + 1e-6);
        }
    }

    #[test]
    fn short_history_fails_before_training() {
        let bars = generate_bars("TINY", "2024-01-01", 15, 50.0, 1.0);
        let err = build_features(&bars, false).unwrap_err();
        match err {
            StockscopeError::InsufficientData { ticker, bars, minimum } => {
                assert_eq!(ticker, "TINY");
                assert_eq!(bars, 15);
                assert_eq!(minimum, 21);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unavailable_ticker_propagates_from_port() {
        let port = MockDataPort::new().with_error("GONE", "feed offline");
        let err = port
            .fetch_bars("GONE", date(2024, 1, 1), date(2024, 12, 31))
            .unwrap_err();
        assert!(matches!(err, StockscopeError::DataUnavailable { .. }));
    }
}

mod ledger_lifecycle {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn purchases_average_and_survive_reload() {
        let dir = TempDir::new().unwrap();
        let store = CsvLedgerAdapter::new(dir.path().join("portfolio.csv"));

        let mut ledger = store.load().unwrap();
        assert!(ledger.is_empty());

        ledger
            .add_purchase("X", "X Corp", 10.0, 100.0, date(2024, 1, 5))
            .unwrap();
        ledger
            .add_purchase("X", "X Corp", 5.0, 130.0, date(2024, 2, 5))
            .unwrap();
        store.save(&ledger).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.len(), 1);
        let record = reloaded.get("X").unwrap();
        assert!((record.quantity - 15.0).abs() < 1e-12);
        assert!((record.average_purchase_price - 110.0).abs() < 1e-12);
        assert_eq!(record.first_purchase_date, date(2024, 1, 5));
    }

    #[test]
    fn valuation_with_missing_price_is_partial() {
        let port = MockDataPort::new()
            .with_bars("A", generate_bars("A", "2024-01-01", 30, 100.0, 1.0))
            .with_error("B", "feed offline");

        let mut ledger = PortfolioLedger::new();
        ledger
            .add_purchase("A", "A Co", 10.0, 100.0, date(2024, 1, 5))
            .unwrap();
        ledger
            .add_purchase("B", "B Co", 5.0, 200.0, date(2024, 1, 6))
            .unwrap();

        // Price collection mirrors the CLI: failures leave the map.
        let mut prices = HashMap::new();
        for record in ledger.records() {
            if let Ok(price) = port.latest_price(&record.ticker) {
                prices.insert(record.ticker.clone(), price);
            }
        }

        let summary = ledger.summary(&prices);
        assert!((summary.total_investment - 2000.0).abs() < 1e-9);
        // Last generated close for A is 129.
        assert!((summary.current_value - 1290.0).abs() < 1e-9);
        assert!((summary.total_gain_loss - 290.0).abs() < 1e-9);
        assert_eq!(summary.missing_prices, vec!["B".to_string()]);

        let allocation = ledger.allocation(&prices);
        assert_eq!(allocation.len(), 1);
        assert!((allocation[0].1 - 100.0).abs() < 1e-9);
    }

    #[test]
    fn remove_and_clear_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = CsvLedgerAdapter::new(dir.path().join("portfolio.csv"));

        let mut ledger = store.load().unwrap();
        assert!(ledger.remove_holding("GHOST").is_none());

        ledger
            .add_purchase("A", "A Co", 1.0, 10.0, date(2024, 1, 5))
            .unwrap();
        ledger
            .add_purchase("B", "B Co", 2.0, 20.0, date(2024, 1, 6))
            .unwrap();
        store.save(&ledger).unwrap();

        let mut reloaded = store.load().unwrap();
        assert!(reloaded.remove_holding("A").is_some());
        assert!(reloaded.remove_holding("A").is_none());
        store.save(&reloaded).unwrap();

        let mut after_remove = store.load().unwrap();
        assert_eq!(after_remove.len(), 1);

        after_remove.clear();
        store.save(&after_remove).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn performers_rank_against_port_prices() {
        let port = MockDataPort::new()
            .with_bars("UP", generate_bars("UP", "2024-01-01", 30, 100.0, 2.0))
            .with_bars("DN", generate_bars("DN", "2024-01-01", 30, 100.0, -1.0));

        let mut ledger = PortfolioLedger::new();
        ledger
            .add_purchase("UP", "Up Co", 10.0, 100.0, date(2024, 1, 5))
            .unwrap();
        ledger
            .add_purchase("DN", "Down Co", 10.0, 100.0, date(2024, 1, 5))
            .unwrap();

        let mut prices = HashMap::new();
        for record in ledger.records() {
            prices.insert(
                record.ticker.clone(),
                port.latest_price(&record.ticker).unwrap(),
            );
        }

        let (best, worst) = ledger.best_worst(&prices).unwrap();
        assert_eq!(best.ticker, "UP");
        assert_eq!(worst.ticker, "DN");
        assert!(best.gain_loss_pct > 0.0);
        assert!(worst.gain_loss_pct < 0.0);
    }
}
