//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_bar_adapter::CsvBarAdapter;
use crate::adapters::csv_ledger_adapter::{write_summary_report, CsvLedgerAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::StockscopeError;
use crate::domain::features::{build_features, FeatureTable};
use crate::domain::forecast::{forecast, summarize_forecast, trend_forecast, ForecastPoint};
use crate::domain::ledger::PortfolioLedger;
use crate::domain::model::{self, Hyperparameters, ModelKind};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::ledger_port::LedgerStorePort;

#[derive(Parser, Debug)]
#[command(name = "stockscope", about = "Stock feature engineering, forecasting and portfolio tracking")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train a model on a ticker's history and forecast future closes
    Predict {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
        /// Model kind: linear or ensemble (overrides config)
        #[arg(long)]
        model: Option<String>,
        /// Days to forecast (overrides config)
        #[arg(long)]
        horizon: Option<u32>,
        /// Include day-of-week and month feature columns
        #[arg(long)]
        calendar: bool,
        /// Use the lightweight moving-average trend projection instead
        #[arg(long)]
        trend: bool,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Export the engineered feature table for a ticker
    Features {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        calendar: bool,
        /// Output CSV path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Manage portfolio holdings
    Portfolio {
        #[arg(short, long)]
        config: PathBuf,
        #[command(subcommand)]
        action: PortfolioAction,
    },
    /// Show bar count and date range for ticker(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PortfolioAction {
    /// Record a purchase (creates or averages into a holding)
    Add {
        ticker: String,
        #[arg(long)]
        quantity: f64,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        company: Option<String>,
    },
    /// Delete a holding
    Remove { ticker: String },
    /// Overwrite a holding's quantity and/or average price
    Update {
        ticker: String,
        #[arg(long)]
        quantity: Option<f64>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Value the portfolio at current prices
    Summary,
    /// Percentage of current value per holding
    Allocation,
    /// Best and worst holdings by percentage gain
    Performers,
    /// Remove every holding
    Clear,
    /// Write the valued portfolio to a CSV report
    Export {
        #[arg(short, long)]
        output: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Predict {
            config,
            ticker,
            model,
            horizon,
            calendar,
            trend,
            from,
            to,
        } => run_predict(
            &config,
            &ticker,
            model.as_deref(),
            horizon,
            calendar,
            trend,
            from,
            to,
        ),
        Command::Features {
            config,
            ticker,
            calendar,
            output,
        } => run_features(&config, &ticker, calendar, output.as_ref()),
        Command::Portfolio { config, action } => run_portfolio(&config, action),
        Command::Info { config, ticker } => run_info(&config, ticker.as_deref()),
    }
}

fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn bar_adapter(config: &dyn ConfigPort) -> Result<CsvBarAdapter, StockscopeError> {
    let dir = config.require_string("data", "bars_dir")?;
    Ok(CsvBarAdapter::new(PathBuf::from(dir)))
}

fn ledger_adapter(config: &dyn ConfigPort) -> Result<CsvLedgerAdapter, StockscopeError> {
    let path = config.require_string("portfolio", "ledger_file")?;
    Ok(CsvLedgerAdapter::new(PathBuf::from(path)))
}

fn hyperparameters(config: &dyn ConfigPort) -> Hyperparameters {
    let defaults = Hyperparameters::default();
    Hyperparameters {
        trees: config.get_int("prediction", "trees", defaults.trees as i64) as usize,
        max_depth: config.get_int("prediction", "max_depth", defaults.max_depth as i64) as usize,
        seed: config.get_int("prediction", "seed", defaults.seed as i64) as u64,
        train_fraction: config.get_double("prediction", "train_fraction", defaults.train_fraction),
        ..defaults
    }
}

fn run_predict(
    config_path: &PathBuf,
    ticker: &str,
    model_override: Option<&str>,
    horizon_override: Option<u32>,
    calendar_flag: bool,
    trend: bool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match predict_pipeline(
        &config,
        ticker,
        model_override,
        horizon_override,
        calendar_flag,
        trend,
        from,
        to,
    ) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn predict_pipeline(
    config: &dyn ConfigPort,
    ticker: &str,
    model_override: Option<&str>,
    horizon_override: Option<u32>,
    calendar_flag: bool,
    trend: bool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<(), StockscopeError> {
    let data_port = bar_adapter(config)?;
    let horizon = horizon_override
        .unwrap_or_else(|| config.get_int("prediction", "horizon_days", 30).max(0) as u32);
    let start = from.unwrap_or(NaiveDate::MIN);
    let end = to.unwrap_or(NaiveDate::MAX);

    eprintln!("Loading bars for {}", ticker.to_uppercase());
    let bars = data_port.fetch_bars(ticker, start, end)?;
    eprintln!("  {} bars", bars.len());

    let points: Vec<ForecastPoint> = if trend {
        let window = config.get_int("prediction", "trend_window", 20).max(2) as usize;
        eprintln!("Projecting {window}-day moving-average trend");
        trend_forecast(&bars, window, horizon)?
    } else {
        let kind: ModelKind = match model_override {
            Some(s) => s.parse()?,
            None => config
                .get_string("prediction", "model")
                .unwrap_or_else(|| "linear".to_string())
                .parse()?,
        };
        let with_calendar =
            calendar_flag || config.get_bool("prediction", "with_calendar", false);
        let hp = hyperparameters(config);

        let table = build_features(&bars, with_calendar)?;
        eprintln!(
            "Training {kind} model on {} rows ({} features)",
            table.len(),
            table.feature_names().len()
        );

        let (trained, report) = model::fit(&table, kind, &hp)?;

        eprintln!("\n=== Model Accuracy ===");
        eprintln!("Partitions:  {} train / {} test", report.train_rows, report.test_rows);
        eprintln!(
            "Train:       RMSE {:.4}  MAE {:.4}  R2 {:.4}",
            report.train.rmse, report.train.mae, report.train.r2
        );
        eprintln!(
            "Test:        RMSE {:.4}  MAE {:.4}  R2 {:.4}",
            report.test.rmse, report.test.mae, report.test.r2
        );
        eprintln!("Confidence:  {}", report.confidence);

        if let Some(importance) = &report.feature_importance {
            let mut ranked: Vec<_> = importance.clone();
            ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            eprintln!("\n=== Feature Importance ===");
            for (name, share) in &ranked {
                eprintln!("  {name:<16} {:.4}", share);
            }
        }

        forecast(&trained, &table, horizon)?
    };

    println!("date,predicted_close");
    for point in &points {
        println!("{},{:.4}", point.date, point.predicted_close);
    }

    match data_port.latest_price(ticker) {
        Ok(current) => {
            let summary = summarize_forecast(&points, current)?;
            eprintln!("\n=== Outlook ===");
            eprintln!("Current price:  {:.2}", summary.current_price);
            if let (Some(p7), Some(c7)) = (summary.predicted_7d, summary.change_7d_pct) {
                eprintln!("In 7 days:      {:.2} ({:+.2}%)", p7, c7);
            }
            eprintln!(
                "In {} days:     {:.2} ({:+.2}%)",
                points.len(),
                summary.predicted_final,
                summary.change_final_pct
            );
        }
        Err(e) => eprintln!("warning: no outlook summary ({e})"),
    }

    Ok(())
}

fn run_features(
    config_path: &PathBuf,
    ticker: &str,
    calendar: bool,
    output: Option<&PathBuf>,
) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), StockscopeError> {
        let data_port = bar_adapter(&config)?;
        let bars = data_port.fetch_bars(ticker, NaiveDate::MIN, NaiveDate::MAX)?;
        let table = build_features(&bars, calendar)?;

        match output {
            Some(path) => {
                let file = std::fs::File::create(path)?;
                write_feature_table(file, &table)?;
                eprintln!("{} rows written to {}", table.len(), path.display());
            }
            None => write_feature_table(std::io::stdout(), &table)?,
        }
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn write_feature_table<W: std::io::Write>(
    writer: W,
    table: &FeatureTable,
) -> Result<(), StockscopeError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["date"];
    header.extend(table.feature_names());
    header.push("close");
    wtr.write_record(&header)
        .map_err(|e| StockscopeError::Io(std::io::Error::other(e)))?;

    for row in &table.rows {
        let mut record = vec![row.date.format("%Y-%m-%d").to_string()];
        record.extend(row.design_vector().iter().map(|v| v.to_string()));
        record.push(row.close.to_string());
        wtr.write_record(&record)
            .map_err(|e| StockscopeError::Io(std::io::Error::other(e)))?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_portfolio(config_path: &PathBuf, action: PortfolioAction) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    match portfolio_action(&config, action) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

/// Current prices for every held ticker. Tickers whose price lookup fails
/// are left out of the map; aggregation reports them as unavailable.
fn collect_prices(
    ledger: &PortfolioLedger,
    data_port: &dyn MarketDataPort,
) -> HashMap<String, f64> {
    let mut prices = HashMap::new();
    for record in ledger.records() {
        match data_port.latest_price(&record.ticker) {
            Ok(price) => {
                prices.insert(record.ticker.clone(), price);
            }
            Err(e) => eprintln!("warning: {e}"),
        }
    }
    prices
}

fn portfolio_action(
    config: &dyn ConfigPort,
    action: PortfolioAction,
) -> Result<(), StockscopeError> {
    let store = ledger_adapter(config)?;
    let mut ledger = store.load()?;

    match action {
        PortfolioAction::Add {
            ticker,
            quantity,
            price,
            date,
            company,
        } => {
            let company = company.unwrap_or_else(|| ticker.to_uppercase());
            let record = ledger.add_purchase(&ticker, &company, quantity, price, date)?;
            eprintln!(
                "{}: {} shares at average {:.2}",
                record.ticker, record.quantity, record.average_purchase_price
            );
            store.save(&ledger)?;
        }
        PortfolioAction::Remove { ticker } => match ledger.remove_holding(&ticker) {
            Some(record) => {
                eprintln!("Removed {} ({} shares)", record.ticker, record.quantity);
                store.save(&ledger)?;
            }
            None => eprintln!("No holding for {}", ticker.to_uppercase()),
        },
        PortfolioAction::Update {
            ticker,
            quantity,
            price,
            date,
        } => {
            let record = ledger.update_holding(&ticker, quantity, price, date)?;
            eprintln!(
                "{}: {} shares at average {:.2}",
                record.ticker, record.quantity, record.average_purchase_price
            );
            store.save(&ledger)?;
        }
        PortfolioAction::Summary => {
            let data_port = bar_adapter(config)?;
            let prices = collect_prices(&ledger, &data_port);
            let summary = ledger.summary(&prices);

            println!("ticker,quantity,avg_price,current_price,investment,value,gain_loss,gain_loss_pct");
            for p in &summary.positions {
                println!(
                    "{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
                    p.ticker,
                    p.quantity,
                    p.average_purchase_price,
                    p.current_price,
                    p.investment,
                    p.current_value,
                    p.gain_loss,
                    p.gain_loss_pct
                );
            }

            eprintln!("\n=== Portfolio ===");
            eprintln!("Holdings:         {}", summary.holding_count);
            eprintln!("Total investment: {:.2}", summary.total_investment);
            eprintln!("Current value:    {:.2}", summary.current_value);
            eprintln!(
                "Gain/loss:        {:+.2} ({:+.2}%)",
                summary.total_gain_loss, summary.gain_loss_pct
            );
            if !summary.missing_prices.is_empty() {
                eprintln!("No price for:     {}", summary.missing_prices.join(", "));
            }

            if let Some(report) = ledger.concentration(&prices) {
                eprintln!(
                    "Concentration:    {:.1}% in {} (risk: {})",
                    report.max_allocation_pct, report.max_ticker, report.risk
                );
            }
        }
        PortfolioAction::Allocation => {
            let data_port = bar_adapter(config)?;
            let prices = collect_prices(&ledger, &data_port);
            for (ticker, pct) in ledger.allocation(&prices) {
                println!("{ticker},{pct:.2}");
            }
        }
        PortfolioAction::Performers => {
            let data_port = bar_adapter(config)?;
            let prices = collect_prices(&ledger, &data_port);
            match ledger.best_worst(&prices) {
                Some((best, worst)) => {
                    println!(
                        "best,{},{:.2},{:+.2}",
                        best.ticker, best.gain_loss_pct, best.gain_loss
                    );
                    println!(
                        "worst,{},{:.2},{:+.2}",
                        worst.ticker, worst.gain_loss_pct, worst.gain_loss
                    );
                }
                None => eprintln!("No priced holdings"),
            }
        }
        PortfolioAction::Clear => {
            ledger.clear();
            store.save(&ledger)?;
            eprintln!("Portfolio cleared");
        }
        PortfolioAction::Export { output } => {
            let data_port = bar_adapter(config)?;
            let prices = collect_prices(&ledger, &data_port);
            let summary = ledger.summary(&prices);
            write_summary_report(&output, &summary)?;
            eprintln!(
                "{} positions written to {}",
                summary.positions.len(),
                output.display()
            );
        }
    }

    Ok(())
}

fn run_info(config_path: &PathBuf, ticker: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let result = (|| -> Result<(), StockscopeError> {
        let data_port = bar_adapter(&config)?;
        let tickers = match ticker {
            Some(t) => vec![t.to_uppercase()],
            None => data_port.list_tickers()?,
        };

        for t in &tickers {
            match data_port.fetch_bars(t, NaiveDate::MIN, NaiveDate::MAX) {
                Ok(bars) if bars.is_empty() => eprintln!("{t}: no data"),
                Ok(bars) => println!(
                    "{t}: {} bars, {} to {}",
                    bars.len(),
                    bars.first().unwrap().date,
                    bars.last().unwrap().date
                ),
                Err(e) => eprintln!("error querying {t}: {e}"),
            }
        }
        Ok(())
    })();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}
