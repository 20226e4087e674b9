//! CSV ledger store adapter.
//!
//! Tabular store keyed by ticker with columns
//! `ticker,company_name,quantity,average_purchase_price,first_purchase_date,last_updated`.
//! A missing file loads as an empty ledger; saves go through a sibling
//! temp file and a rename so a crash never truncates the store.

use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

use crate::domain::error::StockscopeError;
use crate::domain::ledger::{HoldingRecord, PortfolioLedger, PortfolioSummary};
use crate::ports::ledger_port::LedgerStorePort;

const HEADER: [&str; 6] = [
    "ticker",
    "company_name",
    "quantity",
    "average_purchase_price",
    "first_purchase_date",
    "last_updated",
];

pub struct CsvLedgerAdapter {
    path: PathBuf,
}

impl CsvLedgerAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn parse_record(record: &csv::StringRecord) -> Result<HoldingRecord, String> {
        let get = |i: usize| record.get(i).ok_or_else(|| format!("missing column {i}"));

        let quantity: f64 = get(2)?
            .parse()
            .map_err(|e| format!("invalid quantity: {e}"))?;
        let average_purchase_price: f64 = get(3)?
            .parse()
            .map_err(|e| format!("invalid average_purchase_price: {e}"))?;
        let first_purchase_date = NaiveDate::parse_from_str(get(4)?, "%Y-%m-%d")
            .map_err(|e| format!("invalid first_purchase_date: {e}"))?;
        let last_updated = NaiveDate::parse_from_str(get(5)?, "%Y-%m-%d")
            .map_err(|e| format!("invalid last_updated: {e}"))?;

        Ok(HoldingRecord {
            ticker: get(0)?.to_string(),
            company_name: get(1)?.to_string(),
            quantity,
            average_purchase_price,
            first_purchase_date,
            last_updated,
        })
    }
}

impl LedgerStorePort for CsvLedgerAdapter {
    fn load(&self) -> Result<PortfolioLedger, StockscopeError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PortfolioLedger::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut records = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| StockscopeError::Validation {
                field: "ledger_file".into(),
                reason: format!("CSV parse error: {e}"),
            })?;
            let parsed =
                Self::parse_record(&record).map_err(|reason| StockscopeError::Validation {
                    field: "ledger_file".into(),
                    reason,
                })?;
            records.push(parsed);
        }

        PortfolioLedger::from_records(records)
    }

    fn save(&self, ledger: &PortfolioLedger) -> Result<(), StockscopeError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut wtr = csv::Writer::from_path(&tmp_path).map_err(io_from_csv)?;
            wtr.write_record(HEADER).map_err(io_from_csv)?;
            for record in ledger.records() {
                wtr.write_record([
                    record.ticker.as_str(),
                    record.company_name.as_str(),
                    &record.quantity.to_string(),
                    &record.average_purchase_price.to_string(),
                    &record.first_purchase_date.format("%Y-%m-%d").to_string(),
                    &record.last_updated.format("%Y-%m-%d").to_string(),
                ])
                .map_err(io_from_csv)?;
            }
            wtr.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn io_from_csv(e: csv::Error) -> StockscopeError {
    StockscopeError::Io(std::io::Error::other(e))
}

/// Export a portfolio summary's position views for spreadsheet use.
pub fn write_summary_report(
    path: &PathBuf,
    summary: &PortfolioSummary,
) -> Result<(), StockscopeError> {
    let mut wtr = csv::Writer::from_path(path).map_err(io_from_csv)?;
    wtr.write_record([
        "ticker",
        "company_name",
        "quantity",
        "average_purchase_price",
        "current_price",
        "investment",
        "current_value",
        "gain_loss",
        "gain_loss_pct",
    ])
    .map_err(io_from_csv)?;

    for p in &summary.positions {
        wtr.write_record([
            p.ticker.as_str(),
            p.company_name.as_str(),
            &p.quantity.to_string(),
            &p.average_purchase_price.to_string(),
            &p.current_price.to_string(),
            &p.investment.to_string(),
            &p.current_value.to_string(),
            &p.gain_loss.to_string(),
            &format!("{:.4}", p.gain_loss_pct),
        ])
        .map_err(io_from_csv)?;
    }
    wtr.flush()?;
    Ok(())
}
