//! Portfolio holdings ledger.
//!
//! One record per ticker is the central invariant: repeated buys of the
//! same ticker merge into the existing record with an investment-weighted
//! average price. The record set is owned by the ledger value; callers
//! construct one explicitly and pass it where needed.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::error::StockscopeError;

#[derive(Debug, Clone, PartialEq)]
pub struct HoldingRecord {
    pub ticker: String,
    pub company_name: String,
    pub quantity: f64,
    pub average_purchase_price: f64,
    pub first_purchase_date: NaiveDate,
    pub last_updated: NaiveDate,
}

/// One holding valued at a current price.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionView {
    pub ticker: String,
    pub company_name: String,
    pub quantity: f64,
    pub average_purchase_price: f64,
    pub current_price: f64,
    pub investment: f64,
    pub current_value: f64,
    pub gain_loss: f64,
    pub gain_loss_pct: f64,
}

/// Aggregate view. A holding without a current price still counts toward
/// `total_investment` but is excluded from the value and gain figures, and
/// is listed in `missing_prices`; one bad ticker never blanks the view.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub total_investment: f64,
    pub current_value: f64,
    pub total_gain_loss: f64,
    /// Gain relative to the investment of the priced holdings only.
    pub gain_loss_pct: f64,
    pub holding_count: usize,
    pub positions: Vec<PositionView>,
    pub missing_prices: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcentrationRisk {
    Low,
    Moderate,
    High,
}

impl fmt::Display for ConcentrationRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcentrationRisk::Low => write!(f, "low"),
            ConcentrationRisk::Moderate => write!(f, "moderate"),
            ConcentrationRisk::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcentrationReport {
    pub weighted_gain_pct: f64,
    pub max_allocation_pct: f64,
    pub max_ticker: String,
    pub risk: ConcentrationRisk,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioLedger {
    holdings: BTreeMap<String, HoldingRecord>,
}

fn validate_positive(field: &str, value: f64) -> Result<(), StockscopeError> {
    if !(value > 0.0) || !value.is_finite() {
        return Err(StockscopeError::Validation {
            field: field.into(),
            reason: format!("{value} is not a positive number"),
        });
    }
    Ok(())
}

fn normalize_ticker(ticker: &str) -> Result<String, StockscopeError> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(StockscopeError::Validation {
            field: "ticker".into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(ticker)
}

impl PortfolioLedger {
    pub fn new() -> Self {
        PortfolioLedger::default()
    }

    /// Rebuild a ledger from stored records, enforcing the invariants a
    /// hand-edited store could have broken.
    pub fn from_records(records: Vec<HoldingRecord>) -> Result<Self, StockscopeError> {
        let mut holdings = BTreeMap::new();
        for record in records {
            let ticker = normalize_ticker(&record.ticker)?;
            validate_positive("quantity", record.quantity)?;
            validate_positive("average_purchase_price", record.average_purchase_price)?;
            if holdings
                .insert(ticker.clone(), HoldingRecord { ticker, ..record })
                .is_some()
            {
                return Err(StockscopeError::Validation {
                    field: "ticker".into(),
                    reason: "duplicate record in ledger store".into(),
                });
            }
        }
        Ok(PortfolioLedger { holdings })
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn get(&self, ticker: &str) -> Option<&HoldingRecord> {
        self.holdings.get(&ticker.trim().to_uppercase())
    }

    /// Records in ticker order.
    pub fn records(&self) -> impl Iterator<Item = &HoldingRecord> {
        self.holdings.values()
    }

    /// Record a purchase. First purchase of a ticker creates its record;
    /// later purchases merge in place:
    /// `new_avg = (old_qty × old_avg + qty × price) / (old_qty + qty)`.
    pub fn add_purchase(
        &mut self,
        ticker: &str,
        company_name: &str,
        quantity: f64,
        price: f64,
        date: NaiveDate,
    ) -> Result<&HoldingRecord, StockscopeError> {
        let ticker = normalize_ticker(ticker)?;
        validate_positive("quantity", quantity)?;
        validate_positive("price", price)?;

        let record = self
            .holdings
            .entry(ticker.clone())
            .and_modify(|r| {
                let new_quantity = r.quantity + quantity;
                r.average_purchase_price =
                    (r.quantity * r.average_purchase_price + quantity * price) / new_quantity;
                r.quantity = new_quantity;
                r.last_updated = date;
            })
            .or_insert_with(|| HoldingRecord {
                ticker,
                company_name: company_name.to_string(),
                quantity,
                average_purchase_price: price,
                first_purchase_date: date,
                last_updated: date,
            });
        Ok(record)
    }

    /// Delete a holding. Returns the removed record, or `None` when the
    /// ticker was not held; deleting an absent ticker is not an error.
    pub fn remove_holding(&mut self, ticker: &str) -> Option<HoldingRecord> {
        self.holdings.remove(&ticker.trim().to_uppercase())
    }

    /// Overwrite quantity and/or average price of an existing holding.
    pub fn update_holding(
        &mut self,
        ticker: &str,
        quantity: Option<f64>,
        price: Option<f64>,
        date: NaiveDate,
    ) -> Result<&HoldingRecord, StockscopeError> {
        let ticker = normalize_ticker(ticker)?;
        if let Some(q) = quantity {
            validate_positive("quantity", q)?;
        }
        if let Some(p) = price {
            validate_positive("price", p)?;
        }

        let record = self
            .holdings
            .get_mut(&ticker)
            .ok_or(StockscopeError::NotFound { ticker })?;
        if let Some(q) = quantity {
            record.quantity = q;
        }
        if let Some(p) = price {
            record.average_purchase_price = p;
        }
        record.last_updated = date;
        Ok(record)
    }

    pub fn clear(&mut self) {
        self.holdings.clear();
    }

    fn view(record: &HoldingRecord, current_price: f64) -> PositionView {
        let investment = record.quantity * record.average_purchase_price;
        let current_value = record.quantity * current_price;
        let gain_loss = current_value - investment;
        PositionView {
            ticker: record.ticker.clone(),
            company_name: record.company_name.clone(),
            quantity: record.quantity,
            average_purchase_price: record.average_purchase_price,
            current_price,
            investment,
            current_value,
            gain_loss,
            gain_loss_pct: gain_loss / investment * 100.0,
        }
    }

    /// Aggregate the ledger against a price map.
    pub fn summary(&self, prices: &HashMap<String, f64>) -> PortfolioSummary {
        let mut total_investment = 0.0;
        let mut priced_investment = 0.0;
        let mut current_value = 0.0;
        let mut positions = Vec::new();
        let mut missing_prices = Vec::new();

        for record in self.holdings.values() {
            let investment = record.quantity * record.average_purchase_price;
            total_investment += investment;

            match prices.get(&record.ticker) {
                Some(&price) => {
                    let view = Self::view(record, price);
                    priced_investment += view.investment;
                    current_value += view.current_value;
                    positions.push(view);
                }
                None => missing_prices.push(record.ticker.clone()),
            }
        }

        let total_gain_loss = current_value - priced_investment;
        let gain_loss_pct = if priced_investment > 0.0 {
            total_gain_loss / priced_investment * 100.0
        } else {
            0.0
        };

        PortfolioSummary {
            total_investment,
            current_value,
            total_gain_loss,
            gain_loss_pct,
            holding_count: self.holdings.len(),
            positions,
            missing_prices,
        }
    }

    /// Percentage of current value per priced holding; sums to 100 when
    /// anything is priced.
    pub fn allocation(&self, prices: &HashMap<String, f64>) -> Vec<(String, f64)> {
        let summary = self.summary(prices);
        if summary.current_value <= 0.0 {
            return Vec::new();
        }
        summary
            .positions
            .iter()
            .map(|p| {
                (
                    p.ticker.clone(),
                    p.current_value / summary.current_value * 100.0,
                )
            })
            .collect()
    }

    /// Best and worst priced holdings by percentage gain. Ties resolve in
    /// ticker lexical order so the result is deterministic.
    pub fn best_worst(
        &self,
        prices: &HashMap<String, f64>,
    ) -> Option<(PositionView, PositionView)> {
        let mut positions = self.summary(prices).positions;
        if positions.is_empty() {
            return None;
        }
        positions.sort_by(|a, b| {
            b.gain_loss_pct
                .partial_cmp(&a.gain_loss_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.ticker.cmp(&b.ticker))
        });
        let best = positions.first().cloned().unwrap();
        let worst = positions.last().cloned().unwrap();
        Some((best, worst))
    }

    /// Diversification snapshot of the priced holdings: value-weighted
    /// gain and how much of the book sits in the largest position.
    pub fn concentration(&self, prices: &HashMap<String, f64>) -> Option<ConcentrationReport> {
        let summary = self.summary(prices);
        if summary.current_value <= 0.0 {
            return None;
        }

        let weighted_gain_pct = summary
            .positions
            .iter()
            .map(|p| p.gain_loss_pct * p.current_value)
            .sum::<f64>()
            / summary.current_value;

        let largest = summary
            .positions
            .iter()
            .max_by(|a, b| {
                a.current_value
                    .partial_cmp(&b.current_value)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.ticker.cmp(&a.ticker))
            })?;
        let max_allocation_pct = largest.current_value / summary.current_value * 100.0;

        let risk = if max_allocation_pct > 40.0 {
            ConcentrationRisk::High
        } else if max_allocation_pct > 25.0 {
            ConcentrationRisk::Moderate
        } else {
            ConcentrationRisk::Low
        };

        Some(ConcentrationReport {
            weighted_gain_pct,
            max_allocation_pct,
            max_ticker: largest.ticker.clone(),
            risk,
        })
    }
}
