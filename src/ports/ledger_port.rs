//! Ledger persistence port trait.
//!
//! The core owns the in-memory record set and its mutation rules; the
//! store only round-trips records.

use crate::domain::error::StockscopeError;
use crate::domain::ledger::PortfolioLedger;

pub trait LedgerStorePort {
    /// Load the stored ledger. A store that does not exist yet loads as an
    /// empty ledger.
    fn load(&self) -> Result<PortfolioLedger, StockscopeError>;

    fn save(&self, ledger: &PortfolioLedger) -> Result<(), StockscopeError>;
}
