//! Cash and unit holdings for one simulation run.

use crate::domain::error::LedgerError;
use std::collections::BTreeMap;

/// Relative slack allowed when a debit slightly exceeds cash through float
/// rounding of `cash / n * n`.
const DEBIT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioLedger {
    cash: f64,
    holdings: BTreeMap<String, f64>,
}

impl PortfolioLedger {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            holdings: BTreeMap::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn credit(&mut self, amount: f64) -> Result<(), LedgerError> {
        check_amount(amount)?;
        self.cash += amount;
        Ok(())
    }

    /// Debits `amount`. A rounding residue below zero is clamped to exactly
    /// zero; anything beyond the tolerance is an overdraft.
    pub fn debit(&mut self, amount: f64) -> Result<(), LedgerError> {
        check_amount(amount)?;
        if amount - self.cash > DEBIT_TOLERANCE * self.cash.abs().max(1.0) {
            return Err(LedgerError::Overdraft {
                amount,
                cash: self.cash,
            });
        }
        self.cash = (self.cash - amount).max(0.0);
        Ok(())
    }

    /// Sets the units held. Zero removes the entry.
    pub fn set_holding(&mut self, instrument_id: &str, units: f64) -> Result<(), LedgerError> {
        if !units.is_finite() || units < 0.0 {
            return Err(LedgerError::InvalidUnits {
                instrument_id: instrument_id.to_string(),
                units,
            });
        }
        if units == 0.0 {
            self.holdings.remove(instrument_id);
        } else {
            self.holdings.insert(instrument_id.to_string(), units);
        }
        Ok(())
    }

    pub fn add_units(&mut self, instrument_id: &str, units: f64) -> Result<(), LedgerError> {
        let total = self.units(instrument_id) + units;
        self.set_holding(instrument_id, total)
    }

    pub fn clear_all_holdings(&mut self) {
        self.holdings.clear();
    }

    pub fn units(&self, instrument_id: &str) -> f64 {
        self.holdings.get(instrument_id).copied().unwrap_or(0.0)
    }

    /// Holdings in ascending instrument id order.
    pub fn holdings(&self) -> impl Iterator<Item = (&str, f64)> {
        self.holdings.iter().map(|(id, &units)| (id.as_str(), units))
    }

    pub fn position_count(&self) -> usize {
        self.holdings.len()
    }
}

fn check_amount(amount: f64) -> Result<(), LedgerError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(LedgerError::InvalidAmount { amount });
    }
    Ok(())
}
