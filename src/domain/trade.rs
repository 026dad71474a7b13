//! Trade and valuation records and their append-only logs.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "Buy"),
            TradeAction::Sell => write!(f, "Sell"),
        }
    }
}

/// One executed trade. `price` already includes fees (and the delisting
/// haircut where one applied); `value = units * price`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub instrument_id: String,
    pub action: TradeAction,
    pub price: f64,
    pub units: f64,
    pub value: f64,
}

impl Trade {
    pub fn new(
        date: NaiveDate,
        instrument_id: &str,
        action: TradeAction,
        price: f64,
        units: f64,
    ) -> Self {
        Self {
            date,
            instrument_id: instrument_id.to_string(),
            action,
            price,
            units,
            value: units * price,
        }
    }

    /// Signed effect on cash: positive for sells, negative for buys.
    pub fn cash_flow(&self) -> f64 {
        match self.action {
            TradeAction::Buy => -self.value,
            TradeAction::Sell => self.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationSnapshot {
    pub date: NaiveDate,
    pub portfolio_value: f64,
}

/// Append-only, ordered trade ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeLog {
    trades: Vec<Trade>,
}

impl TradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn as_slice(&self) -> &[Trade] {
        &self.trades
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn on(&self, date: NaiveDate) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(move |t| t.date == date)
    }
}

/// Append-only valuation series, one snapshot per simulated date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuationLog {
    snapshots: Vec<ValuationSnapshot>,
}

impl ValuationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, date: NaiveDate, portfolio_value: f64) {
        self.snapshots.push(ValuationSnapshot {
            date,
            portfolio_value,
        });
    }

    pub fn as_slice(&self) -> &[ValuationSnapshot] {
        &self.snapshots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValuationSnapshot> {
        self.snapshots.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn last(&self) -> Option<&ValuationSnapshot> {
        self.snapshots.last()
    }

    pub fn values(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.portfolio_value).collect()
    }
}
