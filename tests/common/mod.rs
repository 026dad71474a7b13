#![allow(dead_code)]

use chrono::NaiveDate;
use rotator::domain::engine::{RotationConfig, SimulationResult};
use rotator::domain::error::RotatorError;
pub use rotator::domain::observation::PriceObservation;
use rotator::domain::panel::PricePanel;
use rotator::domain::trade::Trade;
use rotator::ports::data_port::PriceSource;
use std::collections::BTreeMap;

pub struct MockPriceSource {
    pub observations: Vec<PriceObservation>,
    pub error: Option<String>,
}

impl MockPriceSource {
    pub fn new(observations: Vec<PriceObservation>) -> Self {
        Self {
            observations,
            error: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            observations: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl PriceSource for MockPriceSource {
    fn fetch_observations(&self) -> Result<Vec<PriceObservation>, RotatorError> {
        if let Some(reason) = &self.error {
            return Err(RotatorError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self.observations.clone())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Day `n` of January 2021.
pub fn day(n: u32) -> NaiveDate {
    date(2021, 1, n)
}

pub fn obs(n: u32, id: &str, price: f64) -> PriceObservation {
    PriceObservation::new(day(n), id, price)
}

pub fn make_panel(rows: &[(u32, &str, f64)]) -> PricePanel {
    PricePanel::from_observations(rows.iter().map(|&(n, id, p)| obs(n, id, p))).unwrap()
}

pub fn config_with_top_n(top_n: usize) -> RotationConfig {
    RotationConfig {
        top_n,
        ..RotationConfig::default()
    }
}

/// Cash and holdings after replaying every trade up to and including `date`.
pub struct Replay {
    pub cash: f64,
    pub holdings: BTreeMap<String, f64>,
}

/// Replays the trade log from scratch, calling `on_trade(before, after, trade)`
/// for each trade and `on_date(date, state)` once a date's trades are applied.
pub fn replay(
    initial_capital: f64,
    result: &SimulationResult,
    mut on_trade: impl FnMut(f64, f64, &Trade),
    mut on_date: impl FnMut(NaiveDate, &Replay),
) -> Replay {
    let mut state = Replay {
        cash: initial_capital,
        holdings: BTreeMap::new(),
    };
    let trades = result.trades.as_slice();
    let mut i = 0;
    for snapshot in result.valuations.iter() {
        while i < trades.len() && trades[i].date == snapshot.date {
            let trade = &trades[i];
            let before = state.cash;
            state.cash += trade.cash_flow();
            match trade.action {
                rotator::domain::trade::TradeAction::Sell => {
                    state.holdings.remove(&trade.instrument_id);
                }
                rotator::domain::trade::TradeAction::Buy => {
                    *state.holdings.entry(trade.instrument_id.clone()).or_default() +=
                        trade.units;
                }
            }
            on_trade(before, state.cash, trade);
            i += 1;
        }
        on_date(snapshot.date, &state);
    }
    assert_eq!(i, trades.len(), "trades dated outside the valuation timeline");
    state
}
