//! Daily top-N rotation engine.
//!
//! Each date after the first is processed in two phases: every holding is
//! liquidated, then the cash is split evenly across the new top-N momentum
//! picks. One valuation snapshot is recorded per date.

use crate::domain::error::RotatorError;
use crate::domain::ledger::PortfolioLedger;
use crate::domain::panel::PricePanel;
use crate::domain::ranking::{MomentumRanker, RankedInstrument};
use crate::domain::trade::{Trade, TradeAction, TradeLog, ValuationLog};
use chrono::NaiveDate;
use std::borrow::Cow;
use tracing::{debug, info, warn};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 5000.0;
pub const DEFAULT_TOP_N: usize = 40;
pub const DEFAULT_FEE_RATE: f64 = 0.0005;
pub const DEFAULT_DELISTING_PENALTY: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct RotationConfig {
    pub initial_capital: f64,
    pub top_n: usize,
    pub fee_rate: f64,
    pub delisting_penalty: f64,
    /// Inclusive `[start, end]` filter applied before simulation.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        RotationConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            top_n: DEFAULT_TOP_N,
            fee_rate: DEFAULT_FEE_RATE,
            delisting_penalty: DEFAULT_DELISTING_PENALTY,
            date_range: None,
        }
    }
}

impl RotationConfig {
    pub fn validate(&self) -> Result<(), RotatorError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(invalid("initial_capital", "initial_capital must be positive"));
        }
        if !(self.fee_rate >= 0.0 && self.fee_rate < 1.0) {
            return Err(invalid("fee_rate", "fee_rate must be in [0, 1)"));
        }
        if !(self.delisting_penalty >= 0.0 && self.delisting_penalty <= 1.0) {
            return Err(invalid(
                "delisting_penalty",
                "delisting_penalty must be in [0, 1]",
            ));
        }
        if self.delisting_penalty < self.fee_rate {
            return Err(invalid(
                "delisting_penalty",
                "delisting_penalty must not be below fee_rate",
            ));
        }
        if let Some((start, end)) = self.date_range {
            if start > end {
                return Err(invalid("start_date", "start_date must not be after end_date"));
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> RotatorError {
    RotatorError::ConfigInvalid {
        section: "rotation".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub trades: TradeLog,
    pub valuations: ValuationLog,
    pub final_cash: f64,
    /// Holdings after the last date, ascending by instrument id.
    pub final_holdings: Vec<(String, f64)>,
    pub fees_paid: f64,
    pub delisting_losses: f64,
    pub delisted_sells: usize,
}

impl SimulationResult {
    fn empty(initial_capital: f64) -> Self {
        SimulationResult {
            trades: TradeLog::new(),
            valuations: ValuationLog::new(),
            final_cash: initial_capital,
            final_holdings: Vec::new(),
            fees_paid: 0.0,
            delisting_losses: 0.0,
            delisted_sells: 0,
        }
    }

    pub fn final_value(&self) -> Option<f64> {
        self.valuations.last().map(|s| s.portfolio_value)
    }
}

/// Mutable state of a single run. Created fresh by every call to
/// [`RebalancingEngine::run`].
struct RunState {
    ledger: PortfolioLedger,
    result: SimulationResult,
}

#[derive(Debug, Clone)]
pub struct RebalancingEngine {
    config: RotationConfig,
    ranker: MomentumRanker,
}

impl RebalancingEngine {
    pub fn new(config: RotationConfig) -> Result<Self, RotatorError> {
        config.validate()?;
        Ok(Self {
            config,
            ranker: MomentumRanker,
        })
    }

    /// Replays the panel date by date.
    ///
    /// An empty panel (or an empty date range) yields an empty result.
    pub fn run(&self, panel: &PricePanel) -> Result<SimulationResult, RotatorError> {
        let panel: Cow<'_, PricePanel> = match self.config.date_range {
            Some((start, end)) => Cow::Owned(panel.filter_range(start, end)),
            None => Cow::Borrowed(panel),
        };

        if panel.is_empty() {
            warn!("price panel has no dates in range; nothing to simulate");
            return Ok(SimulationResult::empty(self.config.initial_capital));
        }

        let rankings = self.ranker.rank_all(&panel);
        info!(
            dates = rankings.len(),
            instruments = panel.summary().instruments,
            top_n = self.config.top_n,
            "starting rotation"
        );

        let mut state = RunState {
            ledger: PortfolioLedger::new(self.config.initial_capital),
            result: SimulationResult::empty(self.config.initial_capital),
        };

        for (date, ranking) in &rankings {
            let date = *date;
            match panel.previous_date(date) {
                None => {
                    state
                        .result
                        .valuations
                        .record(date, self.config.initial_capital);
                }
                Some(prev) => {
                    self.liquidate(&mut state, &panel, date, prev)?;
                    self.acquire(&mut state, date, ranking)?;
                    let value = self.mark_to_market(&state.ledger, &panel, date, prev)?;
                    debug!(
                        %date,
                        value,
                        cash = state.ledger.cash(),
                        positions = state.ledger.position_count(),
                        "rebalanced"
                    );
                    state.result.valuations.record(date, value);
                }
            }
        }

        let RunState { ledger, mut result } = state;
        result.final_cash = ledger.cash();
        result.final_holdings = ledger
            .holdings()
            .map(|(id, units)| (id.to_string(), units))
            .collect();

        info!(
            trades = result.trades.len(),
            final_value = result.final_value().unwrap_or(self.config.initial_capital),
            "rotation finished"
        );
        Ok(result)
    }

    fn liquidate(
        &self,
        state: &mut RunState,
        panel: &PricePanel,
        date: NaiveDate,
        prev: NaiveDate,
    ) -> Result<(), RotatorError> {
        let fee = self.config.fee_rate;
        let held: Vec<(String, f64)> = state
            .ledger
            .holdings()
            .filter(|(_, units)| *units > 0.0)
            .map(|(id, units)| (id.to_string(), units))
            .collect();

        for (id, units) in held {
            let sell_price = match panel.price(date, &id) {
                Some(price) => {
                    state.result.fees_paid += units * price * fee;
                    price * (1.0 - fee)
                }
                None => {
                    let last = panel.price(prev, &id).ok_or_else(|| RotatorError::MissingPrice {
                        instrument_id: id.clone(),
                        date,
                    })?;
                    let penalty = self.config.delisting_penalty;
                    debug!(%date, instrument = %id, last, "instrument vanished; applying delisting haircut");
                    state.result.fees_paid += units * last * fee;
                    state.result.delisting_losses += units * last * (1.0 - penalty);
                    state.result.delisted_sells += 1;
                    last * (penalty - fee)
                }
            };

            let trade = Trade::new(date, &id, TradeAction::Sell, sell_price, units);
            state.ledger.credit(trade.value)?;
            state.result.trades.record(trade);
        }

        state.ledger.clear_all_holdings();
        Ok(())
    }

    fn acquire(
        &self,
        state: &mut RunState,
        date: NaiveDate,
        ranking: &[RankedInstrument],
    ) -> Result<(), RotatorError> {
        let top_n = self.config.top_n;
        if top_n == 0 {
            return Ok(());
        }

        let fee = self.config.fee_rate;
        // Slots stay sized by top_n even when fewer instruments rank; the
        // unfilled share is kept as cash.
        let capital_per_instrument = state.ledger.cash() / top_n as f64;

        for pick in ranking.iter().take(top_n) {
            if pick.price <= 0.0 {
                debug!(%date, instrument = %pick.instrument_id, "skipping zero-priced pick");
                continue;
            }
            // Rounding in `cash / top_n` can leave the last slot a hair
            // short of its share.
            let spend = capital_per_instrument.min(state.ledger.cash());
            if spend <= 0.0 {
                break;
            }
            let buy_price = pick.price * (1.0 + fee);
            let units = spend / buy_price;
            let trade = Trade::new(date, &pick.instrument_id, TradeAction::Buy, buy_price, units);

            state.ledger.debit(trade.value)?;
            state.ledger.add_units(&pick.instrument_id, units)?;
            state.result.fees_paid += units * pick.price * fee;
            state.result.trades.record(trade);
        }
        Ok(())
    }

    /// `cash + Σ units * price(date)`, falling back to the previous date's
    /// price for any holding missing today.
    fn mark_to_market(
        &self,
        ledger: &PortfolioLedger,
        panel: &PricePanel,
        date: NaiveDate,
        prev: NaiveDate,
    ) -> Result<f64, RotatorError> {
        let mut value = ledger.cash();
        for (id, units) in ledger.holdings() {
            let price = panel
                .price(date, id)
                .or_else(|| panel.price(prev, id))
                .ok_or_else(|| RotatorError::MissingPrice {
                    instrument_id: id.to_string(),
                    date,
                })?;
            value += units * price;
        }
        Ok(value)
    }
}
