//! Performance metrics and derived reporting series.

use super::engine::SimulationResult;
use super::panel::PricePanel;
use super::trade::{TradeAction, ValuationSnapshot};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Crypto markets trade every calendar day.
const PERIODS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub buys: usize,
    pub sells: usize,
    pub delisted_sells: usize,
    pub fees_paid: f64,
    pub delisting_losses: f64,
}

impl Metrics {
    pub fn compute(result: &SimulationResult, initial_capital: f64) -> Self {
        let snapshots = result.valuations.as_slice();

        let final_value = snapshots
            .last()
            .map(|s| s.portfolio_value)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_value - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = snapshots.len() as f64 / PERIODS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 && total_return.is_finite() {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(snapshots);
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(snapshots);

        let buys = result
            .trades
            .iter()
            .filter(|t| t.action == TradeAction::Buy)
            .count();

        Metrics {
            final_value,
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            buys,
            sells: result.trades.len() - buys,
            delisted_sells: result.delisted_sells,
            fees_paid: result.fees_paid,
            delisting_losses: result.delisting_losses,
        }
    }
}

fn compute_drawdown(snapshots: &[ValuationSnapshot]) -> (f64, usize) {
    let Some(first) = snapshots.first() else {
        return (0.0, 0);
    };

    let mut peak = first.portfolio_value;
    let mut max_dd = 0.0_f64;
    let mut duration = 0usize;
    let mut max_duration = 0usize;

    for point in snapshots {
        if point.portfolio_value >= peak {
            peak = point.portfolio_value;
            duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.portfolio_value) / peak);
            duration += 1;
            max_duration = max_duration.max(duration);
        }
    }

    (max_dd, max_duration)
}

fn compute_risk_adjusted(snapshots: &[ValuationSnapshot]) -> (f64, f64) {
    if snapshots.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = snapshots
        .windows(2)
        .map(|w| {
            let prev = w[0].portfolio_value;
            if prev > 0.0 {
                (w[1].portfolio_value - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let stddev = (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();

    let sharpe = if stddev > 0.0 {
        mean / stddev * PERIODS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside = (returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r.powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    let sortino = if downside > 0.0 {
        mean / downside * PERIODS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}

/// Exponential moving average seeded with the first value,
/// `alpha = 2 / (span + 1)`.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            Some(p) => alpha * v + (1.0 - alpha) * p,
            None => v,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// Buy-and-hold value of `instrument_id` over the dates it is observed:
/// `initial_capital * (1 + cumulative_return)`. Dates with an infinite
/// return are skipped.
pub fn benchmark_curve(
    panel: &PricePanel,
    instrument_id: &str,
    initial_capital: f64,
) -> Vec<ValuationSnapshot> {
    panel
        .dates()
        .iter()
        .filter_map(|&date| {
            panel
                .cumulative_return(date, instrument_id)
                .filter(|r| r.is_finite())
                .map(|r| ValuationSnapshot {
                    date,
                    portfolio_value: initial_capital * (1.0 + r),
                })
        })
        .collect()
}

/// One row of the smoothed and benchmark series written beside the
/// valuation log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurvePoint {
    pub date: NaiveDate,
    pub portfolio_value: f64,
    pub ema: f64,
    /// Empty when no benchmark is configured or it is unpriced on `date`.
    pub benchmark: Option<f64>,
}

/// Aligns the EMA of the valuation series and the optional benchmark curve
/// on the valuation dates.
pub fn report_curves(
    result: &SimulationResult,
    panel: &PricePanel,
    benchmark: Option<&str>,
    ema_span: usize,
    initial_capital: f64,
) -> Vec<CurvePoint> {
    let smoothed = ema(&result.valuations.values(), ema_span);
    let bench: BTreeMap<NaiveDate, f64> = benchmark
        .map(|id| {
            benchmark_curve(panel, id, initial_capital)
                .into_iter()
                .map(|s| (s.date, s.portfolio_value))
                .collect()
        })
        .unwrap_or_default();

    result
        .valuations
        .iter()
        .zip(smoothed)
        .map(|(snapshot, smoothed)| CurvePoint {
            date: snapshot.date,
            portfolio_value: snapshot.portfolio_value,
            ema: smoothed,
            benchmark: bench.get(&snapshot.date).copied(),
        })
        .collect()
}
