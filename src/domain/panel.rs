//! Indexed price panel and the unified date timeline.
//!
//! Observations are grouped by date, then by instrument id. Both levels use
//! ordered maps so every traversal of the panel is deterministic.

use crate::domain::error::RotatorError;
use crate::domain::observation::PriceObservation;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

#[derive(Debug, Clone, PartialEq)]
pub struct PanelSummary {
    pub rows: usize,
    pub instruments: usize,
    pub dates: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct PricePanel {
    dates: Vec<NaiveDate>,
    prices: BTreeMap<NaiveDate, BTreeMap<String, f64>>,
    first_seen: BTreeMap<String, (NaiveDate, f64)>,
    rows: usize,
}

impl PricePanel {
    /// Builds a panel from unsorted observations.
    ///
    /// Rejects duplicate (date, instrument) pairs and negative or non-finite
    /// prices. An empty input yields an empty panel.
    pub fn from_observations(
        observations: impl IntoIterator<Item = PriceObservation>,
    ) -> Result<Self, RotatorError> {
        let mut prices: BTreeMap<NaiveDate, BTreeMap<String, f64>> = BTreeMap::new();
        let mut rows = 0usize;

        for obs in observations {
            if !obs.has_valid_price() {
                return Err(RotatorError::InvalidPrice {
                    date: obs.date,
                    instrument_id: obs.instrument_id,
                    price: obs.price,
                });
            }
            match prices.entry(obs.date).or_default().entry(obs.instrument_id) {
                Entry::Occupied(slot) => {
                    return Err(RotatorError::DuplicateObservation {
                        date: obs.date,
                        instrument_id: slot.key().clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(obs.price);
                }
            }
            rows += 1;
        }

        Ok(Self::from_index(prices, rows))
    }

    fn from_index(prices: BTreeMap<NaiveDate, BTreeMap<String, f64>>, rows: usize) -> Self {
        let mut first_seen = BTreeMap::new();
        for (date, day) in &prices {
            for (id, price) in day {
                first_seen.entry(id.clone()).or_insert((*date, *price));
            }
        }
        Self {
            dates: prices.keys().copied().collect(),
            prices,
            first_seen,
            rows,
        }
    }

    /// Restricts the panel to the inclusive range `[start, end]`.
    ///
    /// First-seen prices are recomputed inside the range, so cumulative
    /// returns restart from each instrument's first in-range observation.
    pub fn filter_range(&self, start: NaiveDate, end: NaiveDate) -> Self {
        if start > end {
            return Self::default();
        }
        let prices: BTreeMap<_, _> = self
            .prices
            .range(start..=end)
            .map(|(d, day)| (*d, day.clone()))
            .collect();
        let rows = prices.values().map(BTreeMap::len).sum();
        Self::from_index(prices, rows)
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Unique dates in ascending order.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// All instrument ids ever observed, ascending.
    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.first_seen.keys().map(String::as_str)
    }

    pub fn price(&self, date: NaiveDate, instrument_id: &str) -> Option<f64> {
        self.prices.get(&date)?.get(instrument_id).copied()
    }

    /// Prices observed on `date`, keyed by instrument id.
    pub fn prices_on(&self, date: NaiveDate) -> Option<&BTreeMap<String, f64>> {
        self.prices.get(&date)
    }

    /// The panel date immediately before `date`, if any.
    pub fn previous_date(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.prices.range(..date).next_back().map(|(d, _)| *d)
    }

    pub fn first_seen(&self, instrument_id: &str) -> Option<(NaiveDate, f64)> {
        self.first_seen.get(instrument_id).copied()
    }

    /// `price(date) / price(first_seen) - 1`.
    ///
    /// `None` when the instrument has no observation on `date` or has not been
    /// seen yet. An instrument that first traded at zero has an infinite
    /// return once it prices above zero, and no return while it stays at zero.
    pub fn cumulative_return(&self, date: NaiveDate, instrument_id: &str) -> Option<f64> {
        let (first_date, first_price) = self.first_seen(instrument_id)?;
        if first_date > date {
            return None;
        }
        let price = self.price(date, instrument_id)?;
        if first_price == 0.0 {
            return (price > 0.0).then_some(f64::INFINITY);
        }
        Some(price / first_price - 1.0)
    }

    pub fn summary(&self) -> PanelSummary {
        PanelSummary {
            rows: self.rows,
            instruments: self.first_seen.len(),
            dates: self.dates.len(),
            first_date: self.dates.first().copied(),
            last_date: self.dates.last().copied(),
        }
    }
}
