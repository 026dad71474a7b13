//! Single (date, instrument, price) fact supplied by the data source.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub instrument_id: String,
    pub price: f64,
}

impl PriceObservation {
    pub fn new(date: NaiveDate, instrument_id: impl Into<String>, price: f64) -> Self {
        Self {
            date,
            instrument_id: instrument_id.into(),
            price,
        }
    }

    /// Prices must be finite and non-negative.
    pub fn has_valid_price(&self) -> bool {
        self.price.is_finite() && self.price >= 0.0
    }
}
