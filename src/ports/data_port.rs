//! Data-source port trait.

use crate::domain::error::RotatorError;
use crate::domain::observation::PriceObservation;

/// Supplies raw price observations, in any order.
///
/// `Ok(vec![])` means the source has no data; `Err` means the fetch itself
/// failed. Callers must not treat one as the other.
pub trait PriceSource {
    fn fetch_observations(&self) -> Result<Vec<PriceObservation>, RotatorError>;

    /// Human-readable origin for log lines.
    fn describe(&self) -> String {
        "price source".to_string()
    }
}
