//! Configuration access port trait.

use crate::domain::error::RotatorError;
use chrono::NaiveDate;
use std::str::FromStr;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    /// Parses `key` as a `YYYY-MM-DD` date.
    fn get_date(&self, section: &str, key: &str) -> Result<Option<NaiveDate>, RotatorError> {
        match self.get_string(section, key) {
            Some(raw) if !raw.trim().is_empty() => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map(Some)
                .map_err(|_| RotatorError::ConfigInvalid {
                    section: section.to_string(),
                    key: key.to_string(),
                    reason: "invalid date format (expected YYYY-MM-DD)".to_string(),
                }),
            _ => Ok(None),
        }
    }
}

/// Parses `key` as `T`. Absent or blank keys are `Ok(None)`; a value that
/// does not parse is `ConfigInvalid`.
pub fn get_parsed<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, RotatorError> {
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| RotatorError::ConfigInvalid {
                    section: section.to_string(),
                    key: key.to_string(),
                    reason: format!("cannot parse '{}'", raw.trim()),
                })
        }
        _ => Ok(None),
    }
}
