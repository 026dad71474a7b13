//! Configuration validation.
//!
//! Validates the `[rotation]` section before any data is loaded.

use crate::domain::error::RotatorError;
use crate::ports::config_port::{get_parsed, ConfigPort};

pub const SECTION: &str = "rotation";

pub fn validate_rotation_config(config: &dyn ConfigPort) -> Result<(), RotatorError> {
    validate_initial_capital(config)?;
    validate_top_n(config)?;
    validate_fee_rate(config)?;
    validate_delisting_penalty(config)?;
    validate_dates(config)?;
    validate_ema_span(config)?;
    Ok(())
}

fn invalid(key: &str, reason: &str) -> RotatorError {
    RotatorError::ConfigInvalid {
        section: SECTION.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), RotatorError> {
    if let Some(value) = get_parsed::<f64>(config, SECTION, "initial_capital")? {
        if !(value.is_finite() && value > 0.0) {
            return Err(invalid("initial_capital", "initial_capital must be positive"));
        }
    }
    Ok(())
}

fn validate_top_n(config: &dyn ConfigPort) -> Result<(), RotatorError> {
    if let Some(value) = get_parsed::<i64>(config, SECTION, "top_n")? {
        if value < 0 {
            return Err(invalid("top_n", "top_n must be non-negative"));
        }
    }
    Ok(())
}

fn validate_fee_rate(config: &dyn ConfigPort) -> Result<(), RotatorError> {
    if let Some(value) = get_parsed::<f64>(config, SECTION, "fee_rate")? {
        if !(0.0..1.0).contains(&value) {
            return Err(invalid("fee_rate", "fee_rate must be in [0, 1)"));
        }
    }
    Ok(())
}

fn validate_delisting_penalty(config: &dyn ConfigPort) -> Result<(), RotatorError> {
    if let Some(value) = get_parsed::<f64>(config, SECTION, "delisting_penalty")? {
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(
                "delisting_penalty",
                "delisting_penalty must be in [0, 1]",
            ));
        }
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), RotatorError> {
    let start = config.get_date(SECTION, "start_date")?;
    let end = config.get_date(SECTION, "end_date")?;
    match (start, end) {
        (Some(start), Some(end)) if start > end => {
            Err(invalid("start_date", "start_date must not be after end_date"))
        }
        (Some(_), None) => Err(RotatorError::ConfigMissing {
            section: SECTION.to_string(),
            key: "end_date".to_string(),
        }),
        (None, Some(_)) => Err(RotatorError::ConfigMissing {
            section: SECTION.to_string(),
            key: "start_date".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_ema_span(config: &dyn ConfigPort) -> Result<(), RotatorError> {
    if let Some(value) = get_parsed::<i64>(config, SECTION, "ema_span")? {
        if value < 1 {
            return Err(invalid("ema_span", "ema_span must be at least 1"));
        }
    }
    Ok(())
}
