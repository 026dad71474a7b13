//! Domain error types.

use chrono::NaiveDate;

/// Ledger invariant violations. Only the engine mutates a ledger, so any of
/// these points at an arithmetic bug rather than bad input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("amount must be a finite non-negative number, got {amount}")]
    InvalidAmount { amount: f64 },

    #[error("debit of {amount} exceeds available cash {cash}")]
    Overdraft { amount: f64, cash: f64 },

    #[error("holding for {instrument_id} must be finite and non-negative, got {units}")]
    InvalidUnits { instrument_id: String, units: f64 },
}

/// Top-level error type for rotator.
#[derive(Debug, thiserror::Error)]
pub enum RotatorError {
    #[error("input is missing required column '{column}'")]
    InputMissingColumn { column: String },

    #[error("malformed input at line {line}: {reason}")]
    InputMalformed { line: usize, reason: String },

    #[error("duplicate observation for {instrument_id} on {date}")]
    DuplicateObservation {
        date: NaiveDate,
        instrument_id: String,
    },

    #[error("invalid price {price} for {instrument_id} on {date}")]
    InvalidPrice {
        date: NaiveDate,
        instrument_id: String,
        price: f64,
    },

    #[error("price panel is empty")]
    EmptyPanel,

    #[error("no price for held instrument {instrument_id} on {date} or the previous date")]
    MissingPrice {
        instrument_id: String,
        date: NaiveDate,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RotatorError {
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            RotatorError::InputMissingColumn { .. }
                | RotatorError::InputMalformed { .. }
                | RotatorError::DuplicateObservation { .. }
                | RotatorError::InvalidPrice { .. }
                | RotatorError::EmptyPanel
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            RotatorError::ConfigParse { .. }
                | RotatorError::ConfigMissing { .. }
                | RotatorError::ConfigInvalid { .. }
        )
    }
}

impl From<&RotatorError> for std::process::ExitCode {
    fn from(err: &RotatorError) -> Self {
        let code: u8 = match err {
            RotatorError::Io(_) | RotatorError::DataSource { .. } => 1,
            RotatorError::ConfigParse { .. }
            | RotatorError::ConfigMissing { .. }
            | RotatorError::ConfigInvalid { .. } => 2,
            RotatorError::InputMissingColumn { .. }
            | RotatorError::InputMalformed { .. }
            | RotatorError::DuplicateObservation { .. }
            | RotatorError::InvalidPrice { .. }
            | RotatorError::EmptyPanel => 3,
            RotatorError::MissingPrice { .. } | RotatorError::Ledger(_) => 4,
        };
        std::process::ExitCode::from(code)
    }
}
