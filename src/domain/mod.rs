//! Core domain types and logic.

pub mod observation;
pub mod panel;
pub mod ranking;
pub mod ledger;
pub mod trade;
pub mod engine;
pub mod metrics;
pub mod config_validation;
pub mod error;
