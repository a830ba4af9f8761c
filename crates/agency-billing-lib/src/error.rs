//! Error types for the billing engine.
//!
//! Every variant describes input or configuration that would misstate
//! revenue if it were coerced to a default, so callers get a structured
//! failure instead.

use crate::data_structures::{PricingTier, YearMonth};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BillingError {
    // ===================
    // Invalid input data
    // ===================
    #[error("Ticket {ticket_id} has negative hours: {hours}")]
    NegativeHours { ticket_id: String, hours: Decimal },

    #[error("Hours value is not a finite number: {value}")]
    NonFiniteHours { value: f64 },

    #[error("Hours value is negative: {value}")]
    NegativeHoursValue { value: f64 },

    #[error("Site {site_id} ends hosting on {end} before it starts on {start}")]
    InvalidHostingInterval {
        site_id: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("{kind} {id} has a negative amount: {amount}")]
    NegativeAmount {
        kind: &'static str,
        id: String,
        amount: Decimal,
    },

    #[error("{kind} {id} amount {amount} exceeds the supported maximum")]
    AmountOutOfRange {
        kind: &'static str,
        id: String,
        amount: Decimal,
    },

    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Invalid billing window: {reason}")]
    InvalidWindow { reason: String },

    // ===================
    // Configuration
    // ===================
    #[error("No hourly rate configured for tier {0}")]
    MissingRate(PricingTier),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Month {0} is outside the supported calendar range")]
    InvalidMonth(YearMonth),
}

pub type BillingResult<T> = std::result::Result<T, BillingError>;
