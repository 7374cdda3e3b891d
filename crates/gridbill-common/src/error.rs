//! Error types for the Gridbill tariff engine
//!
//! Provides a unified error type and domain-specific error variants

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type alias using GridbillError
pub type Result<T> = std::result::Result<T, GridbillError>;

/// Unified error type for Gridbill operations
#[derive(Debug, Error)]
pub enum GridbillError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Pricing errors
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    // Ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Tariff configuration errors
///
/// Fatal at setup or options update; never raised mid-operation once a
/// configuration has been accepted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("VAT percentage must be between 0 and 100, got {0}")]
    VatOutOfRange(Decimal),

    #[error("{field} must not be negative, got {value}")]
    NegativeRate { field: &'static str, value: Decimal },

    #[error("solar bonus is enabled but the annual kWh limit is zero")]
    SolarBonusWithoutLimit,

    #[error("duplicate source id: {0}")]
    DuplicateSource(String),

    #[error("source {source_id} of kind {kind} has no linked meter")]
    MissingMeter { source_id: String, kind: String },
}

/// Pricing calculation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PricingError {
    /// No base price is currently resolvable. Transient: the caller defers
    /// the pending delta instead of failing.
    #[error("base price unavailable")]
    PriceUnavailable,
}

/// Accumulation ledger errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("unknown meter field: {0}")]
    UnknownField(String),
}

impl From<serde_json::Error> for GridbillError {
    fn from(err: serde_json::Error) -> Self {
        GridbillError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_display() {
        let err = GridbillError::Config(ConfigError::VatOutOfRange(dec!(120)));
        assert!(err.to_string().contains("120"));
    }

    #[test]
    fn test_negative_rate_message() {
        let err = ConfigError::NegativeRate {
            field: "electricity_markup",
            value: dec!(-0.02),
        };
        assert!(err.to_string().contains("electricity_markup"));
        assert!(err.to_string().contains("-0.02"));
    }

    #[test]
    fn test_missing_meter_message() {
        let err = ConfigError::MissingMeter {
            source_id: "grid".into(),
            kind: "electricity_consumption".into(),
        };
        assert!(err.to_string().contains("grid"));
        assert!(err.to_string().contains("no linked meter"));
    }

    #[test]
    fn test_ledger_error_from() {
        let err: GridbillError = LedgerError::UnknownSource("sensor.missing".into()).into();
        assert!(matches!(err, GridbillError::Ledger(_)));
    }
}
