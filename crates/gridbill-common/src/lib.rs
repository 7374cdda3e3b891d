//! # Gridbill Common
//!
//! Shared types, errors, and constants for the Gridbill tariff engine.
//!
//! ## Core Types
//!
//! - [`SourceKind`]: electricity consumption, electricity production, or gas
//! - [`SourceDescriptor`]: a tracked source with its linked meter and price components
//! - [`GridbillError`]: unified error type with domain-specific variants

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ConfigError, GridbillError, LedgerError, PricingError, Result};
pub use types::source::{EntityId, SourceDescriptor, SourceId, SourceKind};

/// Gridbill version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decimal places kept on every accumulator after a mutation.
///
/// Matches the precision the host platform stores for sensor state, so a
/// persisted snapshot restores bit-for-bit.
pub const ACCUMULATOR_PRECISION: u32 = 8;

/// Maximum VAT percentage accepted by configuration validation
pub const MAX_VAT_PERCENTAGE: u32 = 100;
