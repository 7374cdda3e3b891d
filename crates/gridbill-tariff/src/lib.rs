//! # Gridbill Tariff
//!
//! Tariff configuration and the pure pricing engine.
//!
//! ## Pricing Formulas
//!
//! ```text
//! consumption = (base + markup + tax) * (1 + vat/100)
//! production  = (base + production_markup) * bonuses [* (1 + vat/100)]
//! surplus     = (base - overage_rate)              [* (1 + vat/100)]
//! gas         = (base + gas_markup + gas_tax) * (1 + vat/100)
//! ```
//!
//! The engine is stateless: netting, break-even classification, and the
//! solar bonus cap live in `gridbill-ledger`, which feeds the engine
//! already-classified portions.

pub mod config;
pub mod contract_year;
pub mod presets;
pub mod pricing;

pub use config::TariffConfig;
pub use contract_year::{ContractYearTracker, YearWindow};
pub use pricing::engine::{PriceClass, PricingEngine, ResolvedPrice};
pub use pricing::resolver::PriceResolver;
