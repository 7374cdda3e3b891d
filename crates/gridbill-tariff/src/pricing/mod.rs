//! Unit-price derivation
//!
//! Raw market prices carry no markup, tax or VAT. These modules turn a raw
//! base price into the consumer-facing unit price for each energy flow.

pub mod engine;
pub mod resolver;

pub use engine::{PriceClass, PricingEngine, ResolvedPrice};
pub use resolver::PriceResolver;
