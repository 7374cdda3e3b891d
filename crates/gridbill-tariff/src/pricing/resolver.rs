//! Base-price composition
//!
//! A source may track several price components (for instance a dynamic market
//! price plus a grid surcharge feed). The base price fed to the pricing
//! engine is their sum, and is unavailable while any component is missing.

use rust_decimal::Decimal;

/// Sums price components into a single base price
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceResolver;

impl PriceResolver {
    /// Returns `None` when there are no components or any component is missing
    pub fn resolve(components: &[Option<Decimal>]) -> Option<Decimal> {
        if components.is_empty() {
            return None;
        }
        components.iter().copied().sum::<Option<Decimal>>()
    }
}
