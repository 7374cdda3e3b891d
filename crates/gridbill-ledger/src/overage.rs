//! Break-even versus surplus classification
//!
//! Production up to what the household itself consumed earns the break-even
//! price; anything beyond that is surplus and settles at the overage
//! compensation price. The split rule is a seam, the default classifies by
//! running net consumption.

use rust_decimal::Decimal;

/// How a production delta divides across the two settlement prices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductionSplit {
    pub break_even_kwh: Decimal,
    pub surplus_kwh: Decimal,
}

impl ProductionSplit {
    pub fn all_break_even(delta: Decimal) -> Self {
        Self {
            break_even_kwh: delta,
            surplus_kwh: Decimal::ZERO,
        }
    }
}

/// Splits a production delta into break-even and surplus portions
pub trait BreakEvenPolicy: Send + Sync {
    /// `net_consumption_kwh` is total consumption minus total production
    /// across all electricity sources, before this delta is applied
    fn split(&self, production_delta: Decimal, net_consumption_kwh: Decimal) -> ProductionSplit;
}

/// Default policy: production offsets outstanding net consumption first,
/// the remainder is surplus
#[derive(Debug, Clone, Copy, Default)]
pub struct NetConsumptionPolicy;

impl BreakEvenPolicy for NetConsumptionPolicy {
    fn split(&self, production_delta: Decimal, net_consumption_kwh: Decimal) -> ProductionSplit {
        let headroom = net_consumption_kwh.max(Decimal::ZERO);
        let break_even = production_delta.min(headroom);
        ProductionSplit {
            break_even_kwh: break_even,
            surplus_kwh: production_delta - break_even,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_production_within_net_consumption() {
        let split = NetConsumptionPolicy.split(dec!(2), dec!(5));
        assert_eq!(split.break_even_kwh, dec!(2));
        assert_eq!(split.surplus_kwh, Decimal::ZERO);
    }

    #[test]
    fn test_production_straddles_break_even() {
        let split = NetConsumptionPolicy.split(dec!(5), dec!(2));
        assert_eq!(split.break_even_kwh, dec!(2));
        assert_eq!(split.surplus_kwh, dec!(3));
    }

    #[test]
    fn test_already_net_producer() {
        let split = NetConsumptionPolicy.split(dec!(3), dec!(-4));
        assert_eq!(split.break_even_kwh, Decimal::ZERO);
        assert_eq!(split.surplus_kwh, dec!(3));
    }
}
