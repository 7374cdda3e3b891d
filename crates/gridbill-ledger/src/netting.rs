//! Tax-credit register for net metering
//!
//! Energy tax paid on consumption can be reclaimed against energy fed back
//! into the grid. The register accrues euro credit from break-even
//! production and is drawn down by the tax liability of later consumption.
//! It never goes below zero, and unclaimed liability is simply charged.

use gridbill_common::ACCUMULATOR_PRECISION;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NettingState {
    /// Available tax credit in euro, VAT inclusive
    credit_euro: Decimal,
    /// Lifetime credit accrued, for reporting
    accrued_total: Decimal,
    /// Lifetime credit consumed, for reporting
    drawn_total: Decimal,
}

impl NettingState {
    pub fn credit(&self) -> Decimal {
        self.credit_euro
    }

    pub fn accrued_total(&self) -> Decimal {
        self.accrued_total
    }

    pub fn drawn_total(&self) -> Decimal {
        self.drawn_total
    }

    /// Adds credit earned by break-even production
    pub fn accrue(&mut self, amount: Decimal) {
        if amount <= Decimal::ZERO {
            return;
        }
        self.credit_euro = round(self.credit_euro + amount);
        self.accrued_total = round(self.accrued_total + amount);
    }

    /// Settles a consumption tax liability against the register and returns
    /// the part actually covered by credit
    pub fn draw(&mut self, liability: Decimal) -> Decimal {
        if liability <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let drawn = liability.min(self.credit_euro);
        self.credit_euro = round(self.credit_euro - drawn);
        self.drawn_total = round(self.drawn_total + drawn);
        drawn
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn round(value: Decimal) -> Decimal {
    value.round_dp(ACCUMULATOR_PRECISION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_draw_is_capped_by_credit() {
        let mut netting = NettingState::default();
        netting.accrue(dec!(0.50));
        assert_eq!(netting.draw(dec!(0.30)), dec!(0.30));
        assert_eq!(netting.draw(dec!(0.30)), dec!(0.20));
        assert_eq!(netting.credit(), Decimal::ZERO);
    }

    #[test]
    fn test_draw_from_empty_register() {
        let mut netting = NettingState::default();
        assert_eq!(netting.draw(dec!(1.00)), Decimal::ZERO);
        assert_eq!(netting.credit(), Decimal::ZERO);
    }

    #[test]
    fn test_non_positive_amounts_are_ignored() {
        let mut netting = NettingState::default();
        netting.accrue(dec!(-1));
        netting.accrue(Decimal::ZERO);
        assert_eq!(netting.credit(), Decimal::ZERO);
        assert_eq!(netting.draw(dec!(-1)), Decimal::ZERO);
    }

    #[test]
    fn test_lifetime_totals() {
        let mut netting = NettingState::default();
        netting.accrue(dec!(0.50));
        netting.draw(dec!(0.20));
        netting.accrue(dec!(0.10));
        assert_eq!(netting.accrued_total(), dec!(0.60));
        assert_eq!(netting.drawn_total(), dec!(0.20));
        assert_eq!(netting.credit(), dec!(0.40));
    }
}
