//! Tariff pricing engine
//!
//! Derives consumer-facing unit prices from raw base prices:
//!
//! ```text
//! consumption:  (base + markup + tax) * vat
//! production:   (base + production_markup) * bonuses, VAT optional
//! surplus:      (base - overage_rate), VAT optional
//! gas:          (base + gas_markup + gas_tax) * vat
//! ```
//!
//! All arithmetic is exact [`Decimal`] math. Rounding happens only when
//! accumulators are updated, never inside price derivation.

use gridbill_common::{PricingError, SourceKind};
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::TariffConfig;

/// Whether a unit price lands in the cost or the profit bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceClass {
    /// Price is zero or positive
    Cost,
    /// Price is strictly negative
    Profit,
}

impl PriceClass {
    pub fn of(price: Decimal) -> Self {
        if price >= Decimal::ZERO {
            PriceClass::Cost
        } else {
            PriceClass::Profit
        }
    }
}

/// A fully derived unit price for one energy flow
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPrice {
    /// Raw base price the derivation started from
    pub base: Decimal,
    /// Consumer-facing price per kWh or m3
    pub unit_price: Decimal,
    pub class: PriceClass,
}

/// Derives unit prices from a tariff configuration
///
/// The engine borrows the configuration, so it is rebuilt per operation and
/// a configuration swap never changes prices mid-derivation.
#[derive(Debug, Clone, Copy)]
pub struct PricingEngine<'a> {
    config: &'a TariffConfig,
}

impl<'a> PricingEngine<'a> {
    pub fn new(config: &'a TariffConfig) -> Self {
        Self { config }
    }

    /// Full consumption price: `(base + markup + tax) * vat`
    pub fn consumption_unit_price(&self, base: Decimal) -> Decimal {
        (base + self.config.electricity_markup + self.config.electricity_tax)
            * self.config.vat_factor()
    }

    /// Consumption price without the energy-tax portion: `(base + markup) * vat`
    ///
    /// Under netting the tax portion is settled against the credit register,
    /// so the charged price splits into this part plus a tax part.
    pub fn consumption_energy_unit_price(&self, base: Decimal) -> Decimal {
        (base + self.config.electricity_markup) * self.config.vat_factor()
    }

    /// VAT-inclusive energy tax per kWh: `tax * vat`
    pub fn consumption_tax_unit_price(&self) -> Decimal {
        self.config.electricity_tax * self.config.vat_factor()
    }

    /// Break-even production price before bonuses and VAT: `base + production_markup`
    pub fn production_break_even_price(&self, base: Decimal) -> Decimal {
        base + self.config.electricity_production_markup
    }

    /// Full production price for the break-even portion
    ///
    /// Bonuses are multiplicative on the break-even price. The negative-price
    /// bonus applies only while the base price itself is below zero.
    pub fn production_unit_price(&self, base: Decimal) -> Decimal {
        let mut price = self.production_break_even_price(base);
        price *= Decimal::ONE + self.config.production_bonus_percentage / Decimal::ONE_HUNDRED;
        if base < Decimal::ZERO {
            price *= Decimal::ONE
                + self.config.negative_price_production_bonus_percentage / Decimal::ONE_HUNDRED;
        }
        if self.config.production_price_include_vat {
            price *= self.config.vat_factor();
        }
        price
    }

    /// Price for production beyond break-even: `base - overage_rate`
    pub fn surplus_unit_price(&self, base: Decimal) -> Decimal {
        let mut price = base - self.config.overage_compensation_rate;
        if self.config.surplus_vat_enabled {
            price *= self.config.vat_factor();
        }
        price
    }

    /// Full gas price: `(base + gas_markup + gas_tax) * vat`
    pub fn gas_unit_price(&self, base: Decimal) -> Decimal {
        (base + self.config.gas_markup + self.config.gas_tax) * self.config.vat_factor()
    }

    /// Solar-bonus payout per kWh: `pct / 100 * (base + production_markup)`
    pub fn solar_bonus_unit_rate(&self, base: Decimal) -> Decimal {
        self.config.solar_bonus_percentage / Decimal::ONE_HUNDRED
            * self.production_break_even_price(base)
    }

    /// Derives the unit price for one flow, or fails while the base price
    /// is unavailable
    pub fn resolve_unit_price(
        &self,
        base: Option<Decimal>,
        kind: SourceKind,
        surplus: bool,
    ) -> Result<ResolvedPrice, PricingError> {
        let base = base.ok_or(PricingError::PriceUnavailable)?;
        let unit_price = match kind {
            SourceKind::ElectricityConsumption => self.consumption_unit_price(base),
            SourceKind::ElectricityProduction if surplus => self.surplus_unit_price(base),
            SourceKind::ElectricityProduction => self.production_unit_price(base),
            SourceKind::Gas => self.gas_unit_price(base),
        };
        debug!(%kind, %base, %unit_price, surplus, "resolved unit price");
        Ok(ResolvedPrice {
            base,
            unit_price,
            class: PriceClass::of(unit_price),
        })
    }

    /// Fixed electricity cost per day: `(connection + standing - rebate) * vat`
    pub fn electricity_daily_cost(&self) -> Decimal {
        (self.config.electricity_connection_fee_per_day
            + self.config.electricity_standing_charge_per_day
            - self.config.electricity_tax_rebate_per_day)
            * self.config.vat_factor()
    }

    /// Fixed gas cost per day: `(connection + standing) * vat`
    pub fn gas_daily_cost(&self) -> Decimal {
        (self.config.gas_connection_fee_per_day + self.config.gas_standing_charge_per_day)
            * self.config.vat_factor()
    }
}
