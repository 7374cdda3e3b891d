//! Tariff configuration
//!
//! All price-setting values for one energy contract. A config is validated
//! at construction and again on every options update; the ledger swaps the
//! whole struct atomically so no partial update is ever observable.

use chrono::NaiveDate;
use gridbill_common::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Immutable tariff parameters for one contract
///
/// Per-unit rates are currency per kWh (or per m³ for gas), per-day rates
/// are currency per calendar day. The tax rebate is stored as a positive
/// magnitude and subtracted in the daily-cost formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffConfig {
    /// Supplier markup per consumed kWh
    pub electricity_markup: Decimal,
    /// Supplier markup per produced kWh, added on top of the base price
    pub electricity_production_markup: Decimal,
    /// Government energy tax per kWh (excluding VAT)
    pub electricity_tax: Decimal,
    /// Supplier markup per m³ of gas
    pub gas_markup: Decimal,
    /// Government gas tax per m³ (excluding VAT)
    pub gas_tax: Decimal,

    /// Grid operator connection fee per day (electricity)
    pub electricity_connection_fee_per_day: Decimal,
    /// Supplier standing charge per day (electricity)
    pub electricity_standing_charge_per_day: Decimal,
    /// Government tax rebate per day, subtracted from the daily total
    pub electricity_tax_rebate_per_day: Decimal,
    /// Grid operator connection fee per day (gas)
    pub gas_connection_fee_per_day: Decimal,
    /// Supplier standing charge per day (gas)
    pub gas_standing_charge_per_day: Decimal,

    /// VAT percentage, 0-100
    pub vat_percentage: Decimal,
    /// Apply VAT to the production price
    pub production_price_include_vat: bool,

    /// Offset energy tax on consumption against credit earned by production
    pub netting_enabled: bool,

    /// Compensate production beyond break-even at the overage rate
    pub overage_compensation_enabled: bool,
    /// Deduction per surplus kWh, replacing the production markup
    pub overage_compensation_rate: Decimal,
    /// Apply VAT to the surplus price
    pub surplus_vat_enabled: bool,

    /// Pay a daylight bonus on production up to the annual limit
    pub solar_bonus_enabled: bool,
    /// Bonus as a percentage of (base price + production markup)
    pub solar_bonus_percentage: Decimal,
    /// Annual production ceiling for the bonus, in kWh
    pub solar_bonus_annual_kwh_limit: Decimal,

    /// Multiplicative bonus on all production compensation, percent
    pub production_bonus_percentage: Decimal,
    /// Extra multiplicative bonus applied only while the base price is negative
    pub negative_price_production_bonus_percentage: Decimal,

    /// Contract start date anchoring the accounting year; calendar year when unset
    pub contract_start_date: Option<NaiveDate>,
    /// Zero all meter totals when a new contract year starts
    pub reset_on_contract_anniversary: bool,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            electricity_markup: dec!(0.02),
            electricity_production_markup: Decimal::ZERO,
            electricity_tax: dec!(0.1088),
            gas_markup: Decimal::ZERO,
            gas_tax: Decimal::ZERO,
            electricity_connection_fee_per_day: dec!(0.25),
            electricity_standing_charge_per_day: dec!(0.25),
            electricity_tax_rebate_per_day: dec!(0.25),
            gas_connection_fee_per_day: Decimal::ZERO,
            gas_standing_charge_per_day: Decimal::ZERO,
            vat_percentage: dec!(21),
            production_price_include_vat: true,
            netting_enabled: false,
            overage_compensation_enabled: false,
            overage_compensation_rate: Decimal::ZERO,
            surplus_vat_enabled: false,
            solar_bonus_enabled: false,
            solar_bonus_percentage: Decimal::ZERO,
            solar_bonus_annual_kwh_limit: dec!(7500),
            production_bonus_percentage: Decimal::ZERO,
            negative_price_production_bonus_percentage: Decimal::ZERO,
            contract_start_date: None,
            reset_on_contract_anniversary: false,
        }
    }
}

impl TariffConfig {
    /// Validate the configuration
    ///
    /// Called at construction and on every options update. Once a config has
    /// been accepted no pricing operation can fail on it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vat_percentage < Decimal::ZERO
            || self.vat_percentage > Decimal::from(gridbill_common::MAX_VAT_PERCENTAGE)
        {
            return Err(ConfigError::VatOutOfRange(self.vat_percentage));
        }

        let rates: [(&'static str, Decimal); 14] = [
            ("electricity_markup", self.electricity_markup),
            (
                "electricity_production_markup",
                self.electricity_production_markup,
            ),
            ("electricity_tax", self.electricity_tax),
            ("gas_markup", self.gas_markup),
            ("gas_tax", self.gas_tax),
            (
                "electricity_connection_fee_per_day",
                self.electricity_connection_fee_per_day,
            ),
            (
                "electricity_standing_charge_per_day",
                self.electricity_standing_charge_per_day,
            ),
            (
                "electricity_tax_rebate_per_day",
                self.electricity_tax_rebate_per_day,
            ),
            ("gas_connection_fee_per_day", self.gas_connection_fee_per_day),
            ("gas_standing_charge_per_day", self.gas_standing_charge_per_day),
            ("overage_compensation_rate", self.overage_compensation_rate),
            ("solar_bonus_percentage", self.solar_bonus_percentage),
            (
                "solar_bonus_annual_kwh_limit",
                self.solar_bonus_annual_kwh_limit,
            ),
            (
                "production_bonus_percentage",
                self.production_bonus_percentage,
            ),
        ];
        for (field, value) in rates {
            if value < Decimal::ZERO {
                return Err(ConfigError::NegativeRate { field, value });
            }
        }
        if self.negative_price_production_bonus_percentage < Decimal::ZERO {
            return Err(ConfigError::NegativeRate {
                field: "negative_price_production_bonus_percentage",
                value: self.negative_price_production_bonus_percentage,
            });
        }

        if self.solar_bonus_enabled && self.solar_bonus_annual_kwh_limit == Decimal::ZERO {
            return Err(ConfigError::SolarBonusWithoutLimit);
        }

        Ok(())
    }

    /// VAT multiplier, e.g. 1.21 for 21% VAT
    #[inline]
    pub fn vat_factor(&self) -> Decimal {
        Decimal::ONE + self.vat_percentage / dec!(100)
    }

    /// Set the VAT percentage
    pub fn with_vat(mut self, percentage: Decimal) -> Self {
        self.vat_percentage = percentage;
        self
    }

    /// Enable netting (saldering)
    pub fn with_netting(mut self) -> Self {
        self.netting_enabled = true;
        self
    }

    /// Enable overage compensation at the given rate
    pub fn with_overage_compensation(mut self, rate: Decimal) -> Self {
        self.overage_compensation_enabled = true;
        self.overage_compensation_rate = rate;
        self
    }

    /// Enable the solar bonus
    pub fn with_solar_bonus(mut self, percentage: Decimal, annual_kwh_limit: Decimal) -> Self {
        self.solar_bonus_enabled = true;
        self.solar_bonus_percentage = percentage;
        self.solar_bonus_annual_kwh_limit = annual_kwh_limit;
        self
    }

    /// Anchor the accounting year to a contract start date
    pub fn with_contract_start(mut self, date: NaiveDate) -> Self {
        self.contract_start_date = Some(date);
        self
    }
}
