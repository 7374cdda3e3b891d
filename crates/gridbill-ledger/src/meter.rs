//! Per-source meter accumulators
//!
//! Each energy source tracks a monotonically increasing meter register. The
//! ledger works on deltas between readings, never on absolute register
//! values, so a meter swap only costs one re-baseline.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use gridbill_common::{LedgerError, SourceKind, ACCUMULATOR_PRECISION};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gridbill_tariff::PriceClass;

/// How a raw register value relates to the previous one
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeltaOutcome {
    /// First reading ever seen, establishes the baseline
    Baseline,
    /// Register went backwards, the meter was reset or replaced
    Reset { previous: Decimal },
    /// Register unchanged
    NoChange,
    /// Register advanced by this amount
    Delta(Decimal),
}

/// Addressable accumulator fields, used when callers restore or inspect
/// individual totals by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterField {
    TotalKwh,
    TotalCost,
    TotalProfit,
    KwhDuringCostTotal,
    KwhDuringProfitTotal,
}

impl FromStr for MeterField {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "total_kwh" => Ok(MeterField::TotalKwh),
            "total_cost" => Ok(MeterField::TotalCost),
            "total_profit" => Ok(MeterField::TotalProfit),
            "kwh_during_cost_total" => Ok(MeterField::KwhDuringCostTotal),
            "kwh_during_profit_total" => Ok(MeterField::KwhDuringProfitTotal),
            other => Err(LedgerError::UnknownField(other.to_owned())),
        }
    }
}

/// Accumulated totals for one source
///
/// All monetary and unit totals are rounded to [`ACCUMULATOR_PRECISION`]
/// decimals on every update so they stay stable across snapshot round trips.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeterState {
    pub last_reading: Option<Decimal>,
    pub last_reading_at: Option<DateTime<Utc>>,
    /// Total units (kWh or m3) since the last baseline or period reset
    pub total_kwh: Decimal,
    /// Money paid, in euro
    pub total_cost: Decimal,
    /// Money earned, in euro
    pub total_profit: Decimal,
    /// Units metered while the unit price was zero or positive
    pub kwh_during_cost_total: Decimal,
    /// Units metered while the unit price was negative
    pub kwh_during_profit_total: Decimal,
}

impl MeterState {
    /// Classifies a register value against the stored baseline, without
    /// mutating anything
    pub fn delta(&self, reading: Decimal) -> DeltaOutcome {
        match self.last_reading {
            None => DeltaOutcome::Baseline,
            Some(previous) if reading < previous => DeltaOutcome::Reset { previous },
            Some(previous) if reading == previous => DeltaOutcome::NoChange,
            Some(previous) => DeltaOutcome::Delta(reading - previous),
        }
    }

    /// Moves the baseline forward. Called only once a reading has been fully
    /// priced and accumulated, so a deferred reading leaves the baseline put.
    pub fn advance(&mut self, reading: Decimal, at: DateTime<Utc>) {
        self.last_reading = Some(reading);
        self.last_reading_at = Some(at);
    }

    /// Adds a priced delta to the unit accumulators
    pub fn add_units(&mut self, delta: Decimal, class: PriceClass) {
        self.total_kwh = round(self.total_kwh + delta);
        match class {
            PriceClass::Cost => {
                self.kwh_during_cost_total = round(self.kwh_during_cost_total + delta);
            }
            PriceClass::Profit => {
                self.kwh_during_profit_total = round(self.kwh_during_profit_total + delta);
            }
        }
    }

    /// Adds a signed euro amount to the cost or profit accumulator
    ///
    /// For consumption and gas a positive amount is money owed. For
    /// production a positive amount is money earned, and a negative
    /// amount (negative prices, overage below compensation rate) flips
    /// into the opposite bucket as an absolute value.
    pub fn add_euro(&mut self, amount: Decimal, kind: SourceKind) {
        let earns = kind == SourceKind::ElectricityProduction;
        let to_profit = if earns {
            amount >= Decimal::ZERO
        } else {
            amount < Decimal::ZERO
        };
        if to_profit {
            self.total_profit = round(self.total_profit + amount.abs());
        } else {
            self.total_cost = round(self.total_cost + amount.abs());
        }
    }

    /// Reads one accumulator by field
    pub fn get(&self, field: MeterField) -> Decimal {
        match field {
            MeterField::TotalKwh => self.total_kwh,
            MeterField::TotalCost => self.total_cost,
            MeterField::TotalProfit => self.total_profit,
            MeterField::KwhDuringCostTotal => self.kwh_during_cost_total,
            MeterField::KwhDuringProfitTotal => self.kwh_during_profit_total,
        }
    }

    /// Overwrites one accumulator, rounding like the update path does
    pub fn set(&mut self, field: MeterField, value: Decimal) {
        let value = round(value);
        match field {
            MeterField::TotalKwh => self.total_kwh = value,
            MeterField::TotalCost => self.total_cost = value,
            MeterField::TotalProfit => self.total_profit = value,
            MeterField::KwhDuringCostTotal => self.kwh_during_cost_total = value,
            MeterField::KwhDuringProfitTotal => self.kwh_during_profit_total = value,
        }
    }

    /// Clears the accumulators but keeps the baseline, used on contract
    /// anniversary resets
    pub fn reset_totals(&mut self) {
        self.total_kwh = Decimal::ZERO;
        self.total_cost = Decimal::ZERO;
        self.total_profit = Decimal::ZERO;
        self.kwh_during_cost_total = Decimal::ZERO;
        self.kwh_during_profit_total = Decimal::ZERO;
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
    fn test_first_reading_is_baseline() {
        let meter = MeterState::default();
        assert_eq!(meter.delta(dec!(1000)), DeltaOutcome::Baseline);
    }

    #[test]
    fn test_delta_outcomes() {
        let mut meter = MeterState::default();
        meter.advance(dec!(1000), Utc::now());
        assert_eq!(meter.delta(dec!(1002.5)), DeltaOutcome::Delta(dec!(2.5)));
        assert_eq!(meter.delta(dec!(1000)), DeltaOutcome::NoChange);
        assert_eq!(
            meter.delta(dec!(10)),
            DeltaOutcome::Reset {
                previous: dec!(1000)
            }
        );
    }

    #[test]
    fn test_units_split_by_price_class() {
        let mut meter = MeterState::default();
        meter.add_units(dec!(2), PriceClass::Cost);
        meter.add_units(dec!(3), PriceClass::Profit);
        assert_eq!(meter.total_kwh, dec!(5));
        assert_eq!(meter.kwh_during_cost_total, dec!(2));
        assert_eq!(meter.kwh_during_profit_total, dec!(3));
    }

    #[test]
    fn test_consumption_euro_buckets() {
        let mut meter = MeterState::default();
        meter.add_euro(dec!(1.50), SourceKind::ElectricityConsumption);
        meter.add_euro(dec!(-0.40), SourceKind::ElectricityConsumption);
        assert_eq!(meter.total_cost, dec!(1.50));
        assert_eq!(meter.total_profit, dec!(0.40));
    }

    #[test]
    fn test_production_euro_buckets_flip() {
        let mut meter = MeterState::default();
        meter.add_euro(dec!(1.50), SourceKind::ElectricityProduction);
        meter.add_euro(dec!(-0.40), SourceKind::ElectricityProduction);
        assert_eq!(meter.total_profit, dec!(1.50));
        assert_eq!(meter.total_cost, dec!(0.40));
    }

    #[test]
    fn test_accumulators_are_rounded() {
        let mut meter = MeterState::default();
        meter.add_euro(dec!(0.123456789123), SourceKind::Gas);
        assert_eq!(meter.total_cost, dec!(0.12345679));
    }

    #[test]
    fn test_field_access_round_trips() {
        let mut meter = MeterState::default();
        let field: MeterField = "total_cost".parse().unwrap();
        meter.set(field, dec!(12.3456789012));
        assert_eq!(meter.get(field), dec!(12.34567890));
        assert!("total_bananas".parse::<MeterField>().is_err());
    }

    #[test]
    fn test_reset_totals_keeps_baseline() {
        let mut meter = MeterState::default();
        meter.advance(dec!(1000), Utc::now());
        meter.add_units(dec!(5), PriceClass::Cost);
        meter.reset_totals();
        assert_eq!(meter.total_kwh, Decimal::ZERO);
        assert_eq!(meter.last_reading, Some(dec!(1000)));
    }
}
