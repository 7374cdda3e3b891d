//! Supplier presets
//!
//! Ready-made tariff configurations for Dutch dynamic-contract suppliers,
//! based on published rates as of November 2025. Daily fees vary per grid
//! operator and are left at zero except the supplier standing charge.

use crate::config::TariffConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Government electricity tax per kWh, 2025 rate (excluding VAT)
const ELECTRICITY_TAX_2025: Decimal = dec!(0.1017);

fn base_preset() -> TariffConfig {
    TariffConfig {
        electricity_tax: ELECTRICITY_TAX_2025,
        electricity_connection_fee_per_day: Decimal::ZERO,
        electricity_tax_rebate_per_day: Decimal::ZERO,
        ..TariffConfig::default()
    }
}

/// ANWB Energie: symmetric markup, overage compensated at the markup rate
pub fn anwb_energie() -> TariffConfig {
    TariffConfig {
        electricity_markup: dec!(0.040),
        electricity_production_markup: dec!(0.040),
        electricity_standing_charge_per_day: dec!(0.2301),
        overage_compensation_enabled: true,
        overage_compensation_rate: dec!(0.040),
        ..base_preset()
    }
}

/// Tibber: symmetric markup, overage compensated at the markup rate
pub fn tibber() -> TariffConfig {
    TariffConfig {
        electricity_markup: dec!(0.0248),
        electricity_production_markup: dec!(0.0248),
        electricity_standing_charge_per_day: dec!(0.1970),
        overage_compensation_enabled: true,
        overage_compensation_rate: dec!(0.0248),
        ..base_preset()
    }
}

/// Zonneplan: €0.02 production surcharge plus a 10% bonus on top of it
pub fn zonneplan() -> TariffConfig {
    TariffConfig {
        electricity_markup: dec!(0.0200),
        electricity_production_markup: dec!(0.02),
        electricity_standing_charge_per_day: dec!(0.2055),
        production_bonus_percentage: dec!(10),
        ..base_preset()
    }
}

/// Frank Energie: 15% bonus on all production, no overage deduction
pub fn frank_energie() -> TariffConfig {
    TariffConfig {
        electricity_markup: dec!(0.0182),
        electricity_standing_charge_per_day: dec!(0.2301),
        production_bonus_percentage: dec!(15),
        ..base_preset()
    }
}

/// easyEnergy
pub fn easy_energy() -> TariffConfig {
    TariffConfig {
        electricity_markup: dec!(0.0218),
        electricity_production_markup: dec!(0.0218),
        electricity_standing_charge_per_day: dec!(0.2301),
        overage_compensation_enabled: true,
        overage_compensation_rate: dec!(0.0218),
        ..base_preset()
    }
}

/// Budget Energie
pub fn budget_energie() -> TariffConfig {
    TariffConfig {
        electricity_markup: dec!(0.017),
        electricity_production_markup: dec!(0.017),
        electricity_standing_charge_per_day: dec!(0.1973),
        overage_compensation_enabled: true,
        overage_compensation_rate: dec!(0.017),
        ..base_preset()
    }
}

/// Vandebron: overage deduction exceeds the markup
pub fn vandebron() -> TariffConfig {
    TariffConfig {
        electricity_markup: dec!(0.030),
        electricity_production_markup: dec!(0.030),
        electricity_standing_charge_per_day: dec!(0.2466),
        overage_compensation_enabled: true,
        overage_compensation_rate: dec!(0.060),
        ..base_preset()
    }
}

/// NextEnergy
pub fn next_energy() -> TariffConfig {
    TariffConfig {
        electricity_markup: dec!(0.0219),
        electricity_production_markup: dec!(0.0219),
        electricity_standing_charge_per_day: dec!(0.1970),
        overage_compensation_enabled: true,
        overage_compensation_rate: dec!(0.044),
        ..base_preset()
    }
}

/// All presets with their display names
pub fn all() -> Vec<(&'static str, TariffConfig)> {
    vec![
        ("ANWB Energie", anwb_energie()),
        ("Tibber", tibber()),
        ("Zonneplan", zonneplan()),
        ("Frank Energie", frank_energie()),
        ("easyEnergy", easy_energy()),
        ("Budget Energie", budget_energie()),
        ("Vandebron", vandebron()),
        ("NextEnergy", next_energy()),
    ]
}

/// Look up a preset by display name, case insensitive
pub fn by_name(name: &str) -> Option<TariffConfig> {
    all()
        .into_iter()
        .find(|(preset_name, _)| preset_name.eq_ignore_ascii_case(name))
        .map(|(_, config)| config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_validate() {
        for (name, config) in all() {
            assert!(config.validate().is_ok(), "preset {name} failed validation");
        }
    }

    #[test]
    fn test_by_name() {
        let tibber = by_name("Tibber").unwrap();
        assert_eq!(tibber.electricity_markup, dec!(0.0248));
        assert!(by_name("Enron").is_none());
    }

    #[test]
    fn test_zonneplan_bonus_setup() {
        let config = zonneplan();
        assert!(!config.overage_compensation_enabled);
        assert_eq!(config.production_bonus_percentage, dec!(10));
        assert_eq!(config.electricity_production_markup, dec!(0.02));
    }
}
