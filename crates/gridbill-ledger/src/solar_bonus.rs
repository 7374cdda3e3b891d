//! Solar production bonus
//!
//! Some suppliers pay a percentage bonus on solar production, capped at an
//! annual kWh limit and only while the sun can plausibly be shining. The
//! annual counter follows the contract year, not the calendar year.

use chrono::{DateTime, NaiveTime, Utc};
use gridbill_common::ACCUMULATOR_PRECISION;
use gridbill_tariff::YearWindow;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decides whether a timestamp counts as daylight
pub trait DaylightOracle: Send + Sync {
    fn is_daylight(&self, at: DateTime<Utc>) -> bool;
}

/// Fixed clock-time daylight window, default 06:00 to 20:00
#[derive(Debug, Clone, Copy)]
pub struct FixedDaylightWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for FixedDaylightWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl DaylightOracle for FixedDaylightWindow {
    fn is_daylight(&self, at: DateTime<Utc>) -> bool {
        let time = at.time();
        time >= self.start && time < self.end
    }
}

/// Annual production counter and accrued bonus
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SolarBonusTracker {
    /// Contract-year window the annual counter belongs to
    pub window: Option<YearWindow>,
    /// Production metered in the current contract year, in kWh
    pub year_production_kwh: Decimal,
    /// Bonus earned since the ledger was created, in euro
    pub total_bonus_euro: Decimal,
}

impl SolarBonusTracker {
    /// Rolls the annual counter when the contract year advances.
    /// Returns true when a rollover happened.
    pub fn align_to(&mut self, window: YearWindow) -> bool {
        match self.window {
            Some(current) if current == window => false,
            previous => {
                self.window = Some(window);
                self.year_production_kwh = Decimal::ZERO;
                previous.is_some()
            }
        }
    }

    /// Accrues bonus for a production delta, clipping the eligible portion
    /// at the annual limit. Returns the bonus paid for this delta.
    pub fn accrue(
        &mut self,
        delta_kwh: Decimal,
        rate_per_kwh: Decimal,
        annual_limit_kwh: Decimal,
        eligible: bool,
    ) -> Decimal {
        let headroom = (annual_limit_kwh - self.year_production_kwh).max(Decimal::ZERO);
        self.year_production_kwh = round(self.year_production_kwh + delta_kwh);

        if !eligible || rate_per_kwh <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let eligible_kwh = delta_kwh.min(headroom);
        if eligible_kwh <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let bonus = round(eligible_kwh * rate_per_kwh);
        self.total_bonus_euro = round(self.total_bonus_euro + bonus);
        debug!(%eligible_kwh, %bonus, "accrued solar bonus");
        bonus
    }
}

fn round(value: Decimal) -> Decimal {
    value.round_dp(ACCUMULATOR_PRECISION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 21, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_daylight_window_bounds() {
        let window = FixedDaylightWindow::default();
        assert!(!window.is_daylight(at(5)));
        assert!(window.is_daylight(at(6)));
        assert!(window.is_daylight(at(19)));
        assert!(!window.is_daylight(at(20)));
    }

    #[test]
    fn test_bonus_accrues_within_limit() {
        let mut tracker = SolarBonusTracker::default();
        let bonus = tracker.accrue(dec!(10), dec!(0.012), dec!(7500), true);
        assert_eq!(bonus, dec!(0.12));
        assert_eq!(tracker.year_production_kwh, dec!(10));
        assert_eq!(tracker.total_bonus_euro, dec!(0.12));
    }

    #[test]
    fn test_bonus_clips_at_annual_limit() {
        let mut tracker = SolarBonusTracker {
            year_production_kwh: dec!(7498),
            ..SolarBonusTracker::default()
        };
        // only 2 of the 5 kWh still fit under the cap
        let bonus = tracker.accrue(dec!(5), dec!(0.10), dec!(7500), true);
        assert_eq!(bonus, dec!(0.20));
        assert_eq!(tracker.year_production_kwh, dec!(7503));

        // fully over the cap, production still counts
        let bonus = tracker.accrue(dec!(3), dec!(0.10), dec!(7500), true);
        assert_eq!(bonus, Decimal::ZERO);
        assert_eq!(tracker.year_production_kwh, dec!(7506));
    }

    #[test]
    fn test_ineligible_delta_still_counts_production() {
        let mut tracker = SolarBonusTracker::default();
        let bonus = tracker.accrue(dec!(4), dec!(0.10), dec!(7500), false);
        assert_eq!(bonus, Decimal::ZERO);
        assert_eq!(tracker.year_production_kwh, dec!(4));
    }

    #[test]
    fn test_negative_rate_pays_nothing() {
        let mut tracker = SolarBonusTracker::default();
        let bonus = tracker.accrue(dec!(4), dec!(-0.02), dec!(7500), true);
        assert_eq!(bonus, Decimal::ZERO);
    }

    #[test]
    fn test_align_resets_year_counter() {
        use chrono::NaiveDate;
        let first = YearWindow {
            start: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        };
        let second = YearWindow {
            start: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        };
        let mut tracker = SolarBonusTracker::default();
        assert!(!tracker.align_to(first));
        tracker.accrue(dec!(100), dec!(0.01), dec!(7500), true);
        assert!(tracker.align_to(second));
        assert_eq!(tracker.year_production_kwh, Decimal::ZERO);
        assert_eq!(tracker.total_bonus_euro, dec!(1));
        assert!(!tracker.align_to(second));
    }
}
