//! Contract-year windows
//!
//! The accounting year is anchored to the contract start date when one is
//! configured, and to the calendar year otherwise. Annual counters (solar
//! bonus, and optionally all meter totals) reset when the window advances.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A half-open accounting-year window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl YearWindow {
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day < self.end
    }
}

/// Computes the active contract-year window for a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractYearTracker {
    contract_start: Option<NaiveDate>,
}

impl ContractYearTracker {
    pub fn new(contract_start: Option<NaiveDate>) -> Self {
        Self { contract_start }
    }

    /// The window containing `today`
    pub fn current_window(&self, today: NaiveDate) -> YearWindow {
        match self.contract_start {
            None => {
                let start = first_of_year(today.year());
                YearWindow {
                    start,
                    end: first_of_year(today.year() + 1),
                }
            }
            Some(contract_start) => {
                let this_year = anniversary_for_year(contract_start, today.year());
                if today >= this_year {
                    YearWindow {
                        start: this_year,
                        end: anniversary_for_year(contract_start, today.year() + 1),
                    }
                } else {
                    YearWindow {
                        start: anniversary_for_year(contract_start, today.year() - 1),
                        end: this_year,
                    }
                }
            }
        }
    }

    /// The next window boundary strictly after `today`
    pub fn next_anniversary(&self, today: NaiveDate) -> NaiveDate {
        self.current_window(today).end
    }

    /// Whether the window advanced between two observations
    pub fn is_new_period(previous: &YearWindow, current: &YearWindow) -> bool {
        previous != current
    }
}

fn first_of_year(year: i32) -> NaiveDate {
    // Jan 1 exists for every year chrono can represent
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Anniversary of `start` in `year`, clamping Feb 29 to Feb 28 off leap years
fn anniversary_for_year(start: NaiveDate, year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, start.month(), start.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, start.month(), start.day() - 1))
        .unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_calendar_year_fallback() {
        let tracker = ContractYearTracker::new(None);
        let window = tracker.current_window(date(2025, 7, 1));
        assert_eq!(window.start, date(2025, 1, 1));
        assert_eq!(window.end, date(2026, 1, 1));
    }

    #[test]
    fn test_after_anniversary() {
        let tracker = ContractYearTracker::new(Some(date(2024, 1, 15)));
        let window = tracker.current_window(date(2025, 7, 1));
        assert_eq!(window.start, date(2025, 1, 15));
        assert_eq!(window.end, date(2026, 1, 15));
    }

    #[test]
    fn test_before_anniversary() {
        let tracker = ContractYearTracker::new(Some(date(2024, 1, 15)));
        let window = tracker.current_window(date(2025, 1, 1));
        assert_eq!(window.start, date(2024, 1, 15));
        assert_eq!(window.end, date(2025, 1, 15));
    }

    #[test]
    fn test_anniversary_day_starts_new_window() {
        let tracker = ContractYearTracker::new(Some(date(2024, 1, 15)));
        let window = tracker.current_window(date(2025, 1, 15));
        assert_eq!(window.start, date(2025, 1, 15));
    }

    #[test]
    fn test_leap_year_clamps_to_feb_28() {
        let tracker = ContractYearTracker::new(Some(date(2024, 2, 29)));
        let window = tracker.current_window(date(2025, 3, 1));
        assert_eq!(window.start, date(2025, 2, 28));
        assert_eq!(window.end, date(2026, 2, 28));
    }

    #[test]
    fn test_next_anniversary() {
        let tracker = ContractYearTracker::new(Some(date(2024, 1, 15)));
        assert_eq!(tracker.next_anniversary(date(2025, 7, 1)), date(2026, 1, 15));
        assert_eq!(tracker.next_anniversary(date(2025, 1, 1)), date(2025, 1, 15));
    }

    #[test]
    fn test_is_new_period() {
        let tracker = ContractYearTracker::new(None);
        let before = tracker.current_window(date(2024, 12, 31));
        let after = tracker.current_window(date(2025, 1, 1));
        assert!(ContractYearTracker::is_new_period(&before, &after));
        assert!(!ContractYearTracker::is_new_period(&after, &after));
    }

    #[test]
    fn test_window_contains() {
        let window = YearWindow {
            start: date(2025, 1, 15),
            end: date(2026, 1, 15),
        };
        assert!(window.contains(date(2025, 1, 15)));
        assert!(window.contains(date(2026, 1, 14)));
        assert!(!window.contains(date(2026, 1, 15)));
    }
}
