//! Working-day calendar arithmetic.
//!
//! Dates are start-of-day boundaries: a task with `ES = Monday` and a
//! 5-day duration on a Mon-Fri calendar has `EF = next Monday`, and an FS
//! successor with zero lag starts exactly there. All solver date math goes
//! through this module so weekends and holidays are skipped uniformly.

use chrono::{Datelike, NaiveDate, Weekday};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from calendar configuration or date arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// The working-weekday set is empty. Rejected at construction, never
    /// during a solve.
    #[error("calendar has no working weekdays")]
    NoWorkingDays,
    /// Date arithmetic walked past the representable date range.
    #[error("date arithmetic moved outside the supported date range")]
    DateOutOfRange,
}

/// Which weekdays count as working days, plus explicit holiday dates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub working_weekdays: Vec<Weekday>,
    pub holidays: Vec<NaiveDate>,
}

impl Default for CalendarConfig {
    /// Monday through Friday, no holidays.
    fn default() -> Self {
        Self {
            working_weekdays: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            holidays: Vec::new(),
        }
    }
}

/// Resolves working/non-working days and performs working-day date math.
#[derive(Clone, Debug)]
pub struct WorkdayCalendar {
    config: CalendarConfig,
    /// Indexed by `Weekday::num_days_from_monday()`.
    working: [bool; 7],
    holidays: FxHashSet<NaiveDate>,
}

impl WorkdayCalendar {
    /// Build a calendar, failing fast on an empty working-weekday set.
    pub fn new(config: CalendarConfig) -> Result<Self, CalendarError> {
        if config.working_weekdays.is_empty() {
            return Err(CalendarError::NoWorkingDays);
        }
        let mut working = [false; 7];
        for wd in &config.working_weekdays {
            working[wd.num_days_from_monday() as usize] = true;
        }
        let holidays = config.holidays.iter().copied().collect();
        Ok(Self {
            config,
            working,
            holidays,
        })
    }

    /// The configuration this calendar was built from.
    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working[date.weekday().num_days_from_monday() as usize]
            && !self.holidays.contains(&date)
    }

    /// Roll forward to the next working day (identity on working days).
    pub fn snap_to_working_day(&self, date: NaiveDate) -> Result<NaiveDate, CalendarError> {
        let mut d = date;
        while !self.is_working_day(d) {
            d = d.succ_opt().ok_or(CalendarError::DateOutOfRange)?;
        }
        Ok(d)
    }

    /// Roll backward to the previous working day (identity on working days).
    /// Used to tighten deadline dates that land on non-working days.
    pub fn snap_back_to_working_day(&self, date: NaiveDate) -> Result<NaiveDate, CalendarError> {
        let mut d = date;
        while !self.is_working_day(d) {
            d = d.pred_opt().ok_or(CalendarError::DateOutOfRange)?;
        }
        Ok(d)
    }

    /// Move `days` working days from `date`, skipping non-working days
    /// entirely. Zero returns `date` unchanged, so a milestone's finish is
    /// always its start. Negative counts move backward.
    pub fn add_working_days(
        &self,
        date: NaiveDate,
        days: i64,
    ) -> Result<NaiveDate, CalendarError> {
        let mut d = date;
        if days >= 0 {
            for _ in 0..days {
                loop {
                    d = d.succ_opt().ok_or(CalendarError::DateOutOfRange)?;
                    if self.is_working_day(d) {
                        break;
                    }
                }
            }
        } else {
            for _ in 0..(-days) {
                loop {
                    d = d.pred_opt().ok_or(CalendarError::DateOutOfRange)?;
                    if self.is_working_day(d) {
                        break;
                    }
                }
            }
        }
        Ok(d)
    }

    /// Signed count of working days from `a` to `b`.
    ///
    /// Inverse of [`add_working_days`](Self::add_working_days) for dates on
    /// working days: `add_working_days(a, working_days_between(a, b)) == b`.
    /// Positive when `b` is later than `a`.
    pub fn working_days_between(&self, a: NaiveDate, b: NaiveDate) -> i64 {
        if a == b {
            return 0;
        }
        let (lo, hi, sign) = if a < b { (a, b, 1) } else { (b, a, -1) };
        let mut count = 0i64;
        let mut d = lo;
        while d < hi {
            // succ_opt cannot fail here: d < hi keeps us in range
            d = match d.succ_opt() {
                Some(next) => next,
                None => break,
            };
            if self.is_working_day(d) {
                count += 1;
            }
        }
        sign * count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekday_calendar() -> WorkdayCalendar {
        WorkdayCalendar::new(CalendarConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_working_set_rejected() {
        let config = CalendarConfig {
            working_weekdays: vec![],
            holidays: vec![],
        };
        assert_eq!(
            WorkdayCalendar::new(config).unwrap_err(),
            CalendarError::NoWorkingDays
        );
    }

    #[test]
    fn test_add_zero_is_identity() {
        let cal = weekday_calendar();
        let monday = date(2025, 1, 6);
        assert_eq!(cal.add_working_days(monday, 0).unwrap(), monday);
        // Identity holds even on a non-working day
        let saturday = date(2025, 1, 4);
        assert_eq!(cal.add_working_days(saturday, 0).unwrap(), saturday);
    }

    #[test]
    fn test_add_skips_weekend() {
        let cal = weekday_calendar();
        // Mon Jan 6 + 5 working days = Mon Jan 13
        assert_eq!(
            cal.add_working_days(date(2025, 1, 6), 5).unwrap(),
            date(2025, 1, 13)
        );
        // Fri Jan 10 + 1 = Mon Jan 13
        assert_eq!(
            cal.add_working_days(date(2025, 1, 10), 1).unwrap(),
            date(2025, 1, 13)
        );
    }

    #[test]
    fn test_add_negative_moves_backward() {
        let cal = weekday_calendar();
        assert_eq!(
            cal.add_working_days(date(2025, 1, 13), -5).unwrap(),
            date(2025, 1, 6)
        );
        // Mon Jan 13 - 1 = Fri Jan 10
        assert_eq!(
            cal.add_working_days(date(2025, 1, 13), -1).unwrap(),
            date(2025, 1, 10)
        );
    }

    #[test]
    fn test_add_skips_holidays() {
        let config = CalendarConfig {
            holidays: vec![date(2025, 1, 7)], // Tuesday off
            ..CalendarConfig::default()
        };
        let cal = WorkdayCalendar::new(config).unwrap();
        // Mon + 1 lands on Wed since Tue is a holiday
        assert_eq!(
            cal.add_working_days(date(2025, 1, 6), 1).unwrap(),
            date(2025, 1, 8)
        );
    }

    #[test]
    fn test_between_sign_and_inverse() {
        let cal = weekday_calendar();
        let a = date(2025, 1, 6); // Mon
        let b = date(2025, 1, 14); // Tue next week
        let n = cal.working_days_between(a, b);
        assert_eq!(n, 6);
        assert_eq!(cal.working_days_between(b, a), -6);
        assert_eq!(cal.add_working_days(a, n).unwrap(), b);
        assert_eq!(cal.add_working_days(b, -n).unwrap(), a);
    }

    #[test]
    fn test_between_same_date_is_zero() {
        let cal = weekday_calendar();
        assert_eq!(cal.working_days_between(date(2025, 1, 6), date(2025, 1, 6)), 0);
    }

    #[test]
    fn test_inverse_property_across_holiday() {
        let config = CalendarConfig {
            holidays: vec![date(2025, 1, 8), date(2025, 1, 9)],
            ..CalendarConfig::default()
        };
        let cal = WorkdayCalendar::new(config).unwrap();
        let a = date(2025, 1, 6);
        for offset in 1..10 {
            let b = cal.add_working_days(a, offset).unwrap();
            assert!(cal.is_working_day(b));
            assert_eq!(cal.working_days_between(a, b), offset);
        }
    }

    #[test]
    fn test_snap_to_working_day() {
        let cal = weekday_calendar();
        assert_eq!(
            cal.snap_to_working_day(date(2025, 1, 4)).unwrap(), // Sat
            date(2025, 1, 6)
        );
        assert_eq!(
            cal.snap_to_working_day(date(2025, 1, 6)).unwrap(),
            date(2025, 1, 6)
        );
        assert_eq!(
            cal.snap_back_to_working_day(date(2025, 1, 4)).unwrap(),
            date(2025, 1, 3)
        );
    }
}
