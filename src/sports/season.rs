//! Season windows and the calendar that answers "is this sport in season today?".
//!
//! Windows are year-agnostic month-day ranges. Comparing month-days instead of
//! concrete dates keeps a window that touches February 29 valid in every year.

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use super::Sport;
use crate::error::ConfigError;

/// A calendar day without a year, ordered chronologically within a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Result<Self, ConfigError> {
        // 2000 is a leap year, so 02-29 is accepted.
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(ConfigError::InvalidMonthDay(format!("{:02}-{:02}", month, day)));
        }
        Ok(MonthDay { month, day })
    }

    /// Unchecked constructor for the built-in season table.
    pub(crate) const fn known(month: u32, day: u32) -> Self {
        MonthDay { month, day }
    }

    pub fn of(date: NaiveDate) -> Self {
        MonthDay {
            month: date.month(),
            day: date.day(),
        }
    }
}

impl FromStr for MonthDay {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidMonthDay(s.to_string());
        let (m, d) = s.trim().split_once('-').ok_or_else(invalid)?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        let day: u32 = d.parse().map_err(|_| invalid())?;
        MonthDay::new(month, day).map_err(|_| invalid())
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl Serialize for MonthDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Annual range during which a sport is polled. Both ends are inclusive.
/// When `end` sorts before `start` the window spans New Year's Day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeasonWindow {
    pub start: MonthDay,
    pub end: MonthDay,
}

impl SeasonWindow {
    pub fn new(start: MonthDay, end: MonthDay) -> Self {
        SeasonWindow { start, end }
    }

    /// Whether the window crosses the calendar-year boundary.
    pub fn wraps(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let today = MonthDay::of(date);
        if self.wraps() {
            // Either past this year's opening day or still in last year's season.
            today >= self.start || today <= self.end
        } else {
            self.start <= today && today <= self.end
        }
    }
}

impl FromStr for SeasonWindow {
    type Err = ConfigError;

    /// Parses `MM-DD..MM-DD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .trim()
            .split_once("..")
            .ok_or_else(|| ConfigError::InvalidWindow(s.to_string()))?;
        Ok(SeasonWindow::new(start.parse()?, end.parse()?))
    }
}

impl fmt::Display for SeasonWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Maps each sport to its season window. Sports without a window are never
/// in season.
#[derive(Debug, Clone, Default)]
pub struct SeasonCalendar {
    windows: HashMap<Sport, SeasonWindow>,
}

impl SeasonCalendar {
    pub fn new(windows: impl IntoIterator<Item = (Sport, SeasonWindow)>) -> Self {
        SeasonCalendar {
            windows: windows.into_iter().collect(),
        }
    }

    pub fn is_in_season(&self, sport: Sport, today: NaiveDate) -> bool {
        match self.windows.get(&sport) {
            Some(window) => window.contains(today),
            None => {
                warn!("[Season Check] {}", ConfigError::MissingWindow(sport));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window(s: &str) -> SeasonWindow {
        s.parse().unwrap()
    }

    #[test]
    fn test_regular_window_is_inclusive() {
        let mlb = window("03-20..11-01");
        assert!(!mlb.wraps());
        assert!(mlb.contains(date(2025, 3, 20)));
        assert!(mlb.contains(date(2025, 10, 9)));
        assert!(mlb.contains(date(2025, 11, 1)));
        assert!(!mlb.contains(date(2025, 11, 2)));
        assert!(!mlb.contains(date(2026, 1, 1)));
        assert!(!mlb.contains(date(2026, 3, 19)));
        assert!(mlb.contains(date(2026, 3, 20)));
    }

    #[test]
    fn test_wrapping_window() {
        let nhl = window("09-15..02-15");
        assert!(nhl.wraps());
        assert!(nhl.contains(date(2026, 1, 1)));
        assert!(nhl.contains(date(2025, 9, 15)));
        assert!(nhl.contains(date(2025, 12, 31)));
        assert!(nhl.contains(date(2026, 2, 15)));
        assert!(!nhl.contains(date(2026, 2, 16)));
        assert!(!nhl.contains(date(2025, 9, 14)));
        assert!(!nhl.contains(date(2025, 6, 1)));
    }

    #[test]
    fn test_single_day_window() {
        let w = window("07-04..07-04");
        assert!(!w.wraps());
        assert!(w.contains(date(2025, 7, 4)));
        assert!(!w.contains(date(2025, 7, 3)));
        assert!(!w.contains(date(2025, 7, 5)));
    }

    #[test]
    fn test_leap_day_boundary_in_non_leap_year() {
        let w = window("11-01..02-29");
        assert!(w.contains(date(2025, 2, 28)));
        assert!(!w.contains(date(2025, 3, 1)));
        assert!(w.contains(date(2024, 2, 29)));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("13-01".parse::<MonthDay>().is_err());
        assert!("02-30".parse::<MonthDay>().is_err());
        assert!("0315".parse::<MonthDay>().is_err());
        assert!("03-20-11-01".parse::<SeasonWindow>().is_err());
        assert_eq!(
            "03-20..xx".parse::<SeasonWindow>(),
            Err(ConfigError::InvalidMonthDay("xx".into()))
        );
        assert_eq!(window("3-5..11-1").to_string(), "03-05..11-01");
    }

    #[test]
    fn test_calendar_without_window_is_out_of_season() {
        let calendar = SeasonCalendar::new([(Sport::Mlb, window("03-20..11-01"))]);
        assert!(calendar.is_in_season(Sport::Mlb, date(2025, 6, 1)));
        assert!(!calendar.is_in_season(Sport::Nba, date(2025, 6, 1)));
    }

    fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (2000i32..2100, 1u32..=366).prop_filter_map("valid ordinal", |(y, o)| {
            NaiveDate::from_yo_opt(y, o)
        })
    }

    fn arb_month_day() -> impl Strategy<Value = MonthDay> {
        (1u32..=12, 1u32..=31).prop_filter_map("valid month-day", |(m, d)| MonthDay::new(m, d).ok())
    }

    proptest! {
        /// Agrees with building the boundaries as concrete dates in the
        /// queried year and comparing dates. 02-29 boundaries have no concrete
        /// date in non-leap years; the leap-day properties below cover them.
        #[test]
        fn contains_matches_date_comparison(
            start in arb_month_day(),
            end in arb_month_day(),
            today in arb_date(),
        ) {
            let year = today.year();
            let season_start = NaiveDate::from_ymd_opt(year, start.month, start.day);
            let season_end = NaiveDate::from_ymd_opt(year, end.month, end.day);
            prop_assume!(season_start.is_some() && season_end.is_some());
            let (season_start, season_end) = (season_start.unwrap(), season_end.unwrap());

            let expected = if season_end < season_start {
                today >= season_start || today <= season_end
            } else {
                today >= season_start && today <= season_end
            };

            prop_assert_eq!(SeasonWindow::new(start, end).contains(today), expected);
        }

        /// 02-29 boundaries compare by month-day. In a non-leap year a window
        /// ending 02-29 behaves as one ending 02-28 and a window starting 02-29
        /// as one starting 03-01; nothing rolls the leap day over into March.
        #[test]
        fn leap_day_boundaries_in_non_leap_years(
            other in arb_month_day(),
            today in arb_date().prop_filter("non-leap year", |d| NaiveDate::from_ymd_opt(d.year(), 2, 29).is_none()),
        ) {
            let leap_day = MonthDay::known(2, 29);
            prop_assume!(other != leap_day);

            prop_assert_eq!(
                SeasonWindow::new(other, leap_day).contains(today),
                SeasonWindow::new(other, MonthDay::known(2, 28)).contains(today)
            );
            prop_assert_eq!(
                SeasonWindow::new(leap_day, other).contains(today),
                SeasonWindow::new(MonthDay::known(3, 1), other).contains(today)
            );
        }

        #[test]
        fn leap_day_is_in_season_when_it_bounds_the_window(
            other in arb_month_day(),
            year in (2000i32..2100).prop_filter("leap year", |y| NaiveDate::from_ymd_opt(*y, 2, 29).is_some()),
        ) {
            let leap_day = MonthDay::known(2, 29);
            let today = NaiveDate::from_ymd_opt(year, 2, 29).unwrap();
            prop_assert!(SeasonWindow::new(other, leap_day).contains(today));
            prop_assert!(SeasonWindow::new(leap_day, other).contains(today));
        }

        #[test]
        fn boundaries_are_always_in_season(start in arb_month_day(), end in arb_month_day(), year in 2000i32..2100) {
            let w = SeasonWindow::new(start, end);
            if let Some(d) = NaiveDate::from_ymd_opt(year, start.month, start.day) {
                prop_assert!(w.contains(d));
            }
            if let Some(d) = NaiveDate::from_ymd_opt(year, end.month, end.day) {
                prop_assert!(w.contains(d));
            }
        }
    }
}
