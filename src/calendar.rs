use chrono::{Datelike, Days, NaiveDate};
use std::fmt;

use crate::error::ValidationError;

/// A validated calendar month window (`month` is 1..=12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(ValidationError::InvalidMonth { year, month });
        }
        Ok(YearMonth { year, month })
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        YearMonth { year: date.year(), month: date.month() }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        // Construction guarantees the 1st exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let last = days_in_month(self.year, self.month);
        NaiveDate::from_ymd_opt(self.year, self.month, last).unwrap_or(NaiveDate::MIN)
    }

    pub fn days(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            YearMonth { year: self.year + 1, month: 1 }
        } else {
            YearMonth { year: self.year, month: self.month + 1 }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            YearMonth { year: self.year - 1, month: 12 }
        } else {
            YearMonth { year: self.year, month: self.month - 1 }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Number of days in the given month, leap years included.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Day of week as an index, 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Clamp-down policy: a month-day past the end of the month becomes the last day.
pub fn clamp_day(window: YearMonth, day: u8) -> NaiveDate {
    let day = u32::from(day).clamp(1, window.days());
    NaiveDate::from_ymd_opt(window.year, window.month, day).unwrap_or_else(|| window.last_day())
}

/// First date in the window whose weekday matches `weekday`, scanning forward from the 1st.
pub fn first_weekday_in(window: YearMonth, weekday: u8) -> Option<NaiveDate> {
    if weekday > 6 {
        return None;
    }
    let first = window.first_day();
    let offset = (7 + u32::from(weekday) - u32::from(weekday_index(first))) % 7;
    first.checked_add_days(Days::new(u64::from(offset)))
}

/// The Sunday starting the week that contains `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(weekday_index(date))))
        .unwrap_or(date)
}

pub const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Parses `sun`, `monday`, `3` and friends into a weekday index.
pub fn parse_weekday(s: &str) -> Option<u8> {
    let s = s.trim().to_lowercase();
    if let Ok(n) = s.parse::<u8>() {
        return Some(n);
    }
    WEEKDAY_NAMES
        .iter()
        .position(|name| s.starts_with(&name.to_lowercase()))
        .map(|i| i as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(y: i32, m: u32) -> YearMonth {
        YearMonth::new(y, m).unwrap()
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn rejects_bad_month() {
        assert!(YearMonth::new(2024, 0).is_err());
        assert!(YearMonth::new(2024, 13).is_err());
    }

    #[test]
    fn wraps_year_boundaries() {
        assert_eq!(ym(2024, 12).next(), ym(2025, 1));
        assert_eq!(ym(2025, 1).prev(), ym(2024, 12));
    }

    #[test]
    fn clamps_day_to_month_end() {
        assert_eq!(clamp_day(ym(2024, 4), 31), NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
        assert_eq!(clamp_day(ym(2023, 2), 31), NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
        assert_eq!(clamp_day(ym(2024, 3), 15), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn finds_first_weekday() {
        // January 2024 starts on a Monday.
        assert_eq!(first_weekday_in(ym(2024, 1), 1), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(first_weekday_in(ym(2024, 1), 0), NaiveDate::from_ymd_opt(2024, 1, 7));
        assert_eq!(first_weekday_in(ym(2024, 1), 6), NaiveDate::from_ymd_opt(2024, 1, 6));
        assert_eq!(first_weekday_in(ym(2024, 1), 7), None);
    }

    #[test]
    fn parses_weekdays() {
        assert_eq!(parse_weekday("mon"), Some(1));
        assert_eq!(parse_weekday("Saturday"), Some(6));
        assert_eq!(parse_weekday("0"), Some(0));
        assert_eq!(parse_weekday("funday"), None);
    }
}
