use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;

/// Number of calendar months offered for selection.
pub const SELECTABLE_MONTHS: u32 = 24;

/// Inclusive date range covering one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window for the month containing `anchor`; the day of month is ignored.
    pub fn for_month(anchor: NaiveDate) -> Self {
        let start = first_of_month(anchor);
        let end = start + Months::new(1) - Days::new(1);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// First days of the `count` most recent months, most recent first.
pub fn month_options(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    let current = first_of_month(today);
    (0..count)
        .map(|offset| current - Months::new(offset))
        .collect()
}

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_month(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d")
        .map_err(|_| format!("expected a month as YYYY-MM, got '{value}'"))
}

/// Picks the requested month if it is on offer, or the most recent option.
pub fn select_month(options: &[NaiveDate], requested: Option<NaiveDate>) -> Option<NaiveDate> {
    match requested {
        None => options.first().copied(),
        Some(month) => {
            let month = first_of_month(month);
            options.iter().copied().find(|option| *option == month)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn window_covers_leap_february() {
        let window = DateWindow::for_month(date(2024, 2, 17));
        assert_eq!(window.start, date(2024, 2, 1));
        assert_eq!(window.end, date(2024, 2, 29));
    }

    #[test]
    fn window_covers_common_february() {
        let window = DateWindow::for_month(date(2023, 2, 28));
        assert_eq!(window.end, date(2023, 2, 28));
    }

    #[test]
    fn window_handles_thirty_day_months_and_year_end() {
        assert_eq!(
            DateWindow::for_month(date(2024, 4, 30)),
            DateWindow {
                start: date(2024, 4, 1),
                end: date(2024, 4, 30)
            }
        );
        assert_eq!(
            DateWindow::for_month(date(2023, 12, 1)),
            DateWindow {
                start: date(2023, 12, 1),
                end: date(2023, 12, 31)
            }
        );
    }

    #[test]
    fn window_ignores_day_of_month() {
        let first = DateWindow::for_month(date(2025, 7, 1));
        let last = DateWindow::for_month(date(2025, 7, 31));
        assert_eq!(first, last);
    }

    #[test]
    fn contains_is_inclusive() {
        let window = DateWindow::for_month(date(2024, 3, 10));
        assert!(window.contains(date(2024, 3, 1)));
        assert!(window.contains(date(2024, 3, 31)));
        assert!(!window.contains(date(2024, 2, 29)));
        assert!(!window.contains(date(2024, 4, 1)));
    }

    #[test]
    fn month_options_walk_back_across_years() {
        let options = month_options(date(2026, 2, 14), SELECTABLE_MONTHS);
        assert_eq!(options.len(), 24);
        assert_eq!(options[0], date(2026, 2, 1));
        assert_eq!(options[1], date(2026, 1, 1));
        assert_eq!(options[2], date(2025, 12, 1));
        assert_eq!(options[23], date(2024, 3, 1));
    }

    #[test]
    fn parse_month_accepts_year_and_month() {
        assert_eq!(parse_month("2024-02"), Ok(date(2024, 2, 1)));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("February").is_err());
    }

    #[test]
    fn select_month_defaults_to_most_recent() {
        let options = month_options(date(2026, 10, 16), 3);
        assert_eq!(select_month(&options, None), Some(date(2026, 10, 1)));
        assert_eq!(
            select_month(&options, Some(date(2026, 9, 20))),
            Some(date(2026, 9, 1))
        );
        assert_eq!(select_month(&options, Some(date(2025, 1, 1))), None);
    }
}
