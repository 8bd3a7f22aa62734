//! Week range shown above the board.

use chrono::{Days, NaiveDate};

/// Span from a given day to one week later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekRange {
    /// First day of the range.
    pub start: NaiveDate,
    /// Day seven days after `start`.
    pub end: NaiveDate,
}

impl WeekRange {
    /// Build the range beginning on `today`.
    pub fn starting(today: NaiveDate) -> Self {
        let end = today.checked_add_days(Days::new(7)).unwrap_or(NaiveDate::MAX);
        Self { start: today, end }
    }

    /// Header text, e.g. `For the week of 01/20 - 01/27`.
    pub fn label(&self) -> String {
        format!(
            "For the week of {} - {}",
            self.start.format("%m/%d"),
            self.end.format("%m/%d")
        )
    }
}
