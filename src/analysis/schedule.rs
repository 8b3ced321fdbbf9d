use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Every analysed date falls in this year.
pub const REFERENCE_YEAR: i32 = 2015;

const SECONDS_PER_DAY: u32 = 86_400;

/// A calendar day without a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMonth {
    pub day: u32,
    pub month: u32,
}

impl DayMonth {
    #[must_use]
    pub const fn new(day: u32, month: u32) -> Self {
        Self { day, month }
    }

    /// The date in [`REFERENCE_YEAR`], if it exists.
    #[must_use]
    pub fn date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(REFERENCE_YEAR, self.month, self.day)
    }
}

/// Inclusive span of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DayMonth,
    pub end: DayMonth,
}

impl DateRange {
    #[must_use]
    pub const fn new(start: DayMonth, end: DayMonth) -> Self {
        Self { start, end }
    }

    /// Every date from start to end inclusive. Empty when end precedes
    /// start or either date does not exist.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let span = self.start.date().zip(self.end.date());
        span.into_iter()
            .flat_map(|(start, end)| start.iter_days().take_while(move |d| *d <= end))
    }
}

/// Wall-clock time of day. `24:00` denotes the end of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    #[must_use]
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    fn is_valid(self) -> bool {
        self.minute < 60 && (self.hour < 24 || (self.hour == 24 && self.minute == 0))
    }

    /// Seconds since midnight.
    #[must_use]
    pub fn seconds(self) -> u32 {
        self.hour * 3600 + self.minute * 60
    }
}

/// A daily interval during which exposure is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeWindow {
    #[must_use]
    pub const fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }
}

/// Time windows applied on a set of weekdays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayType {
    pub windows: Vec<TimeWindow>,
    /// Index 0 is Monday, 6 is Sunday.
    pub weekdays: [bool; 7],
}

impl DayType {
    /// `true` if this type applies on the weekday of `date`.
    #[must_use]
    pub fn applies_to(&self, date: NaiveDate) -> bool {
        self.weekdays[date.weekday().num_days_from_monday() as usize]
    }
}

/// When to sample: which days, which hours and how often.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSchedule {
    pub date_ranges: Vec<DateRange>,
    /// Checked in order; the first type whose mask includes a day wins.
    pub day_types: Vec<DayType>,
    pub time_step_secs: u32,
    pub export_minimums: bool,
    pub export_maximums: bool,
}

impl Default for AnalysisSchedule {
    /// The indoor-environment-quality schedule: the whole year, weekdays
    /// 07:00 to 18:00 and Saturday mornings, sampled hourly.
    fn default() -> Self {
        let weekdays = [true, true, true, true, true, false, false];
        let saturday = [false, false, false, false, false, true, false];
        Self {
            date_ranges: vec![DateRange::new(DayMonth::new(1, 1), DayMonth::new(31, 12))],
            day_types: vec![
                DayType {
                    windows: vec![TimeWindow::new(TimeOfDay::new(7, 0), TimeOfDay::new(18, 0))],
                    weekdays,
                },
                DayType {
                    windows: vec![TimeWindow::new(TimeOfDay::new(9, 0), TimeOfDay::new(12, 0))],
                    weekdays: saturday,
                },
            ],
            time_step_secs: 3600,
            export_minimums: false,
            export_maximums: false,
        }
    }
}

impl AnalysisSchedule {
    /// Checks the schedule is usable.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidSchedule`] for a zero or over-long
    /// time step, a date that does not exist in [`REFERENCE_YEAR`] or an
    /// impossible time of day.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AnalysisError::InvalidSchedule(msg).into());
        if self.time_step_secs == 0 || self.time_step_secs > SECONDS_PER_DAY {
            return invalid(format!("time step of {} s", self.time_step_secs));
        }
        for range in &self.date_ranges {
            for dm in [range.start, range.end] {
                if dm.date().is_none() {
                    return invalid(format!(
                        "{}/{} is not a date in {REFERENCE_YEAR}",
                        dm.day, dm.month
                    ));
                }
            }
        }
        for window in self.day_types.iter().flat_map(|t| &t.windows) {
            for time in [window.start, window.end] {
                if !time.is_valid() {
                    return invalid(format!(
                        "{:02}:{:02} is not a time of day",
                        time.hour, time.minute
                    ));
                }
            }
        }
        Ok(())
    }

    /// The day type used on `date`, if any.
    #[must_use]
    pub fn day_type_for(&self, date: NaiveDate) -> Option<&DayType> {
        self.day_types.iter().find(|t| t.applies_to(date))
    }

    /// Every scheduled date in range order, including days no type
    /// applies to.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.date_ranges.iter().flat_map(DateRange::days)
    }
}
