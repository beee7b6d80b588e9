use std::fmt;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::error::{ExportError, ExportResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Daily,
    MonthEnd,
}

impl Step {
    pub fn schedule(self, cursor: NaiveDate) -> ScheduledDate {
        match self {
            Step::Daily => ScheduledDate {
                bind: cursor,
                period_start: cursor,
                label: cursor,
            },
            Step::MonthEnd => ScheduledDate {
                bind: cursor,
                period_start: first_day_of_month(cursor),
                label: last_day_of_month(cursor),
            },
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Daily => f.write_str("daily"),
            Step::MonthEnd => f.write_str("month_end"),
        }
    }
}

/// One iteration of a sweep: the date bound into the query and the date
/// that labels the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledDate {
    pub bind: NaiveDate,
    pub period_start: NaiveDate,
    pub label: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ExportResult<Self> {
        if start > end {
            return Err(ExportError::Config(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn sweep(&self, step: Step) -> DateSweep {
        DateSweep {
            cursor: Some(self.start),
            end: self.end,
            step,
        }
    }
}

/// Lazy walk over a [`DateRange`]. Each step resumes the day after the
/// previous label, so monthly sweeps realign to the first of the month.
#[derive(Debug, Clone)]
pub struct DateSweep {
    cursor: Option<NaiveDate>,
    end: NaiveDate,
    step: Step,
}

impl Iterator for DateSweep {
    type Item = ScheduledDate;

    fn next(&mut self) -> Option<ScheduledDate> {
        let cursor = self.cursor.filter(|cursor| *cursor <= self.end)?;
        let scheduled = self.step.schedule(cursor);
        self.cursor = scheduled.label.succ_opt();
        Some(scheduled)
    }
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Day 28 of any month plus four days always lands in the next month;
/// stepping back by that date's day of month gives the last day of the
/// given month.
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let next_month = date
        .with_day(28)
        .and_then(|day_28| day_28.checked_add_days(Days::new(4)));

    match next_month {
        Some(next_month) => next_month - Days::new(u64::from(next_month.day())),
        None => NaiveDate::MAX,
    }
}
