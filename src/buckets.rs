//! Calendar arithmetic for report buckets.
//!
//! Every bucket is a half-open window `[start, end)` of naive local
//! timestamps. A session belongs to a bucket when its `start_time` falls in
//! that window, so a session starting exactly on a boundary is counted in the
//! later bucket.

use chrono::{Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::AppError;

pub const YEAR_BUCKETS: usize = 12;
pub const MONTH_BUCKETS: usize = 4;
pub const WEEK_BUCKETS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Year,
    Month,
    Week,
}

impl ReportMode {
    /// An absent or blank filter means month mode.
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(str::trim).unwrap_or_default() {
            "" | "month" => Ok(ReportMode::Month),
            "year" => Ok(ReportMode::Year),
            "week" => Ok(ReportMode::Week),
            other => Err(AppError::validation(format!("Invalid filter: {other}"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportMode::Year => "year",
            ReportMode::Month => "month",
            ReportMode::Week => "week",
        }
    }

    pub fn bucket_count(self) -> usize {
        match self {
            ReportMode::Year => YEAR_BUCKETS,
            ReportMode::Month => MONTH_BUCKETS,
            ReportMode::Week => WEEK_BUCKETS,
        }
    }
}

/// The calendar period a report covers, carrying only the parameters its
/// mode needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Year { year: i32 },
    Month { year: i32, month: u32 },
    Week { year: i32, month: u32, week: i32 },
}

impl Period {
    pub fn mode(&self) -> ReportMode {
        match self {
            Period::Year { .. } => ReportMode::Year,
            Period::Month { .. } => ReportMode::Month,
            Period::Week { .. } => ReportMode::Week,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Bucket {
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.start && instant < self.end
    }
}

pub fn plan_buckets(period: &Period) -> Result<Vec<Bucket>, AppError> {
    match *period {
        Period::Year { year } => year_buckets(year),
        Period::Month { year, month } => month_buckets(year, month),
        Period::Week { year, month, week } => week_buckets(year, month, week),
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, AppError> {
    if !(1..=12).contains(&month) {
        return Err(AppError::validation(format!("Invalid month: {month}")));
    }
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::validation(format!("Invalid year: {year}")))
}

fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, AppError> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| AppError::validation(format!("Date out of range: {date}")))
}

fn add_days(date: NaiveDate, days: i64) -> Result<NaiveDate, AppError> {
    date.checked_add_signed(Duration::days(days))
        .ok_or_else(|| AppError::validation(format!("Date out of range: {date}")))
}

fn year_buckets(year: i32) -> Result<Vec<Bucket>, AppError> {
    let january = first_of_month(year, 1)?;
    (0..YEAR_BUCKETS as u32)
        .map(|offset| {
            let start = add_months(january, offset)?;
            let end = add_months(january, offset + 1)?;
            Ok(Bucket {
                label: format!("{:02}", offset + 1),
                start: midnight(start),
                end: midnight(end),
            })
        })
        .collect()
}

/// Four windows of seven days from the 1st. The last window runs from day 22
/// up to the 1st of the next month, whatever the month length.
fn month_buckets(year: i32, month: u32) -> Result<Vec<Bucket>, AppError> {
    let first = first_of_month(year, month)?;
    let next_month = add_months(first, 1)?;
    let mut buckets = Vec::with_capacity(MONTH_BUCKETS);

    for index in 0..MONTH_BUCKETS as i64 {
        let start = add_days(first, index * 7)?;
        let end = if index == MONTH_BUCKETS as i64 - 1 {
            next_month
        } else {
            add_days(first, (index + 1) * 7)?
        };
        buckets.push(Bucket {
            label: format!("Week {}", index + 1),
            start: midnight(start),
            end: midnight(end),
        });
    }

    Ok(buckets)
}

/// Seven daily buckets starting `(week - 1) * 7` days after the 1st. `week`
/// is not range-checked, so late weeks spill into the next month.
fn week_buckets(year: i32, month: u32, week: i32) -> Result<Vec<Bucket>, AppError> {
    let first = first_of_month(year, month)?;
    let week_start = add_days(first, (i64::from(week) - 1) * 7)?;

    (0..WEEK_BUCKETS as i64)
        .map(|offset| {
            let day = add_days(week_start, offset)?;
            let next = add_days(day, 1)?;
            Ok(Bucket {
                label: day.format("%d").to_string(),
                start: midnight(day),
                end: midnight(next),
            })
        })
        .collect()
}
