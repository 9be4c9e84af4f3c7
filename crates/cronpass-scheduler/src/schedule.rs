use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::error::{Result, SchedulerError};
use crate::types::Job;

/// One field of a five-field cron expression: `*` or an exact value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronField {
    Any,
    Exact(u32),
}

impl CronField {
    fn matches(self, value: u32) -> bool {
        match self {
            CronField::Any => true,
            CronField::Exact(expected) => expected == value,
        }
    }
}

/// Parsed five-field cron expression: minute, hour, day-of-month, month,
/// day-of-week. Each field is `*` or an exact integer; ranges, lists, and
/// steps are not supported. Day-of-week runs 0 = Sunday … 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    minute: CronField,
    hour: CronField,
    day_of_month: CronField,
    month: CronField,
    day_of_week: CronField,
}

impl CronSchedule {
    /// Parse an expression like `"0 0 * * 5"` (midnight on Fridays).
    ///
    /// Exactly five whitespace-separated fields are required, each range
    /// checked (minute 0–59, hour 0–23, day-of-month 1–31, month 1–12,
    /// day-of-week 0–6).
    pub fn parse(expression: &str) -> Result<Self> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(SchedulerError::InvalidSchedule {
                expression: expression.to_string(),
                reason: format!("expected 5 fields, got {}", fields.len()),
            });
        }
        Ok(Self {
            minute: parse_field(expression, fields[0], 0, 59)?,
            hour: parse_field(expression, fields[1], 0, 23)?,
            day_of_month: parse_field(expression, fields[2], 1, 31)?,
            month: parse_field(expression, fields[3], 1, 12)?,
            day_of_week: parse_field(expression, fields[4], 0, 6)?,
        })
    }

    /// True when every non-`*` field matches the given instant (UTC).
    pub fn matches(&self, at: DateTime<Utc>) -> bool {
        self.minute.matches(at.minute())
            && self.hour.matches(at.hour())
            && self.day_of_month.matches(at.day())
            && self.month.matches(at.month())
            && self.day_of_week.matches(at.weekday().num_days_from_sunday())
    }
}

impl std::fmt::Display for CronField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CronField::Any => write!(f, "*"),
            CronField::Exact(value) => write!(f, "{value}"),
        }
    }
}

impl std::fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.day_of_month, self.month, self.day_of_week
        )
    }
}

impl std::str::FromStr for CronSchedule {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_field(expression: &str, field: &str, min: u32, max: u32) -> Result<CronField> {
    if field == "*" {
        return Ok(CronField::Any);
    }
    let value: u32 = field
        .parse()
        .map_err(|_| SchedulerError::InvalidSchedule {
            expression: expression.to_string(),
            reason: format!("field {field:?} is not `*` or an integer"),
        })?;
    if value < min || value > max {
        return Err(SchedulerError::InvalidSchedule {
            expression: expression.to_string(),
            reason: format!("field value {value} outside {min}..={max}"),
        });
    }
    Ok(CronField::Exact(value))
}

/// Eligibility + schedule check for one job at `now`. This is the pure half
/// of due-ness; the run-history interval check for schedule-less jobs lives
/// in the engine, which owns the store.
///
/// A job before its start date is never scheduled. A job with a cron
/// expression is scheduled when the fields match `now` AND the seconds
/// elapsed since the start date are an exact multiple of the job's interval.
/// Without a start date the reference instant is `now` itself, which makes
/// the multiple check trivially true — a long-standing quirk kept as-is
/// rather than silently redefined (flagged to stakeholders; the interval
/// compounds with the cron match instead of replacing it).
pub fn is_scheduled(job: &Job, now: DateTime<Utc>) -> bool {
    if let Some(start) = job.start_date {
        if now < start {
            return false;
        }
    }
    match job.schedule {
        Some(ref schedule) => {
            if !schedule.matches(now) {
                return false;
            }
            let reference = job
                .start_date
                .map(|start| start.timestamp())
                .unwrap_or_else(|| now.timestamp());
            (now.timestamp() - reference) % job.interval_seconds as i64 == 0
        }
        None => true,
    }
}
