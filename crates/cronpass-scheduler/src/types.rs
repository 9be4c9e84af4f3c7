use std::fmt;

use chrono::{DateTime, Utc};

use crate::schedule::CronSchedule;

/// What a job action reports back. The scheduler ignores any payload; an
/// `Err` only affects logging and the pass summary.
pub type ActionResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A job's executable behaviour: a zero-argument closure bound at
/// configuration time. Actions are first-class values, never resolved by
/// name at run time.
pub type JobAction = Box<dyn Fn() -> ActionResult>;

/// A configured job. Built in code before a pass, immutable at runtime.
///
/// `name` is the primary key into run history and must be unique across the
/// job set ([`crate::Scheduler::new`] enforces this).
pub struct Job {
    pub name: String,
    pub action: JobAction,
    /// Minimum seconds between runs; for cron jobs, the modulus applied on
    /// top of the field match (see [`crate::schedule::is_scheduled`]).
    pub interval_seconds: u64,
    /// The job is never due before this instant.
    pub start_date: Option<DateTime<Utc>>,
    pub schedule: Option<CronSchedule>,
    /// Informational only; shown by `cronpass list`.
    pub description: String,
}

impl Job {
    /// A job that runs every minute, starting immediately. Adjust with the
    /// builder methods.
    pub fn new(name: impl Into<String>, action: JobAction) -> Self {
        Self {
            name: name.into(),
            action,
            interval_seconds: 60,
            start_date: None,
            schedule: None,
            description: String::new(),
        }
    }

    pub fn every(mut self, seconds: u64) -> Self {
        self.interval_seconds = seconds;
        self
    }

    pub fn starting(mut self, at: DateTime<Utc>) -> Self {
        self.start_date = Some(at);
        self
    }

    pub fn cron(mut self, schedule: CronSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }
}

// Manual impl because the boxed action closure is not Debug.
impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("interval_seconds", &self.interval_seconds)
            .field("start_date", &self.start_date)
            .field("schedule", &self.schedule)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Outcome of one evaluate-and-run pass.
///
/// `executed` holds the names of jobs whose action completed without error;
/// failures are listed separately so the caller can map the pass to a
/// distinct exit status per failure class.
#[derive(Debug, Default)]
pub struct PassSummary {
    /// Jobs whose action ran and returned Ok, in execution order.
    pub executed: Vec<String>,
    /// Jobs evaluated but not due.
    pub skipped: usize,
    /// Jobs whose action returned an error (isolated; the pass continued).
    pub action_failures: Vec<String>,
    /// Jobs that ran but whose last-run write failed.
    pub write_failures: Vec<String>,
}

impl PassSummary {
    /// True when nothing went wrong (a pass where nothing was due is clean).
    pub fn clean(&self) -> bool {
        self.action_failures.is_empty() && self.write_failures.is_empty()
    }
}
