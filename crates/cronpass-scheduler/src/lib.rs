//! `cronpass-scheduler` — single-pass job scheduler with SQLite-backed run history.
//!
//! # Overview
//!
//! A [`Scheduler`] holds a fixed, ordered list of [`Job`]s and a [`RunHistory`]
//! (one SQLite row per job recording the last run as epoch seconds). Each call
//! to [`Scheduler::run`] is one evaluate-and-run pass: every job is checked for
//! due-ness at a single instant, due jobs execute synchronously in configured
//! order, and their last-run timestamps are written back. There is no internal
//! clock loop; an external trigger is expected to invoke a pass periodically.
//!
//! # Due-ness rules
//!
//! | Job shape                  | Due when                                          |
//! |----------------------------|---------------------------------------------------|
//! | start date in the future   | never                                             |
//! | interval only              | never run, or `now - last_run >= interval`        |
//! | cron expression            | fields match `now`, and elapsed-since-start is a multiple of the interval |
//!
//! Two behaviours of the cron path are deliberate and documented on
//! [`schedule::is_scheduled`]: run history is not consulted (re-invocation
//! within a matching minute re-runs the job), and without a start date the
//! interval multiple check is trivially true.
//!
//! Overlapping passes from two processes can double-run a job; callers that
//! need mutual exclusion must hold an external single-instance lock.

pub mod db;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod types;

pub use db::RunHistory;
pub use engine::Scheduler;
pub use error::{Result, SchedulerError};
pub use schedule::CronSchedule;
pub use types::{Job, JobAction, PassSummary};
