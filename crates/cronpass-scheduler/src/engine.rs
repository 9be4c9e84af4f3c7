use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::{
    db::RunHistory,
    error::{Result, SchedulerError},
    schedule::is_scheduled,
    types::{Job, PassSummary},
};

/// Core scheduler: evaluates the configured job list against run history and
/// executes whatever is due, one synchronous pass at a time.
pub struct Scheduler {
    history: RunHistory,
    jobs: Vec<Job>,
}

impl Scheduler {
    /// Validate the job set and ensure every job has a history row.
    ///
    /// Rejects duplicate names (history is keyed by name) and zero
    /// intervals. Entry creation runs once here, before any due-ness
    /// evaluation; [`create_entries`](Self::create_entries) stays callable
    /// for explicit setup passes.
    pub fn new(history: RunHistory, jobs: Vec<Job>) -> Result<Self> {
        let mut seen = HashSet::new();
        for job in &jobs {
            if job.interval_seconds == 0 {
                return Err(SchedulerError::ZeroInterval(job.name.clone()));
            }
            if !seen.insert(job.name.as_str()) {
                return Err(SchedulerError::DuplicateJob(job.name.clone()));
            }
        }
        let scheduler = Self { history, jobs };
        scheduler.create_entries()?;
        Ok(scheduler)
    }

    /// Insert a history row for every configured job. Idempotent; existing
    /// timestamps are left untouched.
    pub fn create_entries(&self) -> Result<()> {
        for job in &self.jobs {
            self.history.ensure_entry(&job.name)?;
        }
        Ok(())
    }

    /// The configured job list, in execution order.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// One evaluate-and-run pass at the current instant.
    ///
    /// `force_run` bypasses every due-ness check and executes all jobs.
    pub fn run(&self, force_run: bool) -> Result<PassSummary> {
        self.run_at(Utc::now(), force_run)
    }

    /// The pass itself, with an injectable instant. `now` is computed once
    /// and shared by every job so a pass straddling a minute boundary still
    /// evaluates consistently.
    ///
    /// Failure policy: a history read error aborts the pass; a failing job
    /// action is logged and counted but later jobs still run; a history
    /// write error after a run is logged and counted but aborts nothing.
    pub(crate) fn run_at(&self, now: DateTime<Utc>, force_run: bool) -> Result<PassSummary> {
        let mut summary = PassSummary::default();
        let mut cache = PassCache::default();

        for job in &self.jobs {
            let due = force_run || self.is_due(job, now, &mut cache)?;
            if !due {
                debug!(job = %job.name, "not due");
                summary.skipped += 1;
                continue;
            }

            info!(job = %job.name, forced = force_run, "executing job");
            match (job.action)() {
                Ok(()) => summary.executed.push(job.name.clone()),
                Err(e) => {
                    error!(job = %job.name, error = %e, "job action failed");
                    summary.action_failures.push(job.name.clone());
                }
            }

            // The attempt is recorded whether or not the action succeeded:
            // the interval measures spacing between starts, not successes.
            if let Err(e) = self.history.set_last_run(&job.name, now.timestamp()) {
                error!(job = %job.name, error = %e, "failed to record last run");
                summary.write_failures.push(job.name.clone());
            }
        }

        info!(
            executed = summary.executed.len(),
            skipped = summary.skipped,
            failed = summary.action_failures.len(),
            "pass complete"
        );
        Ok(summary)
    }

    /// Full due-ness decision for one job.
    ///
    /// Cron jobs are due purely on the instant match: run history is not
    /// consulted, so a second pass within the same matching minute runs the
    /// job again. Interval-only jobs are due when never run or when at
    /// least `interval_seconds` have elapsed since the recorded last run.
    fn is_due(&self, job: &Job, now: DateTime<Utc>, cache: &mut PassCache) -> Result<bool> {
        if !is_scheduled(job, now) {
            return Ok(false);
        }
        if job.schedule.is_some() {
            return Ok(true);
        }
        Ok(match cache.last_run(&self.history, &job.name)? {
            None => true,
            Some(last) => now.timestamp() - last >= job.interval_seconds as i64,
        })
    }
}

/// History reads memoised for the duration of one pass. Owned by `run_at`
/// and dropped when the pass ends, so no state leaks between passes.
#[derive(Default)]
struct PassCache {
    entries: HashMap<String, Option<i64>>,
}

impl PassCache {
    fn last_run(&mut self, history: &RunHistory, job_name: &str) -> Result<Option<i64>> {
        if let Some(cached) = self.entries.get(job_name) {
            return Ok(*cached);
        }
        let value = history.last_run(job_name)?;
        self.entries.insert(job_name.to_string(), value);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::TimeZone;
    use rusqlite::Connection;

    use super::*;
    use crate::schedule::CronSchedule;
    use crate::types::JobAction;

    fn mem_history() -> RunHistory {
        RunHistory::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn counting(counter: &Arc<AtomicUsize>) -> JobAction {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn failing() -> JobAction {
        Box::new(|| Err("boom".into()))
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn never_run_job_is_due_immediately() {
        let runs = Arc::new(AtomicUsize::new(0));
        let jobs = vec![Job::new("first", counting(&runs)).every(3600)];
        let scheduler = Scheduler::new(mem_history(), jobs).unwrap();

        let summary = scheduler.run_at(at(2023, 6, 1, 12, 0, 0), false).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(summary.executed, vec!["first".to_string()]);
        assert!(summary.clean());
    }

    #[test]
    fn interval_spacing_is_wall_clock_age() {
        let runs = Arc::new(AtomicUsize::new(0));
        let jobs = vec![Job::new("minutely", counting(&runs)).every(60)];
        let scheduler = Scheduler::new(mem_history(), jobs).unwrap();

        let t0 = at(2023, 6, 1, 12, 0, 0);
        scheduler.run_at(t0, false).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // 59 seconds later: not due. Exactly 60: due.
        let summary = scheduler.run_at(at(2023, 6, 1, 12, 0, 59), false).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        scheduler.run_at(at(2023, 6, 1, 12, 1, 0), false).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn future_start_date_is_never_due() {
        let runs = Arc::new(AtomicUsize::new(0));
        let jobs = vec![Job::new("later", counting(&runs))
            .every(60)
            .starting(at(2023, 6, 2, 12, 0, 0))];
        let scheduler = Scheduler::new(mem_history(), jobs).unwrap();

        let summary = scheduler.run_at(at(2023, 6, 1, 12, 0, 0), false).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn force_run_bypasses_all_checks() {
        let runs = Arc::new(AtomicUsize::new(0));
        let jobs = vec![
            // Future start date AND a cron expression that cannot match noon.
            Job::new("blocked", counting(&runs))
                .every(60)
                .starting(at(2030, 1, 1, 0, 0, 0))
                .cron(CronSchedule::parse("0 0 * * 5").unwrap()),
            Job::new("plain", counting(&runs)).every(60),
        ];
        let scheduler = Scheduler::new(mem_history(), jobs).unwrap();

        let summary = scheduler.run_at(at(2023, 6, 1, 12, 0, 0), true).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(summary.executed.len(), 2);
        assert_eq!(summary.skipped, 0);
    }

    #[test]
    fn cron_job_ignores_run_history() {
        // Two passes inside the same matching minute both run the job:
        // the cron path never consults last_run.
        let runs = Arc::new(AtomicUsize::new(0));
        let jobs = vec![Job::new("chatty", counting(&runs))
            .every(60)
            .cron(CronSchedule::parse("* * * * *").unwrap())];
        let scheduler = Scheduler::new(mem_history(), jobs).unwrap();

        scheduler.run_at(at(2023, 6, 1, 12, 0, 0), false).unwrap();
        scheduler.run_at(at(2023, 6, 1, 12, 0, 30), false).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cron_job_skipped_outside_matching_instant() {
        let runs = Arc::new(AtomicUsize::new(0));
        let jobs = vec![Job::new("friday-midnight", counting(&runs))
            .every(60)
            .cron(CronSchedule::parse("0 0 * * 5").unwrap())];
        let scheduler = Scheduler::new(mem_history(), jobs).unwrap();

        // A Thursday afternoon: nothing happens.
        let summary = scheduler.run_at(at(2023, 1, 5, 15, 30, 0), false).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(summary.skipped, 1);

        // Friday 2023-01-06 at midnight: due.
        scheduler.run_at(at(2023, 1, 6, 0, 0, 0), false).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_action_does_not_block_later_jobs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let jobs = vec![
            Job::new("broken", failing()).every(60),
            Job::new("healthy", counting(&runs)).every(60),
        ];
        let scheduler = Scheduler::new(mem_history(), jobs).unwrap();

        let summary = scheduler.run_at(at(2023, 6, 1, 12, 0, 0), false).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(summary.action_failures, vec!["broken".to_string()]);
        assert_eq!(summary.executed, vec!["healthy".to_string()]);
        assert!(!summary.clean());
    }

    #[test]
    fn failed_run_still_records_last_run() {
        let jobs = vec![Job::new("broken", failing()).every(60)];
        let scheduler = Scheduler::new(mem_history(), jobs).unwrap();

        scheduler.run_at(at(2023, 6, 1, 12, 0, 0), false).unwrap();

        // 30 seconds later the job is inside its interval, so the failed
        // attempt must have been recorded as a run.
        let summary = scheduler.run_at(at(2023, 6, 1, 12, 0, 30), false).unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(summary.action_failures.is_empty());
    }

    #[test]
    fn duplicate_job_names_are_rejected() {
        let jobs = vec![
            Job::new("twin", Box::new(|| Ok(())) as JobAction).every(60),
            Job::new("twin", Box::new(|| Ok(())) as JobAction).every(120),
        ];
        match Scheduler::new(mem_history(), jobs).err() {
            Some(SchedulerError::DuplicateJob(name)) => assert_eq!(name, "twin"),
            other => panic!("expected DuplicateJob, got {other:?}"),
        }
    }

    #[test]
    fn zero_interval_is_rejected() {
        let jobs = vec![Job::new("instant", Box::new(|| Ok(())) as JobAction).every(0)];
        assert!(matches!(
            Scheduler::new(mem_history(), jobs),
            Err(SchedulerError::ZeroInterval(_))
        ));
    }

    // A file-backed database plus a second connection holding BEGIN
    // EXCLUSIVE: every later statement on the scheduler's own connection
    // fails with SQLITE_BUSY, forcing a genuine store failure. Construction
    // happens first, while the database is still unlocked.
    fn locked_scheduler(name: &str, jobs: Vec<Job>) -> (Scheduler, Connection, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("cronpass-engine-{name}.db"));
        std::fs::remove_file(&path).ok();

        let history = RunHistory::new(Connection::open(&path).unwrap()).unwrap();
        let scheduler = Scheduler::new(history, jobs).unwrap();

        let blocker = Connection::open(&path).unwrap();
        blocker.execute_batch("BEGIN EXCLUSIVE;").unwrap();
        (scheduler, blocker, path)
    }

    #[test]
    fn history_read_failure_aborts_the_pass() {
        let runs = Arc::new(AtomicUsize::new(0));
        // No cron expression: due-ness must consult run history.
        let jobs = vec![Job::new("victim", counting(&runs)).every(60)];
        let (scheduler, blocker, path) = locked_scheduler("read-fail", jobs);

        let result = scheduler.run_at(at(2023, 6, 1, 12, 0, 0), false);
        assert!(matches!(result, Err(SchedulerError::StoreRead(_))));
        // The pass aborted before running anything.
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        drop(blocker);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn history_write_failure_does_not_abort_the_pass() {
        let runs = Arc::new(AtomicUsize::new(0));
        // The cron path never reads history, so the job still comes up due
        // and executes; only the last-run write afterwards fails.
        let jobs = vec![Job::new("victim", counting(&runs))
            .every(60)
            .cron(CronSchedule::parse("* * * * *").unwrap())];
        let (scheduler, blocker, path) = locked_scheduler("write-fail", jobs);

        let summary = scheduler.run_at(at(2023, 6, 1, 12, 0, 0), false).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(summary.executed, vec!["victim".to_string()]);
        assert_eq!(summary.write_failures, vec!["victim".to_string()]);
        assert!(summary.action_failures.is_empty());
        assert!(!summary.clean());

        drop(blocker);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn create_entries_is_idempotent() {
        let jobs = vec![Job::new("steady", Box::new(|| Ok(())) as JobAction).every(60)];
        let scheduler = Scheduler::new(mem_history(), jobs).unwrap();

        scheduler.run_at(at(2023, 6, 1, 12, 0, 0), false).unwrap();
        scheduler.create_entries().unwrap();

        // Re-ensuring must not reset the recorded run: still inside the
        // interval, so still skipped.
        let summary = scheduler.run_at(at(2023, 6, 1, 12, 0, 30), false).unwrap();
        assert_eq!(summary.skipped, 1);
    }
}
