//! The job table.
//!
//! Jobs are plain code: a name, a boxed closure, and a schedule, listed in
//! the order they should be considered each pass. Actions are bound here at
//! configuration time; nothing is resolved by name at run time.

use cronpass_core::config::{CronpassConfig, HeartbeatConfig};
use cronpass_scheduler::{Job, JobAction, Result};

/// Build the job table for this installation.
pub fn jobs(config: &CronpassConfig) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();

    if config.heartbeat.enabled {
        jobs.push(heartbeat_job(&config.heartbeat));
    }

    // Add new jobs here. A fortnightly example — midnight on every other
    // Friday, counted from the start date:
    //
    //     use chrono::TimeZone;
    //     use cronpass_scheduler::CronSchedule;
    //
    //     jobs.push(
    //         Job::new("fortnightly-report", Box::new(send_report))
    //             .every(14 * 86_400)
    //             .starting(chrono::Utc.with_ymd_and_hms(2023, 1, 6, 0, 0, 0).unwrap())
    //             .cron(CronSchedule::parse("0 0 * * 5")?)
    //             .describe("Mails the fortnightly report."),
    //     );

    Ok(jobs)
}

/// Built-in liveness job: writes the current time to a file so an operator
/// can see at a glance that passes are being triggered.
fn heartbeat_job(config: &HeartbeatConfig) -> Job {
    let path = config.path.clone();
    let action: JobAction = Box::new(move || {
        std::fs::write(&path, format!("{}\n", chrono::Utc::now().to_rfc3339()))?;
        Ok(())
    });
    Job::new("heartbeat", action)
        .every(config.every)
        .describe("Writes the current time to the heartbeat file.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_disabled_by_default() {
        let config = CronpassConfig::default();
        assert!(jobs(&config).unwrap().is_empty());
    }

    #[test]
    fn heartbeat_job_writes_the_file() {
        let dir = std::env::temp_dir().join("cronpass-heartbeat-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("beat.txt");

        let mut config = CronpassConfig::default();
        config.heartbeat.enabled = true;
        config.heartbeat.path = path.to_string_lossy().into_owned();
        config.heartbeat.every = 30;

        let jobs = jobs(&config).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "heartbeat");
        assert_eq!(jobs[0].interval_seconds, 30);

        (jobs[0].action)().unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.trim().contains('T')); // RFC 3339 timestamp

        std::fs::remove_dir_all(&dir).ok();
    }
}
