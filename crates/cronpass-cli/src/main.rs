//! `cronpass` — one evaluate-and-run pass per invocation.
//!
//! Meant to be invoked by an external trigger (a crontab line, a systemd
//! timer) at sub-minute granularity; the process evaluates the job table
//! once and exits. Exit codes, so a monitor can tell failure classes apart:
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Pass completed (including "nothing was due")   |
//! | 1    | Trigger disabled in config, `--force` not given |
//! | 2    | Missing or incorrect trigger password          |
//! | 3    | Store/scheduler error — the pass was aborted   |
//! | 4    | One or more job actions failed                 |
//! | 5    | Job(s) ran but a last-run write failed         |
//!
//! Known limitation: two overlapping invocations can double-run a job.
//! Callers needing mutual exclusion must layer an external single-instance
//! guard (e.g. `flock`) around the trigger.

mod jobs;

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cronpass_core::config::TriggerConfig;
use cronpass_core::{duration::secs_to_human, CronpassConfig};
use cronpass_scheduler::{PassSummary, RunHistory, Scheduler};
use tracing::{error, info, warn};

const EXIT_DISABLED: u8 = 1;
const EXIT_BAD_PASSWORD: u8 = 2;
const EXIT_STORE_ERROR: u8 = 3;
const EXIT_ACTION_FAILED: u8 = 4;
const EXIT_WRITE_FAILED: u8 = 5;

#[derive(Parser)]
#[command(name = "cronpass", version, about = "Minimal periodic job scheduler: one pass per invocation")]
struct Cli {
    /// Path to configuration file (default: ~/.cronpass/cronpass.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate the job table once and run whatever is due
    Run {
        /// Trigger password, when one is configured
        #[arg(value_name = "PASSWORD")]
        password: Option<String>,

        /// Manual run: ignore the disabled flag and execute every job
        /// unconditionally, bypassing due-ness checks
        #[arg(long)]
        force: bool,
    },
    /// Create run-history rows for every configured job, running nothing
    Setup,
    /// Print the configured job table
    List,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cronpass=info,cronpass_scheduler=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: explicit path > CRONPASS_CONFIG env > ~/.cronpass/cronpass.toml
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("CRONPASS_CONFIG").ok());
    let config = CronpassConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        CronpassConfig::default()
    });

    match cli.command {
        Command::Run { password, force } => cmd_run(&config, password.as_deref(), force),
        Command::Setup => cmd_setup(&config),
        Command::List => cmd_list(&config),
    }
}

/// Outcome of the trigger gate, separated from process exit so the
/// branches can be tested directly.
#[derive(Debug, PartialEq, Eq)]
enum Gate {
    Allowed,
    Disabled,
    BadPassword,
}

/// Decide whether a `run` invocation may proceed.
///
/// `--force` marks a manual run and overrides only the disabled flag; a
/// configured password is required either way.
fn check_trigger(trigger: &TriggerConfig, password: Option<&str>, force: bool) -> Gate {
    if trigger.disabled && !force {
        return Gate::Disabled;
    }
    if let Some(expected) = trigger.password.as_deref() {
        if password != Some(expected) {
            return Gate::BadPassword;
        }
    }
    Gate::Allowed
}

/// Map a completed pass to its exit code: action failures win over write
/// failures; a clean pass (even with nothing due) is success.
fn pass_exit_code(summary: &PassSummary) -> u8 {
    if !summary.action_failures.is_empty() {
        EXIT_ACTION_FAILED
    } else if !summary.write_failures.is_empty() {
        EXIT_WRITE_FAILED
    } else {
        0
    }
}

fn cmd_run(config: &CronpassConfig, password: Option<&str>, force: bool) -> ExitCode {
    match check_trigger(&config.trigger, password, force) {
        Gate::Disabled => {
            warn!("trigger is disabled in config; refusing scheduled pass");
            return ExitCode::from(EXIT_DISABLED);
        }
        Gate::BadPassword => {
            error!("missing or incorrect trigger password");
            return ExitCode::from(EXIT_BAD_PASSWORD);
        }
        Gate::Allowed => {}
    }

    let scheduler = match build_scheduler(config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("scheduler setup failed: {e:#}");
            return ExitCode::from(EXIT_STORE_ERROR);
        }
    };

    match scheduler.run(force) {
        Ok(summary) => {
            if !summary.clean() {
                error!(
                    failed = ?summary.action_failures,
                    unrecorded = ?summary.write_failures,
                    "pass finished with failures"
                );
            }
            match pass_exit_code(&summary) {
                0 => ExitCode::SUCCESS,
                code => ExitCode::from(code),
            }
        }
        Err(e) => {
            error!("pass aborted: {e}");
            ExitCode::from(EXIT_STORE_ERROR)
        }
    }
}

fn cmd_setup(config: &CronpassConfig) -> ExitCode {
    // Construction already ensures one history row per job.
    match build_scheduler(config) {
        Ok(scheduler) => {
            info!(jobs = scheduler.jobs().len(), "run-history entries ensured");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("setup failed: {e:#}");
            ExitCode::from(EXIT_STORE_ERROR)
        }
    }
}

fn cmd_list(config: &CronpassConfig) -> ExitCode {
    let jobs = match jobs::jobs(config) {
        Ok(jobs) => jobs,
        Err(e) => {
            error!("bad job table: {e}");
            return ExitCode::from(EXIT_STORE_ERROR);
        }
    };
    if jobs.is_empty() {
        println!("no jobs configured");
        return ExitCode::SUCCESS;
    }
    println!("{:<24} {:<14} {:<36} DESCRIPTION", "NAME", "SCHEDULE", "INTERVAL");
    for job in &jobs {
        let schedule = job
            .schedule
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<14} {:<36} {}",
            job.name,
            schedule,
            secs_to_human(job.interval_seconds),
            job.description
        );
    }
    ExitCode::SUCCESS
}

fn build_scheduler(config: &CronpassConfig) -> anyhow::Result<Scheduler> {
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening run-history database");

    let conn = rusqlite::Connection::open(db_path)
        .with_context(|| format!("opening {db_path}"))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    let history = RunHistory::new(conn)?;
    let jobs = jobs::jobs(config)?;
    Ok(Scheduler::new(history, jobs)?)
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(disabled: bool, password: Option<&str>) -> TriggerConfig {
        TriggerConfig {
            disabled,
            password: password.map(String::from),
        }
    }

    #[test]
    fn open_trigger_allows_scheduled_pass() {
        assert_eq!(check_trigger(&trigger(false, None), None, false), Gate::Allowed);
    }

    #[test]
    fn disabled_trigger_refuses_scheduled_pass() {
        assert_eq!(check_trigger(&trigger(true, None), None, false), Gate::Disabled);
    }

    #[test]
    fn force_overrides_only_the_disabled_flag() {
        assert_eq!(check_trigger(&trigger(true, None), None, true), Gate::Allowed);
        // A configured password is still required on a manual run.
        assert_eq!(
            check_trigger(&trigger(true, Some("hunter2")), None, true),
            Gate::BadPassword
        );
    }

    #[test]
    fn password_must_match_exactly() {
        let t = trigger(false, Some("hunter2"));
        assert_eq!(check_trigger(&t, None, false), Gate::BadPassword);
        assert_eq!(check_trigger(&t, Some("wrong"), false), Gate::BadPassword);
        assert_eq!(check_trigger(&t, Some("hunter2"), false), Gate::Allowed);
    }

    #[test]
    fn exit_code_ranks_failure_classes() {
        let clean = PassSummary::default();
        assert_eq!(pass_exit_code(&clean), 0);

        let mut writes = PassSummary::default();
        writes.write_failures.push("job".into());
        assert_eq!(pass_exit_code(&writes), EXIT_WRITE_FAILED);

        let mut both = PassSummary::default();
        both.write_failures.push("job".into());
        both.action_failures.push("job".into());
        assert_eq!(pass_exit_code(&both), EXIT_ACTION_FAILED);
    }
}
