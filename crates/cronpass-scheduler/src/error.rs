use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
///
/// Read and write failures against the run-history table are distinct
/// variants because they carry different policies: a failed read aborts the
/// pass (guessing last-run state would re-run everything), while a failed
/// write after a job has executed is reported but never undoes the run.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Run-history read failed. Fatal for the current pass.
    #[error("History read failed: {0}")]
    StoreRead(#[source] rusqlite::Error),

    /// Run-history write failed.
    #[error("History write failed: {0}")]
    StoreWrite(#[source] rusqlite::Error),

    /// The cron expression could not be parsed.
    #[error("Invalid cron expression {expression:?}: {reason}")]
    InvalidSchedule { expression: String, reason: String },

    /// Two configured jobs share a name; history is keyed by name.
    #[error("Duplicate job name: {0}")]
    DuplicateJob(String),

    /// A job was configured with an interval of zero seconds.
    #[error("Job {0:?} has a zero interval")]
    ZeroInterval(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
