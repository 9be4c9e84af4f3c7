use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Result, SchedulerError};

/// Initialise the run-history schema in `conn`.
///
/// Creates the `run_history` table (idempotent). One row per job, keyed by
/// name; `last_run` holds epoch seconds, with 0 meaning "never run".
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS run_history (
            job_name    TEXT    NOT NULL PRIMARY KEY,
            last_run    INTEGER
        ) STRICT;
        ",
    )
    .map_err(SchedulerError::StoreWrite)?;
    Ok(())
}

/// Durable job-name → last-run mapping.
///
/// No caching: every call goes to the database, so due-ness always reflects
/// current durable state, including writes from a previous process.
pub struct RunHistory {
    conn: Connection,
}

impl RunHistory {
    /// Wrap a connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { conn })
    }

    /// Insert a row with `last_run = 0` unless one already exists.
    /// Safe to call on every startup.
    pub fn ensure_entry(&self, job_name: &str) -> Result<()> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO run_history (job_name, last_run) VALUES (?1, 0)",
                [job_name],
            )
            .map_err(SchedulerError::StoreWrite)?;
        if inserted > 0 {
            debug!(job = %job_name, "created run-history entry");
        }
        Ok(())
    }

    /// The stored last-run epoch, or `None` when the job has never run.
    ///
    /// A missing row, a NULL value, and a stored 0 all mean "never run".
    /// Only a failing query is an error ([`SchedulerError::StoreRead`]) —
    /// an empty result is a normal answer, not a failure.
    pub fn last_run(&self, job_name: &str) -> Result<Option<i64>> {
        let row: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT last_run FROM run_history WHERE job_name = ?1",
                [job_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(SchedulerError::StoreRead)?;

        Ok(match row {
            Some(Some(epoch)) if epoch > 0 => Some(epoch),
            _ => None,
        })
    }

    /// Overwrite the stored timestamp for `job_name`.
    ///
    /// Callers are expected to have run [`ensure_entry`](Self::ensure_entry)
    /// first; updating a missing row affects nothing and is not an error.
    pub fn set_last_run(&self, job_name: &str, epoch: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE run_history SET last_run = ?2 WHERE job_name = ?1",
                rusqlite::params![job_name, epoch],
            )
            .map_err(SchedulerError::StoreWrite)?;
        Ok(())
    }
}
