//! Human-readable duration formatting for log lines and `list` output.

const DAY: u64 = 86_400;
const HOUR: u64 = 3_600;
const MINUTE: u64 = 60;

/// Format a number of seconds as e.g. `"1 day, 2 hours, 5 minutes, 0 seconds"`.
///
/// Units run largest to smallest. The seconds part is always present; larger
/// units appear only when the duration reaches them, and every unit below the
/// largest shown is included so the output reads as a full breakdown.
pub fn secs_to_human(seconds: u64) -> String {
    let days = seconds / DAY;
    let hours = (seconds % DAY) / HOUR;
    let minutes = (seconds % HOUR) / MINUTE;
    let secs = seconds % MINUTE;

    let mut parts = Vec::with_capacity(4);
    if seconds >= DAY {
        parts.push(unit(days, "day"));
    }
    if seconds >= HOUR {
        parts.push(unit(hours, "hour"));
    }
    if seconds >= MINUTE {
        parts.push(unit(minutes, "minute"));
    }
    parts.push(unit(secs, "second"));

    parts.join(", ")
}

fn unit(n: u64, name: &str) -> String {
    if n == 1 {
        format!("1 {name}")
    } else {
        format!("{n} {name}s")
    }
}
