use chrono::{DateTime, Utc};
use cyclekeeper_core::{Clock, Cycle};
use serde::Serialize;

use super::open_session;

#[derive(Serialize)]
struct HistoryRow<'a> {
    #[serde(flatten)]
    cycle: &'a Cycle,
    status: cyclekeeper_core::CycleStatus,
}

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, _config) = open_session()?;
    // Finish a cycle that ran out since the last run before listing it.
    session.tick()?;

    if json {
        let rows: Vec<_> = session
            .history()
            .iter()
            .map(|cycle| HistoryRow {
                cycle,
                status: cycle.status(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if session.history().is_empty() {
        println!("no cycles yet");
        return Ok(());
    }

    let now = session.clock().now();
    for cycle in session.history() {
        println!(
            "{:<12} {:>3} min  {:<18} {}",
            cycle.status().label(),
            cycle.duration_minutes(),
            format_ago(cycle.start_time(), now),
            cycle.task()
        );
    }

    let summary = session.registry().summary();
    println!(
        "\n{} cycles: {} finished ({} min), {} interrupted, {} in progress",
        summary.total,
        summary.finished,
        summary.finished_minutes,
        summary.interrupted,
        summary.in_progress
    );
    Ok(())
}

/// Coarse relative time, e.g. "3 minutes ago".
fn format_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    let (value, unit) = match secs {
        0..=59 => return "just now".to_string(),
        60..=3599 => (secs / 60, "minute"),
        3600..=86_399 => (secs / 3600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    let plural = if value == 1 { "" } else { "s" };
    format!("{value} {unit}{plural} ago")
}
