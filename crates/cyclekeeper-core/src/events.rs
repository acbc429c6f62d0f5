use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::{CycleId, CycleStatus};

/// Every state change in the system produces an Event.
/// The presentation layer renders them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    CycleStarted {
        cycle_id: CycleId,
        task: String,
        duration_minutes: u32,
        at: DateTime<Utc>,
    },
    CycleInterrupted {
        cycle_id: CycleId,
        /// Seconds counted down before the interrupt.
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    CycleFinished {
        cycle_id: CycleId,
        at: DateTime<Utc>,
    },
    /// Full view of the active countdown at a point in time.
    StateSnapshot {
        active_cycle_id: Option<CycleId>,
        task: Option<String>,
        status: Option<CycleStatus>,
        elapsed_secs: u64,
        /// `None` when no cycle is active.
        remaining_secs: Option<u64>,
        total_secs: u64,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn cycle_id(&self) -> Option<&CycleId> {
        match self {
            Event::CycleStarted { cycle_id, .. }
            | Event::CycleInterrupted { cycle_id, .. }
            | Event::CycleFinished { cycle_id, .. } => Some(cycle_id),
            Event::StateSnapshot {
                active_cycle_id, ..
            } => active_cycle_id.as_ref(),
        }
    }
}
