use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Opaque cycle identifier. Never reused once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(String);

impl CycleId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CycleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CycleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive range of accepted cycle durations, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationBounds {
    min_minutes: u32,
    max_minutes: u32,
}

impl DurationBounds {
    pub const DEFAULT_MIN_MINUTES: u32 = 5;
    pub const DEFAULT_MAX_MINUTES: u32 = 60;
    /// Longest duration any configuration may allow: one day.
    pub const LIMIT_MINUTES: u32 = 24 * 60;

    /// Returns `None` when `min` is zero, `min` is greater than `max`, or
    /// `max` exceeds [`Self::LIMIT_MINUTES`].
    pub fn new(min_minutes: u32, max_minutes: u32) -> Option<Self> {
        if min_minutes == 0 || min_minutes > max_minutes || max_minutes > Self::LIMIT_MINUTES
        {
            return None;
        }
        Some(Self {
            min_minutes,
            max_minutes,
        })
    }

    pub fn min_minutes(&self) -> u32 {
        self.min_minutes
    }

    pub fn max_minutes(&self) -> u32 {
        self.max_minutes
    }

    pub fn contains(&self, minutes: u32) -> bool {
        (self.min_minutes..=self.max_minutes).contains(&minutes)
    }

    pub fn check(&self, minutes: u32) -> Result<(), ValidationError> {
        if self.contains(minutes) {
            Ok(())
        } else {
            Err(ValidationError::DurationOutOfRange {
                minutes,
                min: self.min_minutes,
                max: self.max_minutes,
            })
        }
    }
}

impl Default for DurationBounds {
    fn default() -> Self {
        Self {
            min_minutes: Self::DEFAULT_MIN_MINUTES,
            max_minutes: Self::DEFAULT_MAX_MINUTES,
        }
    }
}

/// Lifecycle status of a cycle, derived from its terminal timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    InProgress,
    Interrupted,
    Finished,
}

impl CycleStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CycleStatus::InProgress => "in progress",
            CycleStatus::Interrupted => "interrupted",
            CycleStatus::Finished => "finished",
        }
    }
}

/// One timer run.
///
/// Fields are read-only from outside the crate; only the transition engine
/// stamps the terminal timestamps, and each can be set at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    id: CycleId,
    task: String,
    duration_minutes: u32,
    start_time: DateTime<Utc>,
    #[serde(default)]
    interrupted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    finished_at: Option<DateTime<Utc>>,
}

impl Cycle {
    /// Build a new in-progress cycle.
    ///
    /// The task label is trimmed and must not be empty; the duration must
    /// lie within `bounds`.
    pub fn new(
        id: CycleId,
        task: &str,
        duration_minutes: u32,
        start_time: DateTime<Utc>,
        bounds: DurationBounds,
    ) -> Result<Self, ValidationError> {
        let task = task.trim();
        if task.is_empty() {
            return Err(ValidationError::EmptyTask);
        }
        bounds.check(duration_minutes)?;
        Ok(Self {
            id,
            task: task.to_string(),
            duration_minutes,
            start_time,
            interrupted_at: None,
            finished_at: None,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> &CycleId {
        &self.id
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn interrupted_at(&self) -> Option<DateTime<Utc>> {
        self.interrupted_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Full countdown length in seconds.
    pub fn total_secs(&self) -> u64 {
        u64::from(self.duration_minutes).saturating_mul(60)
    }

    pub fn is_terminal(&self) -> bool {
        self.interrupted_at.is_some() || self.finished_at.is_some()
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn status(&self) -> CycleStatus {
        match (self.interrupted_at, self.finished_at) {
            (Some(_), _) => CycleStatus::Interrupted,
            (None, Some(_)) => CycleStatus::Finished,
            (None, None) => CycleStatus::InProgress,
        }
    }

    /// When the cycle reached its terminal state, if it has.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.interrupted_at.or(self.finished_at)
    }

    // ── Terminal stamps (engine only) ────────────────────────────────

    /// Returns `false` and leaves the cycle untouched if it is already terminal.
    pub(crate) fn mark_interrupted(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.interrupted_at = Some(at);
        true
    }

    /// Returns `false` and leaves the cycle untouched if it is already terminal.
    pub(crate) fn mark_finished(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.finished_at = Some(at);
        true
    }
}
