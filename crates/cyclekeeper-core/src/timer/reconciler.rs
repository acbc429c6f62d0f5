//! Countdown reconciler.
//!
//! Every reading is recomputed from the armed cycle's `start_time` and the
//! current wall clock, never by decrementing a counter, so a countdown stays
//! correct across suspended processes, restarts and missed ticks.
//!
//! The reconciler emits [`Action::FinishActiveCycle`] at most once per armed
//! cycle. Re-arming against a different cycle (or disarming) resets that
//! latch, which is what keeps a stale reading from finishing a superseded
//! cycle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::engine::Action;
use crate::cycle::{Cycle, CycleId};

/// Whole seconds between `start` and `now`, floored. Zero if `now` is
/// earlier than `start`.
pub fn elapsed_secs(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - start).num_seconds()).unwrap_or(0)
}

/// A countdown reading for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
    pub total_secs: u64,
}

impl Countdown {
    /// Compute the countdown of `cycle` as seen at `now`.
    pub fn compute(cycle: &Cycle, now: DateTime<Utc>) -> Self {
        Self::from_elapsed(elapsed_secs(cycle.start_time(), now), cycle.total_secs())
    }

    fn from_elapsed(elapsed_secs: u64, total_secs: u64) -> Self {
        Self {
            elapsed_secs,
            remaining_secs: total_secs.saturating_sub(elapsed_secs),
            total_secs,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed_secs >= self.total_secs
    }

    /// Minutes part of the remaining time.
    pub fn minutes(&self) -> u64 {
        self.remaining_secs / 60
    }

    /// Seconds part of the remaining time.
    pub fn seconds(&self) -> u64 {
        self.remaining_secs % 60
    }

    /// 0.0 .. 1.0 progress through the cycle.
    pub fn progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 1.0;
        }
        (self.elapsed_secs as f64 / self.total_secs as f64).min(1.0)
    }

    /// Window-title form: `MM:SS - task`.
    pub fn title(&self, task: &str) -> String {
        format!("{self} - {task}")
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes(), self.seconds())
    }
}

/// Result of one reconciler tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub cycle_id: CycleId,
    pub countdown: Countdown,
    /// `Some(FinishActiveCycle)` on the first tick that observes completion.
    pub finish: Option<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Armed {
    cycle_id: CycleId,
    start_time: DateTime<Utc>,
    total_secs: u64,
    last_elapsed_secs: u64,
    finish_emitted: bool,
}

/// Tracks the cycle the countdown is armed against.
#[derive(Debug, Default)]
pub struct Reconciler {
    armed: Option<Armed>,
    /// Bumped on every arm/disarm that changes the armed cycle.
    generation: u64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm against `cycle`, or disarm when it is `None` or terminal.
    ///
    /// Returns `true` if the armed cycle changed. Arming against the cycle
    /// that is already armed keeps its state, including the finish latch.
    pub fn arm(&mut self, cycle: Option<&Cycle>) -> bool {
        let Some(cycle) = cycle.filter(|c| c.is_active()) else {
            return self.disarm();
        };
        if self.armed_cycle_id() == Some(cycle.id()) {
            return false;
        }

        self.generation += 1;
        info!(cycle_id = %cycle.id(), generation = self.generation, "countdown armed");
        self.armed = Some(Armed {
            cycle_id: cycle.id().clone(),
            start_time: cycle.start_time(),
            total_secs: cycle.total_secs(),
            last_elapsed_secs: 0,
            finish_emitted: false,
        });
        true
    }

    /// Drop the armed cycle. Returns `true` if something was armed.
    pub fn disarm(&mut self) -> bool {
        match self.armed.take() {
            Some(armed) => {
                self.generation += 1;
                info!(
                    cycle_id = %armed.cycle_id,
                    generation = self.generation,
                    "countdown disarmed"
                );
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn armed_cycle_id(&self) -> Option<&CycleId> {
        self.armed.as_ref().map(|a| &a.cycle_id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Recompute the countdown at `now`.
    ///
    /// Elapsed time never goes backwards for one armed cycle: a clock that
    /// steps back reports the last observed value.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Reading> {
        let armed = self.armed.as_mut()?;
        let elapsed = elapsed_secs(armed.start_time, now).max(armed.last_elapsed_secs);
        armed.last_elapsed_secs = elapsed;

        let countdown = Countdown::from_elapsed(elapsed, armed.total_secs);
        let finish = if countdown.is_complete() && !armed.finish_emitted {
            armed.finish_emitted = true;
            debug!(cycle_id = %armed.cycle_id, elapsed, "countdown reached zero");
            Some(Action::FinishActiveCycle)
        } else {
            None
        };

        Some(Reading {
            cycle_id: armed.cycle_id.clone(),
            countdown,
            finish,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::DurationBounds;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn cycle(id: &str, minutes: u32) -> Cycle {
        Cycle::new(id.into(), "X", minutes, t0(), DurationBounds::default()).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    #[test]
    fn elapsed_is_floored_and_clamped() {
        assert_eq!(elapsed_secs(t0(), t0() + Duration::milliseconds(1999)), 1);
        assert_eq!(elapsed_secs(t0(), t0() - Duration::seconds(10)), 0);
    }

    #[test]
    fn countdown_display() {
        let c = Countdown::compute(&cycle("a", 25), at(61));
        assert_eq!(c.remaining_secs, 1439);
        assert_eq!(c.to_string(), "23:59");
        assert_eq!(c.title("Write report"), "23:59 - Write report");
    }

    #[test]
    fn finishes_exactly_once_at_duration() {
        let cycle = cycle("a", 5);
        let mut reconciler = Reconciler::new();
        reconciler.arm(Some(&cycle));

        let r = reconciler.tick(at(299)).unwrap();
        assert_eq!(r.countdown.remaining_secs, 1);
        assert!(r.finish.is_none());

        let r = reconciler.tick(at(300)).unwrap();
        assert_eq!(r.countdown.remaining_secs, 0);
        assert_eq!(r.finish, Some(Action::FinishActiveCycle));

        // Same tick checked again, then a late tick.
        assert!(reconciler.tick(at(300)).unwrap().finish.is_none());
        assert!(reconciler.tick(at(301)).unwrap().finish.is_none());
    }

    #[test]
    fn missed_ticks_still_fire_once() {
        let cycle = cycle("a", 5);
        let mut reconciler = Reconciler::new();
        reconciler.arm(Some(&cycle));

        let r = reconciler.tick(at(301)).unwrap();
        assert_eq!(r.countdown.remaining_secs, 0);
        assert_eq!(r.finish, Some(Action::FinishActiveCycle));
        assert!(reconciler.tick(at(4000)).unwrap().finish.is_none());
    }

    #[test]
    fn restored_cycle_starts_from_wall_clock() {
        let cycle = cycle("a", 25);
        let mut reconciler = Reconciler::new();
        reconciler.arm(Some(&cycle));
        let r = reconciler.tick(at(60)).unwrap();
        assert_eq!(r.countdown.elapsed_secs, 60);
        assert_eq!(r.countdown.remaining_secs, 25 * 60 - 60);
    }

    #[test]
    fn elapsed_is_monotonic_when_clock_steps_back() {
        let cycle = cycle("a", 5);
        let mut reconciler = Reconciler::new();
        reconciler.arm(Some(&cycle));
        reconciler.tick(at(120));
        let r = reconciler.tick(at(100)).unwrap();
        assert_eq!(r.countdown.elapsed_secs, 120);
    }

    #[test]
    fn rearm_resets_latch_and_bumps_generation() {
        let first = cycle("a", 5);
        let second = cycle("b", 5);
        let mut reconciler = Reconciler::new();

        assert!(reconciler.arm(Some(&first)));
        assert_eq!(reconciler.generation(), 1);
        assert!(!reconciler.arm(Some(&first)));
        assert_eq!(reconciler.generation(), 1);
        assert!(reconciler.tick(at(300)).unwrap().finish.is_some());

        assert!(reconciler.arm(Some(&second)));
        assert_eq!(reconciler.generation(), 2);
        assert_eq!(reconciler.armed_cycle_id().map(|id| id.as_str()), Some("b"));
        assert!(reconciler.tick(at(300)).unwrap().finish.is_some());
    }

    #[test]
    fn terminal_or_missing_cycle_disarms() {
        let mut done = cycle("a", 5);
        done.mark_interrupted(at(10));
        let mut reconciler = Reconciler::new();
        reconciler.arm(Some(&cycle("b", 5)));

        assert!(reconciler.arm(Some(&done)));
        assert!(!reconciler.is_armed());
        assert!(reconciler.tick(at(400)).is_none());
        assert!(!reconciler.arm(None));
    }
}
