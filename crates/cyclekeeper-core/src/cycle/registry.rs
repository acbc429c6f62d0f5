use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::entity::{Cycle, CycleId, CycleStatus, DurationBounds};
use crate::error::RegistryError;

/// Every cycle ever created, in creation order, plus the active pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRegistry {
    #[serde(default)]
    cycles: Vec<Cycle>,
    #[serde(default)]
    active_cycle_id: Option<CycleId>,
}

/// Counts over the history, as shown at the bottom of the history view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub total: usize,
    pub in_progress: usize,
    pub interrupted: usize,
    pub finished: usize,
    /// Sum of the planned durations of finished cycles.
    pub finished_minutes: u64,
}

impl CycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cycle `active_cycle_id` points at, if any.
    pub fn active_cycle(&self) -> Option<&Cycle> {
        let id = self.active_cycle_id.as_ref()?;
        self.get(id)
    }

    pub fn active_cycle_id(&self) -> Option<&CycleId> {
        self.active_cycle_id.as_ref()
    }

    /// All cycles, oldest first.
    pub fn history(&self) -> &[Cycle] {
        &self.cycles
    }

    pub fn get(&self, id: &CycleId) -> Option<&Cycle> {
        self.cycles.iter().find(|c| c.id() == id)
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn summary(&self) -> HistorySummary {
        self.cycles
            .iter()
            .fold(HistorySummary::default(), |mut acc, cycle| {
                acc.total += 1;
                match cycle.status() {
                    CycleStatus::InProgress => acc.in_progress += 1,
                    CycleStatus::Interrupted => acc.interrupted += 1,
                    CycleStatus::Finished => {
                        acc.finished += 1;
                        acc.finished_minutes += u64::from(cycle.duration_minutes());
                    }
                }
                acc
            })
    }

    /// Verify the registry invariants:
    /// - every cycle has a task and a duration of 1 to
    ///   [`DurationBounds::LIMIT_MINUTES`] minutes
    /// - no cycle is both interrupted and finished
    /// - ids are unique
    /// - at most one cycle is in progress, and `active_cycle_id` points at it
    pub fn check_invariants(&self) -> Result<(), RegistryError> {
        let mut seen = HashSet::with_capacity(self.cycles.len());
        let mut in_progress: Option<&CycleId> = None;

        for cycle in &self.cycles {
            if cycle.task().trim().is_empty() {
                return Err(RegistryError::EmptyTask(cycle.id().clone()));
            }
            let minutes = cycle.duration_minutes();
            if minutes == 0 || minutes > DurationBounds::LIMIT_MINUTES {
                return Err(RegistryError::InvalidDuration {
                    id: cycle.id().clone(),
                    minutes,
                });
            }
            if cycle.interrupted_at().is_some() && cycle.finished_at().is_some() {
                return Err(RegistryError::ConflictingTerminalState(cycle.id().clone()));
            }
            if !seen.insert(cycle.id()) {
                return Err(RegistryError::DuplicateId(cycle.id().clone()));
            }
            if cycle.is_active() {
                if in_progress.is_some() {
                    return Err(RegistryError::MultipleActive);
                }
                in_progress = Some(cycle.id());
            }
        }

        match (&self.active_cycle_id, in_progress) {
            (Some(active), Some(running)) if active == running => Ok(()),
            (Some(active), _) => Err(RegistryError::DanglingActiveId(active.clone())),
            (None, Some(running)) => Err(RegistryError::UntrackedActive(running.clone())),
            (None, None) => Ok(()),
        }
    }

    // ── Engine-side mutation ─────────────────────────────────────────

    /// Append `cycle` and point the active id at it.
    pub(crate) fn push_active(&mut self, cycle: Cycle) {
        self.active_cycle_id = Some(cycle.id().clone());
        self.cycles.push(cycle);
    }

    /// Clear the active pointer and hand back the cycle it referred to.
    pub(crate) fn take_active(&mut self) -> Option<&mut Cycle> {
        let id = self.active_cycle_id.take()?;
        self.cycles.iter_mut().find(|c| *c.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn cycle(id: &str) -> Cycle {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Cycle::new(id.into(), "Task", 25, t0, DurationBounds::default()).unwrap()
    }

    #[test]
    fn empty_registry_has_no_active_cycle() {
        let registry = CycleRegistry::new();
        assert!(registry.active_cycle().is_none());
        assert!(registry.history().is_empty());
        assert!(registry.check_invariants().is_ok());
    }

    #[test]
    fn push_active_tracks_newest_cycle() {
        let mut registry = CycleRegistry::new();
        registry.push_active(cycle("a"));
        assert_eq!(registry.active_cycle().map(|c| c.id().as_str()), Some("a"));
        assert!(registry.check_invariants().is_ok());
    }

    #[test]
    fn take_active_clears_pointer() {
        let mut registry = CycleRegistry::new();
        registry.push_active(cycle("a"));
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap();
        let active = registry.take_active().unwrap();
        assert!(active.mark_finished(t));
        assert!(registry.active_cycle_id().is_none());
        assert!(registry.take_active().is_none());
        assert!(registry.check_invariants().is_ok());
    }

    #[test]
    fn detects_untracked_and_multiple_active_cycles() {
        let mut registry = CycleRegistry::new();
        registry.cycles.push(cycle("a"));
        assert_eq!(
            registry.check_invariants(),
            Err(RegistryError::UntrackedActive("a".into()))
        );

        registry.push_active(cycle("b"));
        assert_eq!(registry.check_invariants(), Err(RegistryError::MultipleActive));
    }

    #[test]
    fn detects_dangling_active_id_and_duplicates() {
        let mut registry = CycleRegistry::new();
        registry.active_cycle_id = Some("ghost".into());
        assert_eq!(
            registry.check_invariants(),
            Err(RegistryError::DanglingActiveId("ghost".into()))
        );

        let mut registry = CycleRegistry::new();
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 0).unwrap();
        let mut done = cycle("a");
        done.mark_finished(t);
        registry.cycles.push(done.clone());
        registry.cycles.push(done);
        assert_eq!(
            registry.check_invariants(),
            Err(RegistryError::DuplicateId("a".into()))
        );
    }

    #[test]
    fn summary_counts_by_status() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let mut registry = CycleRegistry::new();
        let mut finished = cycle("a");
        finished.mark_finished(t);
        let mut interrupted = cycle("b");
        interrupted.mark_interrupted(t);
        registry.cycles.push(finished);
        registry.cycles.push(interrupted);
        registry.push_active(cycle("c"));

        let summary = registry.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.finished, 1);
        assert_eq!(summary.interrupted, 1);
        assert_eq!(summary.in_progress, 1);
        assert_eq!(summary.finished_minutes, 25);
    }
}
