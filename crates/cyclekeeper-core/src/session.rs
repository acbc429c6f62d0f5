//! The owned cycle state.
//!
//! [`CycleSession`] is the single writer of the registry: every change goes
//! through [`CycleSession::dispatch`], which runs the transition engine,
//! writes the result through to the store, and re-arms the reconciler when
//! the active cycle changed. Readers borrow the registry or take a
//! [`Countdown`].

use tracing::warn;

use crate::clock::Clock;
use crate::cycle::{Cycle, CycleRegistry};
use crate::error::{PersistenceError, Result};
use crate::events::Event;
use crate::storage::{CycleStore, KvStore};
use crate::timer::{transition, Action, Countdown, Reconciler, TransitionContext, TransitionRules};

/// What a dispatched action did.
#[derive(Debug, Default)]
pub struct Dispatched {
    /// Empty when the action was a no-op.
    pub events: Vec<Event>,
    /// Set when the new state could not be persisted. The in-memory
    /// registry still holds the transition.
    pub save_warning: Option<PersistenceError>,
    /// Whether the reconciler now tracks a different cycle (or none).
    pub rearmed: bool,
}

impl Dispatched {
    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }
}

/// Result of one reconciler tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// `None` when no cycle is active.
    pub countdown: Option<Countdown>,
    /// The finish transition, on the tick that observed completion.
    pub finished: Option<Dispatched>,
}

pub struct CycleSession<S, C> {
    registry: CycleRegistry,
    store: CycleStore<S>,
    reconciler: Reconciler,
    clock: C,
    rules: TransitionRules,
}

impl<S: KvStore, C: Clock> CycleSession<S, C> {
    /// Restore state from `store` and arm the reconciler against the
    /// restored active cycle, if any.
    pub fn open(store: S, clock: C, rules: TransitionRules) -> Self {
        let store = CycleStore::new(store);
        let registry = store.load();
        let mut reconciler = Reconciler::new();
        reconciler.arm(registry.active_cycle());
        Self {
            registry,
            store,
            reconciler,
            clock,
            rules,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn registry(&self) -> &CycleRegistry {
        &self.registry
    }

    pub fn active_cycle(&self) -> Option<&Cycle> {
        self.registry.active_cycle()
    }

    pub fn history(&self) -> &[Cycle] {
        self.registry.history()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn rules(&self) -> TransitionRules {
        self.rules
    }

    pub fn store(&self) -> &CycleStore<S> {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Countdown of the active cycle at the current time, without
    /// advancing the reconciler.
    pub fn countdown(&self) -> Option<Countdown> {
        self.active_cycle()
            .map(|cycle| Countdown::compute(cycle, self.clock.now()))
    }

    /// Full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let active = self.active_cycle();
        let countdown = self.countdown();
        Event::StateSnapshot {
            active_cycle_id: active.map(|c| c.id().clone()),
            task: active.map(|c| c.task().to_string()),
            status: active.map(|c| c.status()),
            elapsed_secs: countdown.map(|c| c.elapsed_secs).unwrap_or(0),
            remaining_secs: countdown.map(|c| c.remaining_secs),
            total_secs: countdown.map(|c| c.total_secs).unwrap_or(0),
            progress_pct: countdown.map(|c| c.progress() * 100.0).unwrap_or(0.0),
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply `action` at the current time.
    ///
    /// A restored cycle whose time ran out while nothing was ticking is
    /// finished first, so the action sees the registry as it stands now.
    /// The finish events lead the returned list.
    ///
    /// # Errors
    ///
    /// Validation and transition errors from the engine. The registry is
    /// left as it was before `action`; a finish that was due stays applied.
    /// Persistence failures are not errors; see [`Dispatched::save_warning`].
    pub fn dispatch(&mut self, action: Action) -> Result<Dispatched> {
        let settled = match self.reconciler.tick(self.clock.now()) {
            Some(reading) if action != Action::FinishActiveCycle => match reading.finish {
                Some(finish) => Some(self.apply(finish)?),
                None => None,
            },
            _ => None,
        };
        let dispatched = self.apply(action)?;

        Ok(match settled {
            Some(mut finished) => {
                finished.events.extend(dispatched.events);
                finished.save_warning = dispatched.save_warning.or(finished.save_warning);
                finished.rearmed |= dispatched.rearmed;
                finished
            }
            None => dispatched,
        })
    }

    fn apply(&mut self, action: Action) -> Result<Dispatched> {
        let ctx = TransitionContext::new(self.clock.now()).with_rules(self.rules);
        let outcome = transition(&self.registry, &action, &ctx)?;
        if outcome.is_noop() {
            return Ok(Dispatched::default());
        }

        self.registry = outcome.registry;
        let save_warning = match self.store.save(&self.registry) {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "cycle state not persisted");
                Some(e)
            }
        };
        let rearmed = self.reconciler.arm(self.registry.active_cycle());

        Ok(Dispatched {
            events: outcome.events,
            save_warning,
            rearmed,
        })
    }

    pub fn start_cycle(&mut self, task: &str, duration_minutes: u32) -> Result<Dispatched> {
        self.dispatch(Action::StartCycle {
            task: task.to_string(),
            duration_minutes,
        })
    }

    pub fn interrupt_active_cycle(&mut self) -> Result<Dispatched> {
        self.dispatch(Action::InterruptActiveCycle)
    }

    /// Recompute the countdown and finish the active cycle if its time is up.
    pub fn tick(&mut self) -> Result<TickReport> {
        let Some(reading) = self.reconciler.tick(self.clock.now()) else {
            return Ok(TickReport::default());
        };
        let finished = match reading.finish {
            Some(action) => Some(self.apply(action)?),
            None => None,
        };
        Ok(TickReport {
            countdown: Some(reading.countdown),
            finished,
        })
    }

    /// Forget every cycle and remove the stored state.
    ///
    /// # Errors
    ///
    /// Returns the store error if the stored state could not be removed; the
    /// in-memory registry is cleared either way.
    pub fn reset(&mut self) -> Result<(), PersistenceError> {
        self.registry = CycleRegistry::new();
        self.reconciler.disarm();
        self.store.clear()
    }
}
