//! Cycle transition engine.
//!
//! A pure reducer: `transition(registry, action, ctx)` returns the next
//! registry without touching the input. The wall clock is read by the caller
//! and passed in through [`TransitionContext`]; the engine only uses it to
//! stamp `start_time` and the terminal timestamps.
//!
//! ## Lifecycle
//!
//! ```text
//! StartCycle ──> in progress ──InterruptActiveCycle──> interrupted
//!                     │
//!                     └──────FinishActiveCycle───────> finished
//! ```
//!
//! Interrupt and finish are no-ops when nothing is active, so a reconciler
//! tick racing a user interrupt resolves harmlessly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::reconciler::elapsed_secs;
use crate::cycle::{Cycle, CycleId, CycleRegistry, DurationBounds};
use crate::error::{Result, TransitionError};
use crate::events::Event;

/// The three actions that can change the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    StartCycle { task: String, duration_minutes: u32 },
    InterruptActiveCycle,
    FinishActiveCycle,
}

/// What `StartCycle` does when a cycle is already counting down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPolicy {
    /// Fail with [`TransitionError::CycleAlreadyActive`].
    #[default]
    Reject,
    /// Interrupt the running cycle, then start the new one.
    Supersede,
}

/// Configurable rules applied by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionRules {
    pub bounds: DurationBounds,
    pub start_policy: StartPolicy,
}

/// Inputs a transition needs besides the registry and the action.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub now: DateTime<Utc>,
    /// Identifier given to the cycle created by `StartCycle`.
    pub new_id: CycleId,
    pub rules: TransitionRules,
}

impl TransitionContext {
    /// Context at `now` with default rules and a freshly generated id.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            new_id: CycleId::generate(),
            rules: TransitionRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: TransitionRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_id(mut self, id: impl Into<CycleId>) -> Self {
        self.new_id = id.into();
        self
    }
}

/// Result of a transition. An empty `events` list means nothing changed.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub registry: CycleRegistry,
    pub events: Vec<Event>,
}

impl TransitionOutcome {
    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum Closure {
    Interrupted,
    Finished,
}

/// Apply `action` to `registry`.
///
/// # Errors
///
/// - [`crate::ValidationError`] if `StartCycle` carries an empty task or an
///   out-of-bounds duration. The registry is left as it was.
/// - [`TransitionError::CycleAlreadyActive`] if `StartCycle` is applied
///   while a cycle is active under [`StartPolicy::Reject`].
pub fn transition(
    registry: &CycleRegistry,
    action: &Action,
    ctx: &TransitionContext,
) -> Result<TransitionOutcome> {
    let mut next = registry.clone();
    let mut events = Vec::new();

    match action {
        Action::StartCycle {
            task,
            duration_minutes,
        } => {
            let cycle = Cycle::new(
                ctx.new_id.clone(),
                task,
                *duration_minutes,
                ctx.now,
                ctx.rules.bounds,
            )?;
            if next.get(cycle.id()).is_some() {
                return Err(TransitionError::DuplicateCycleId(cycle.id().clone()).into());
            }

            if let Some(active) = next.active_cycle() {
                match ctx.rules.start_policy {
                    StartPolicy::Reject => {
                        return Err(TransitionError::CycleAlreadyActive {
                            active_id: active.id().clone(),
                        }
                        .into());
                    }
                    StartPolicy::Supersede => {
                        events.extend(close_active(&mut next, Closure::Interrupted, ctx.now));
                    }
                }
            }

            events.push(Event::CycleStarted {
                cycle_id: cycle.id().clone(),
                task: cycle.task().to_string(),
                duration_minutes: cycle.duration_minutes(),
                at: ctx.now,
            });
            next.push_active(cycle);
        }
        Action::InterruptActiveCycle => {
            events.extend(close_active(&mut next, Closure::Interrupted, ctx.now));
        }
        Action::FinishActiveCycle => {
            events.extend(close_active(&mut next, Closure::Finished, ctx.now));
        }
    }

    if events.is_empty() {
        debug!(?action, "no active cycle, transition ignored");
    } else {
        debug!(?action, active = ?next.active_cycle_id(), "transition applied");
    }

    Ok(TransitionOutcome {
        registry: next,
        events,
    })
}

fn close_active(
    registry: &mut CycleRegistry,
    closure: Closure,
    now: DateTime<Utc>,
) -> Option<Event> {
    let cycle = registry.take_active()?;
    match closure {
        Closure::Interrupted => cycle.mark_interrupted(now).then(|| Event::CycleInterrupted {
            cycle_id: cycle.id().clone(),
            elapsed_secs: elapsed_secs(cycle.start_time(), now).min(cycle.total_secs()),
            at: now,
        }),
        Closure::Finished => cycle.mark_finished(now).then(|| Event::CycleFinished {
            cycle_id: cycle.id().clone(),
            at: now,
        }),
    }
}
