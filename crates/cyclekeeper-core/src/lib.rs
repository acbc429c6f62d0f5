//! # cyclekeeper Core Library
//!
//! This library provides the core logic for cyclekeeper, a single-task
//! countdown timer: name a task, pick a duration, and the library tracks
//! elapsed time, completion and interruption, persisting the history across
//! runs. The CLI binary is a thin presentation layer over it.
//!
//! ## Architecture
//!
//! - **Cycle registry**: every cycle ever started, in creation order, plus
//!   the id of the one cycle currently counting down
//! - **Transition engine**: a pure reducer over the three actions
//!   (start, interrupt, finish)
//! - **Reconciler**: recomputes the countdown from the cycle's wall-clock
//!   start time on every tick and emits the finish action exactly once
//! - **Storage**: the registry as a versioned JSON blob in a key-value
//!   store (SQLite on disk), plus TOML configuration
//!
//! ## Key Components
//!
//! - [`CycleSession`]: owned state, the only writer of the registry
//! - [`transition`]: the reducer
//! - [`Reconciler`] and [`Ticker`]: countdown recomputation and its cadence
//! - [`CycleStore`]: persistence bridge over any [`KvStore`]
//! - [`Config`]: application configuration

pub mod clock;
pub mod cycle;
pub mod error;
pub mod events;
pub mod session;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cycle::{Cycle, CycleId, CycleRegistry, CycleStatus, DurationBounds, HistorySummary};
pub use error::{
    ConfigError, CoreError, PersistenceError, RegistryError, StoreError, TransitionError,
    ValidationError,
};
pub use events::Event;
pub use session::{CycleSession, Dispatched, TickReport};
pub use storage::{Config, CycleStore, KvStore, MemoryStore, SqliteStore};
pub use timer::{
    transition, Action, Countdown, Reconciler, StartPolicy, Ticker, TransitionContext,
    TransitionOutcome, TransitionRules, WatchExit,
};
