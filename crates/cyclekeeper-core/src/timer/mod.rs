mod engine;
mod reconciler;
mod ticker;

pub use engine::{
    transition, Action, StartPolicy, TransitionContext, TransitionOutcome, TransitionRules,
};
pub use reconciler::{elapsed_secs, Countdown, Reading, Reconciler};
pub use ticker::{watch, Tick, Ticker, WatchExit, DEFAULT_TICK_INTERVAL};
