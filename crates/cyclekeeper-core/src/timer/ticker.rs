//! Fixed-cadence tick source for the countdown.
//!
//! The ticker owns at most one spawned interval task. Every `arm` aborts the
//! previous task before spawning a new one and bumps the generation, so a
//! tick already queued by a cancelled task is recognised as stale by
//! [`Ticker::is_current`].

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::session::{CycleSession, TickReport};
use crate::storage::KvStore;

/// Nominal reconciler period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// One tick, tagged with the generation of the ticker that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

pub struct Ticker {
    period: Duration,
    tx: mpsc::UnboundedSender<Tick>,
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl Ticker {
    /// Create an idle ticker and the receiver its ticks arrive on.
    pub fn new(period: Duration) -> (Self, mpsc::UnboundedReceiver<Tick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ticker = Self {
            period,
            tx,
            handle: None,
            generation: 0,
        };
        (ticker, rx)
    }

    /// Cancel any running interval task and start a fresh one. The first
    /// tick fires immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let period = self.period;
        let tx = self.tx.clone();
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(Tick { generation }).is_err() {
                    break;
                }
            }
        }));
        debug!(generation, "ticker armed");
        generation
    }

    /// Cancel the running interval task and go idle.
    pub fn disarm(&mut self) {
        if self.cancel() {
            self.generation += 1;
            debug!(generation = self.generation, "ticker disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `tick` came from the currently armed task.
    pub fn is_current(&self, tick: &Tick) -> bool {
        self.is_armed() && tick.generation == self.generation
    }

    fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Why [`watch`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    /// The active cycle ran to completion.
    Finished,
    /// No cycle was active (or it was interrupted elsewhere).
    Idle,
    /// The shutdown future resolved first.
    Shutdown,
}

/// Drive `session` at `period` until the active cycle ends or `shutdown`
/// resolves, calling `on_tick` with every report.
///
/// The ticker is disarmed as soon as no cycle is active.
pub async fn watch<S, C, F, Sh>(
    session: &mut CycleSession<S, C>,
    period: Duration,
    mut on_tick: F,
    shutdown: Sh,
) -> Result<WatchExit>
where
    S: KvStore,
    C: Clock,
    F: FnMut(&CycleSession<S, C>, &TickReport),
    Sh: Future<Output = ()>,
{
    let (mut ticker, mut rx) = Ticker::new(period);
    if session.active_cycle().is_none() {
        return Ok(WatchExit::Idle);
    }
    ticker.arm();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                ticker.disarm();
                return Ok(WatchExit::Shutdown);
            }
            tick = rx.recv() => {
                let Some(tick) = tick else {
                    warn!("tick channel closed");
                    return Ok(WatchExit::Idle);
                };
                if !ticker.is_current(&tick) {
                    debug!(
                        stale = tick.generation,
                        current = ticker.generation(),
                        "dropping stale tick"
                    );
                    continue;
                }

                let report = session.tick()?;
                on_tick(&*session, &report);

                if session.active_cycle().is_none() {
                    ticker.disarm();
                    return Ok(if report.finished.is_some() {
                        WatchExit::Finished
                    } else {
                        WatchExit::Idle
                    });
                }
            }
        }
    }
}
