use std::future::Future;
use std::io::Write;

use clap::Subcommand;
use cyclekeeper_core::timer::watch;
use cyclekeeper_core::WatchExit;
use tracing::warn;

use super::{open_session, print_dispatched};

#[derive(Subcommand)]
pub enum CycleAction {
    /// Start a new cycle
    Start {
        /// What you are working on
        task: String,
        /// Cycle length in minutes
        #[arg(short, long)]
        minutes: u32,
    },
    /// Interrupt the active cycle
    Interrupt,
    /// Print the countdown of the active cycle
    Status {
        /// Print the full state snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Follow the countdown until the cycle ends (Ctrl-C to stop watching)
    Watch,
    /// Forget every cycle
    Reset,
}

/// Resolves when `signal` fires. Never resolves if the handler could not be
/// installed, so `watch` then runs until the cycle ends.
async fn until_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

pub fn run(action: CycleAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut session, config) = open_session()?;

    match action {
        CycleAction::Start { task, minutes } => {
            let dispatched = session.start_cycle(&task, minutes)?;
            print_dispatched(&dispatched)?;
        }
        CycleAction::Interrupt => {
            let dispatched = session.interrupt_active_cycle()?;
            if dispatched.is_noop() {
                println!("no active cycle");
            }
            print_dispatched(&dispatched)?;
        }
        CycleAction::Status { json } => {
            // Tick so a cycle that ran out while nothing was watching gets finished.
            let report = session.tick()?;
            if let Some(finished) = &report.finished {
                print_dispatched(finished)?;
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
            } else {
                match (session.active_cycle(), session.countdown()) {
                    (Some(cycle), Some(countdown)) => {
                        println!("{}", countdown.title(cycle.task()))
                    }
                    _ => println!("no active cycle"),
                }
            }
        }
        CycleAction::Watch => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let exit = runtime.block_on(watch(
                &mut session,
                config.tick_interval(),
                |session, report| {
                    if let (Some(cycle), Some(countdown)) =
                        (session.active_cycle(), report.countdown)
                    {
                        print!("\r{}", countdown.title(cycle.task()));
                        let _ = std::io::stdout().flush();
                    }
                    let warning = report.finished.as_ref().and_then(|d| d.save_warning.as_ref());
                    if let Some(warning) = warning {
                        eprintln!("\nwarning: {warning}");
                    }
                },
                until_signal(tokio::signal::ctrl_c()),
            ))?;
            match exit {
                WatchExit::Finished => println!("\ncycle finished"),
                WatchExit::Idle => println!("no active cycle"),
                WatchExit::Shutdown => println!("\nstopped watching; the cycle keeps running"),
            }
        }
        CycleAction::Reset => {
            session.reset()?;
            println!("cycle history cleared");
        }
    }
    Ok(())
}
