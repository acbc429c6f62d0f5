pub mod config;
pub mod cycle;
pub mod history;

use cyclekeeper_core::{Config, CycleSession, Dispatched, SqliteStore, SystemClock};
use tracing::debug;

pub type Session = CycleSession<SqliteStore, SystemClock>;

/// Open the on-disk session with the rules from `config.toml`.
pub fn open_session() -> Result<(Session, Config), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = SqliteStore::open()?;
    let session = CycleSession::open(store, SystemClock, config.rules()?);
    debug!(cycles = session.registry().len(), "session opened");
    Ok((session, config))
}

/// Print the events of a dispatch as JSON, and any save warning to stderr.
pub fn print_dispatched(dispatched: &Dispatched) -> Result<(), Box<dyn std::error::Error>> {
    for event in &dispatched.events {
        println!("{}", serde_json::to_string_pretty(event)?);
    }
    if let Some(warning) = &dispatched.save_warning {
        eprintln!("warning: {warning}; this change will be lost on restart");
    }
    Ok(())
}
