mod bridge;
mod config;
mod database;
mod kv;

pub use bridge::{CycleStore, SCHEMA_VERSION, STORAGE_KEY};
pub use config::{Config, CycleConfig, ReconcilerConfig};
pub use database::SqliteStore;
pub use kv::{KvStore, MemoryStore};

use std::path::PathBuf;

/// Returns the data directory.
///
/// `CYCLEKEEPER_DATA_DIR` wins when set. Otherwise `~/.config/cyclekeeper/`,
/// or `~/.config/cyclekeeper-dev/` with `CYCLEKEEPER_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("CYCLEKEEPER_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("CYCLEKEEPER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("cyclekeeper-dev")
            } else {
                base_dir.join("cyclekeeper")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
