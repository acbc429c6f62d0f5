//! Persistence bridge between the cycle registry and a [`KvStore`].
//!
//! The registry is stored as one JSON blob under a versioned key:
//!
//! ```text
//! { "version": 1, "cycles": [ ... ], "active_cycle_id": "..." }
//! ```
//!
//! Timestamps are RFC 3339 with full sub-second precision. Anything that
//! cannot be restored (missing, malformed, wrong schema version, broken
//! invariants, unreadable store) loads as an empty registry.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::kv::KvStore;
use crate::cycle::CycleRegistry;
use crate::error::PersistenceError;

/// Storage key for the cycle state. Embeds the schema version.
pub const STORAGE_KEY: &str = "cyclekeeper:cycles-state-1.0.0";

/// Blob schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct StoredStateRef<'a> {
    version: u32,
    #[serde(flatten)]
    registry: &'a CycleRegistry,
}

#[derive(Deserialize)]
struct StoredState {
    version: u32,
    #[serde(flatten)]
    registry: CycleRegistry,
}

/// Reads and writes the registry through `S`.
#[derive(Debug, Clone)]
pub struct CycleStore<S> {
    store: S,
    key: String,
}

impl<S: KvStore> CycleStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, STORAGE_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Restore the registry, falling back to an empty one.
    pub fn load(&self) -> CycleRegistry {
        match self.try_load() {
            Ok(Some(registry)) => {
                debug!(
                    cycles = registry.len(),
                    active = ?registry.active_cycle_id(),
                    "restored cycle state"
                );
                registry
            }
            Ok(None) => CycleRegistry::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "discarding stored cycle state");
                CycleRegistry::new()
            }
        }
    }

    /// Restore the registry, reporting why stored state was unusable.
    ///
    /// `Ok(None)` means nothing is stored under the key.
    pub fn try_load(&self) -> Result<Option<CycleRegistry>, PersistenceError> {
        let Some(blob) = self
            .store
            .get(&self.key)
            .map_err(|source| PersistenceError::Read {
                key: self.key.clone(),
                source,
            })?
        else {
            return Ok(None);
        };

        let stored: StoredState = serde_json::from_str(&blob).map_err(PersistenceError::Decode)?;
        if stored.version != SCHEMA_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: stored.version,
                expected: SCHEMA_VERSION,
            });
        }
        stored.registry.check_invariants()?;
        Ok(Some(stored.registry))
    }

    /// Write the registry through to the store.
    pub fn save(&self, registry: &CycleRegistry) -> Result<(), PersistenceError> {
        let blob = serde_json::to_string(&StoredStateRef {
            version: SCHEMA_VERSION,
            registry,
        })
        .map_err(PersistenceError::Encode)?;
        self.store
            .set(&self.key, &blob)
            .map_err(|source| PersistenceError::Write {
                key: self.key.clone(),
                source,
            })
    }

    /// Remove the stored state.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.store
            .clear(&self.key)
            .map_err(|source| PersistenceError::Write {
                key: self.key.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, SqliteStore};
    use crate::timer::{transition, Action, TransitionContext};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::nanoseconds(123_456_789)
    }

    fn step(registry: CycleRegistry, action: Action, secs: i64, id: &str) -> CycleRegistry {
        let ctx = TransitionContext::new(t0() + Duration::seconds(secs)).with_id(id);
        transition(&registry, &action, &ctx).unwrap().registry
    }

    fn start(task: &str) -> Action {
        Action::StartCycle {
            task: task.into(),
            duration_minutes: 25,
        }
    }

    /// Finished, interrupted and in-progress cycles, in that order.
    fn mixed_registry() -> CycleRegistry {
        let r = step(CycleRegistry::new(), start("Write report"), 0, "c1");
        let r = step(r, Action::FinishActiveCycle, 1500, "-");
        let r = step(r, start("Review"), 1600, "c2");
        let r = step(r, Action::InterruptActiveCycle, 1700, "-");
        step(r, start("Plan"), 1800, "c3")
    }

    #[test]
    fn roundtrip_preserves_registries() {
        let store = MemoryStore::new();
        let bridge = CycleStore::new(store);

        let one = step(CycleRegistry::new(), start("Solo"), 0, "c1");
        for registry in [CycleRegistry::new(), one, mixed_registry()] {
            bridge.save(&registry).unwrap();
            assert_eq!(bridge.load(), registry);
        }
    }

    #[test]
    fn roundtrip_keeps_subsecond_precision() {
        let bridge = CycleStore::new(MemoryStore::new());
        let registry = mixed_registry();
        bridge.save(&registry).unwrap();
        let restored = bridge.load();
        assert_eq!(restored.history()[0].start_time(), t0());
        assert_eq!(
            restored.active_cycle().map(|c| c.start_time()),
            Some(t0() + Duration::seconds(1800))
        );
    }

    #[test]
    fn missing_state_loads_empty() {
        let bridge = CycleStore::new(MemoryStore::new());
        assert!(bridge.try_load().unwrap().is_none());
        assert!(bridge.load().is_empty());
    }

    #[test]
    fn malformed_state_loads_empty() {
        let store = MemoryStore::new();
        store.set(STORAGE_KEY, "{not json").unwrap();
        let bridge = CycleStore::new(store);
        assert!(matches!(bridge.try_load(), Err(PersistenceError::Decode(_))));
        assert!(bridge.load().is_empty());
    }

    #[test]
    fn other_schema_version_loads_empty() {
        let store = MemoryStore::new();
        store
            .set(STORAGE_KEY, r#"{"version":2,"cycles":[],"active_cycle_id":null}"#)
            .unwrap();
        let bridge = CycleStore::new(store);
        assert!(matches!(
            bridge.try_load(),
            Err(PersistenceError::UnsupportedVersion { found: 2, expected: 1 })
        ));
        assert!(bridge.load().is_empty());
    }

    #[test]
    fn inconsistent_state_loads_empty() {
        let store = MemoryStore::new();
        let blob = r#"{
            "version": 1,
            "cycles": [{
                "id": "c1",
                "task": "X",
                "duration_minutes": 5,
                "start_time": "2024-03-01T09:00:00Z",
                "interrupted_at": "2024-03-01T09:01:00Z",
                "finished_at": "2024-03-01T09:05:00Z"
            }],
            "active_cycle_id": null
        }"#;
        store.set(STORAGE_KEY, blob).unwrap();
        let bridge = CycleStore::new(store);
        assert!(matches!(bridge.try_load(), Err(PersistenceError::Corrupt(_))));
        assert!(bridge.load().is_empty());
    }

    #[test]
    fn unvalidated_cycle_fields_load_empty() {
        let blob = |task: &str, minutes: u32| {
            format!(
                r#"{{
                    "version": 1,
                    "cycles": [{{
                        "id": "c1",
                        "task": "{task}",
                        "duration_minutes": {minutes},
                        "start_time": "2024-03-01T09:00:00Z",
                        "finished_at": "2024-03-01T09:05:00Z"
                    }}],
                    "active_cycle_id": null
                }}"#
            )
        };

        for (task, minutes) in [("  ", 5), ("X", 0), ("X", 100_000)] {
            let store = MemoryStore::new();
            store.set(STORAGE_KEY, &blob(task, minutes)).unwrap();
            let bridge = CycleStore::new(store);
            assert!(matches!(bridge.try_load(), Err(PersistenceError::Corrupt(_))));
            assert!(bridge.load().is_empty());
        }

        let store = MemoryStore::new();
        store.set(STORAGE_KEY, &blob("X", 5)).unwrap();
        assert_eq!(CycleStore::new(store).load().len(), 1);
    }

    #[test]
    fn write_failure_is_reported() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        let bridge = CycleStore::new(store);
        let err = bridge.save(&mixed_registry()).unwrap_err();
        assert!(matches!(err, PersistenceError::Write { .. }));
    }

    #[test]
    fn clear_removes_state() {
        let bridge = CycleStore::new(SqliteStore::open_memory().unwrap());
        bridge.save(&mixed_registry()).unwrap();
        bridge.clear().unwrap();
        assert!(bridge.try_load().unwrap().is_none());
    }
}
