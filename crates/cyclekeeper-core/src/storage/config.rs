//! TOML-based application configuration.
//!
//! Stores:
//! - the accepted cycle duration range and the start-while-active policy
//! - the reconciler tick interval
//!
//! Configuration is stored at `~/.config/cyclekeeper/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::cycle::DurationBounds;
use crate::error::ConfigError;
use crate::timer::{StartPolicy, TransitionRules, DEFAULT_TICK_INTERVAL};

/// Cycle rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    #[serde(default = "default_min_duration")]
    pub min_duration_minutes: u32,
    #[serde(default = "default_max_duration")]
    pub max_duration_minutes: u32,
    /// What starting a cycle does while another one is running.
    #[serde(default)]
    pub start_policy: StartPolicy,
}

/// Countdown reconciler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/cyclekeeper/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

fn default_min_duration() -> u32 {
    DurationBounds::DEFAULT_MIN_MINUTES
}
fn default_max_duration() -> u32 {
    DurationBounds::DEFAULT_MAX_MINUTES
}
fn default_tick_interval_ms() -> u64 {
    u64::try_from(DEFAULT_TICK_INTERVAL.as_millis()).unwrap_or(u64::MAX)
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_duration_minutes: default_min_duration(),
            max_duration_minutes: default_max_duration(),
            start_policy: StartPolicy::default(),
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("not a leaf value".into()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Check the values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an empty or inverted
    /// duration range or a zero tick interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bounds()?;
        if self.reconciler.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "reconciler.tick_interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation. `self` is unchanged on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// See [`Config::apply`]; also fails if the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Accepted duration range.
    pub fn bounds(&self) -> Result<DurationBounds, ConfigError> {
        DurationBounds::new(self.cycle.min_duration_minutes, self.cycle.max_duration_minutes)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "cycle".into(),
                message: format!(
                    "duration range {}..={} must be non-empty and lie within 1..={}",
                    self.cycle.min_duration_minutes,
                    self.cycle.max_duration_minutes,
                    DurationBounds::LIMIT_MINUTES
                ),
            })
    }

    /// Rules handed to the transition engine.
    pub fn rules(&self) -> Result<TransitionRules, ConfigError> {
        Ok(TransitionRules {
            bounds: self.bounds()?,
            start_policy: self.cycle.start_policy,
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.reconciler.tick_interval_ms.max(1))
    }
}
