//! Core error types for cyclekeeper-core.
//!
//! This module defines the error hierarchy using thiserror. Errors from
//! cycle construction and transitions are surfaced to the caller; storage
//! read failures are recovered locally by the persistence bridge.

use std::path::PathBuf;
use thiserror::Error;

use crate::cycle::CycleId;

/// Core error type for cyclekeeper-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Cycle construction rejected its input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Action not allowed in the current registry state
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    /// Persisted state could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Key-value store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation errors raised when building a cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Task label is empty or whitespace only
    #[error("task must not be empty")]
    EmptyTask,

    /// Duration outside the configured bound
    #[error("duration of {minutes} minutes is outside the allowed range {min}..={max}")]
    DurationOutOfRange { minutes: u32, min: u32, max: u32 },
}

/// Errors for actions that cannot be applied to the current registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// A new cycle was requested while another one is still counting down
    #[error("cycle {active_id} is still active; interrupt it before starting another")]
    CycleAlreadyActive { active_id: CycleId },

    /// The identifier handed to a new cycle is already in the registry
    #[error("cycle id {0} is already in use")]
    DuplicateCycleId(CycleId),
}

/// Broken registry invariants, detected when restoring stored state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("cycle {0} is both interrupted and finished")]
    ConflictingTerminalState(CycleId),

    #[error("cycle {0} has an empty task")]
    EmptyTask(CycleId),

    #[error("cycle {id} has a duration of {minutes} minutes")]
    InvalidDuration { id: CycleId, minutes: u32 },

    #[error("cycle id {0} appears more than once")]
    DuplicateId(CycleId),

    #[error("more than one cycle is in progress")]
    MultipleActive,

    #[error("active cycle id {0} does not refer to an in-progress cycle")]
    DanglingActiveId(CycleId),

    #[error("cycle {0} is in progress but not marked active")]
    UntrackedActive(CycleId),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Store is locked")]
    Locked,

    /// Store refuses writes (read-only or full)
    #[error("Store is not writable: {0}")]
    NotWritable(String),
}

/// Persistence bridge errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to read '{key}': {source}")]
    Read {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to write '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to encode cycle state: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("stored cycle state is malformed: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("stored cycle state has schema version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("stored cycle state is inconsistent: {0}")]
    Corrupt(#[from] RegistryError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => match e.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    StoreError::Locked
                }
                rusqlite::ErrorCode::ReadOnly | rusqlite::ErrorCode::DiskFull => {
                    StoreError::NotWritable(err.to_string())
                }
                _ => StoreError::QueryFailed(err.to_string()),
            },
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
