mod entity;
mod registry;

pub use entity::{Cycle, CycleId, CycleStatus, DurationBounds};
pub use registry::{CycleRegistry, HistorySummary};
