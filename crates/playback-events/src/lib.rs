//! Shared data model and wire types for scenario playback.
//!
//! Everything in here is plain data: scenarios and steps as authored,
//! the commands a local operator or a remote driver may issue, and the
//! events and snapshots the playback engine hands to observers.

pub mod commands;
pub mod events;
pub mod scenario;
pub mod state;
pub mod types;

pub use commands::PlaybackCommandData;
pub use events::PlaybackEvent;
pub use scenario::{Scenario, Step};
pub use state::{Authority, PlaybackPhase, PlaybackSnapshot};
pub use types::{MetricsDelta, ScenarioId, Severity, Speed, StepId, MAX_SPEED, MIN_SPEED};
