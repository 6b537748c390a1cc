//! Scenario playback engine.
//!
//! A [`PlaybackEngine`] walks the steps of authored scenarios from a
//! [`ScenarioCatalog`] on a timer, under operator control (pause, resume,
//! seek, speed), and tells observers about every transition through its
//! [`EventBus`]. A [`RemoteSync`] lets a remote driver command the engine
//! and mirror its events.

mod bus;
mod catalog;
mod commands;
mod config;
mod controller;
mod engine;
mod error;
mod metrics;
mod operator;
mod player;
pub mod remote;
mod scheduler;

pub use bus::{EventBus, EventHandler, Subscription};
pub use catalog::{ScenarioCatalog, MAX_STEP_DURATION_SECS};
pub use commands::{CommandSource, PlaybackCommand};
pub use config::PlaybackSettings;
pub use controller::{PlaybackController, TimerSink};
pub use error::{CommandOutcome, PlaybackError, Result};
pub use metrics::{MetricsBoard, SharedMetricsBoard};
pub use operator::{OperatorKey, UnknownKey};
pub use player::{PlaybackEngine, PlaybackHandle};
pub use remote::{FramedRemoteChannel, InMemRemoteChannel, OutboundFrame, RemoteError, RemotePeer, RemoteSync};
pub use scheduler::{Scheduler, TimerHandle, TokioScheduler};

pub use playback_events;
