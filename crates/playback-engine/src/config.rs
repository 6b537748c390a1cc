use playback_events::Speed;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine-wide playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackSettings {
	/// Start the successor scenario after one completes
	#[serde(default)]
	pub auto_advance: bool,

	/// Pause between a completed scenario and its auto-started successor (ms)
	#[serde(default = "default_inter_scenario_delay")]
	pub inter_scenario_delay_ms: u64,

	/// Successor of the last scenario is the first one
	#[serde(default)]
	pub loop_catalog: bool,

	/// Speed in effect before any set_speed command
	#[serde(default = "default_initial_speed")]
	pub initial_speed: f64,

	/// Increment used by the operator's faster/slower bindings
	#[serde(default = "default_speed_step")]
	pub speed_step: f64,
}

fn default_inter_scenario_delay() -> u64 {
	3000
}

fn default_initial_speed() -> f64 {
	1.0
}

fn default_speed_step() -> f64 {
	0.25
}

impl PlaybackSettings {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_auto_advance(mut self, enabled: bool) -> Self {
		self.auto_advance = enabled;
		self
	}

	pub fn with_inter_scenario_delay(mut self, delay_ms: u64) -> Self {
		self.inter_scenario_delay_ms = delay_ms;
		self
	}

	pub fn with_loop_catalog(mut self, enabled: bool) -> Self {
		self.loop_catalog = enabled;
		self
	}

	pub fn with_initial_speed(mut self, multiplier: f64) -> Self {
		self.initial_speed = multiplier;
		self
	}

	pub fn with_speed_step(mut self, step: f64) -> Self {
		self.speed_step = step;
		self
	}

	pub fn inter_scenario_delay(&self) -> Duration {
		Duration::from_millis(self.inter_scenario_delay_ms)
	}

	pub fn initial_speed(&self) -> Speed {
		Speed::new(self.initial_speed)
	}
}

impl Default for PlaybackSettings {
	fn default() -> Self {
		Self {
			auto_advance: false,
			inter_scenario_delay_ms: default_inter_scenario_delay(),
			loop_catalog: false,
			initial_speed: default_initial_speed(),
			speed_step: default_speed_step(),
		}
	}
}
