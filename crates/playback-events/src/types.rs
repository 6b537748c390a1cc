use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scenario identifier
pub type ScenarioId = String;

/// Step identifier, unique within its scenario
pub type StepId = String;

/// Metric name -> value, merged into the displayed metrics when a step activates
pub type MetricsDelta = BTreeMap<String, serde_json::Value>;

pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 3.0;

/// Advisory severity attached to a step, consumed by observers only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	#[default]
	Info,
	Warning,
	Critical,
	Resolved,
}

/// Playback speed multiplier, always within [`MIN_SPEED`, `MAX_SPEED`]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Speed(f64);

impl Speed {
	pub const NORMAL: Self = Self(1.0);

	/// Clamp silently. NaN falls back to normal speed.
	pub fn new(multiplier: f64) -> Self {
		if multiplier.is_nan() {
			return Self::NORMAL;
		}
		Self(multiplier.clamp(MIN_SPEED, MAX_SPEED))
	}

	pub fn value(self) -> f64 {
		self.0
	}

	/// Shift by `delta`, clamped
	pub fn stepped(self, delta: f64) -> Self {
		Self::new(self.0 + delta)
	}
}

impl Default for Speed {
	fn default() -> Self {
		Self::NORMAL
	}
}

impl From<f64> for Speed {
	fn from(value: f64) -> Self {
		Self::new(value)
	}
}

impl From<Speed> for f64 {
	fn from(speed: Speed) -> Self {
		speed.0
	}
}

impl fmt::Display for Speed {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:.2}x", self.0)
	}
}
