use super::scenario::Step;
use super::state::Authority;
use super::types::{ScenarioId, Speed};
use serde::{Deserialize, Serialize};

/// Transition published by the playback engine, delivered to observers by value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
	ScenarioStarted {
		scenario_id: ScenarioId,
		authority: Authority,
		session: u64,
	},
	StepChanged {
		scenario_id: ScenarioId,
		step_index: usize,
		step: Step,
	},
	Paused {
		elapsed_secs: f64,
	},
	Resumed {
		elapsed_secs: f64,
	},
	SpeedChanged {
		speed: Speed,
	},
	ScenarioCompleted {
		scenario_id: ScenarioId,
	},
	ScenarioStopped {
		scenario_id: ScenarioId,
	},
}

impl PlaybackEvent {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::ScenarioStarted { .. } => "scenario_started",
			Self::StepChanged { .. } => "step_changed",
			Self::Paused { .. } => "paused",
			Self::Resumed { .. } => "resumed",
			Self::SpeedChanged { .. } => "speed_changed",
			Self::ScenarioCompleted { .. } => "scenario_completed",
			Self::ScenarioStopped { .. } => "scenario_stopped",
		}
	}

	/// Scenario the event refers to, when it names one
	pub fn scenario_id(&self) -> Option<&str> {
		match self {
			Self::ScenarioStarted { scenario_id, .. }
			| Self::StepChanged { scenario_id, .. }
			| Self::ScenarioCompleted { scenario_id }
			| Self::ScenarioStopped { scenario_id } => Some(scenario_id),
			Self::Paused { .. } | Self::Resumed { .. } | Self::SpeedChanged { .. } => None,
		}
	}
}
