use super::state::Authority;
use super::types::ScenarioId;
use serde::{Deserialize, Serialize};

/// Command surface shared by the local operator and the remote driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackCommandData {
	StartScenario {
		scenario_id: ScenarioId,
		/// Session authority; the receiving side picks its default when absent
		#[serde(default, skip_serializing_if = "Option::is_none")]
		authority: Option<Authority>,
	},
	PauseScenario,
	ResumeScenario,
	StopScenario,
	JumpToStep {
		scenario_id: ScenarioId,
		/// Signed on the wire so negative targets can be rejected as out of range
		step_index: i64,
	},
	SetSpeed {
		multiplier: f64,
	},
}

impl PlaybackCommandData {
	pub fn start(scenario_id: impl Into<ScenarioId>) -> Self {
		Self::StartScenario {
			scenario_id: scenario_id.into(),
			authority: None,
		}
	}

	pub fn jump_to_step(scenario_id: impl Into<ScenarioId>, step_index: i64) -> Self {
		Self::JumpToStep {
			scenario_id: scenario_id.into(),
			step_index,
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::StartScenario { .. } => "start_scenario",
			Self::PauseScenario => "pause_scenario",
			Self::ResumeScenario => "resume_scenario",
			Self::StopScenario => "stop_scenario",
			Self::JumpToStep { .. } => "jump_to_step",
			Self::SetSpeed { .. } => "set_speed",
		}
	}
}
