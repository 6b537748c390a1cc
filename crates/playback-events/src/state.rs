use super::types::{ScenarioId, Speed};
use serde::{Deserialize, Serialize};

/// Coarse playback status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
	#[default]
	Idle,
	Running,
	Paused,
	Stopped,
}

impl PlaybackPhase {
	/// Running or paused: a scenario is loaded into the playhead
	pub fn is_active(self) -> bool {
		matches!(self, Self::Running | Self::Paused)
	}
}

/// Which side is allowed to advance a playback session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
	/// The local scheduler drives step timing
	#[default]
	Local,
	/// A remote driver pushes every step; no local timers
	Remote,
}

/// Read-only copy of the engine's playback state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlaybackSnapshot {
	pub active_scenario_id: Option<ScenarioId>,
	pub current_step_index: usize,
	pub phase: PlaybackPhase,
	pub speed: Speed,
	pub elapsed_secs: f64,
	pub authority: Authority,
	pub session: u64,
	pub has_pending_timer: bool,
}

impl PlaybackSnapshot {
	pub fn is_active(&self) -> bool {
		self.phase.is_active()
	}

	pub fn is_running(&self) -> bool {
		self.phase == PlaybackPhase::Running
	}

	pub fn is_paused(&self) -> bool {
		self.phase == PlaybackPhase::Paused
	}
}

impl Default for PlaybackSnapshot {
	fn default() -> Self {
		Self {
			active_scenario_id: None,
			current_step_index: 0,
			phase: PlaybackPhase::Idle,
			speed: Speed::NORMAL,
			elapsed_secs: 0.0,
			authority: Authority::Local,
			session: 0,
			has_pending_timer: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_snapshot_wire_format_is_snake_case() {
		let snapshot = PlaybackSnapshot {
			active_scenario_id: Some("ddos".into()),
			current_step_index: 2,
			phase: PlaybackPhase::Paused,
			has_pending_timer: false,
			..PlaybackSnapshot::default()
		};
		assert!(snapshot.is_paused());
		assert!(snapshot.is_active());

		let value = serde_json::to_value(&snapshot).unwrap();
		assert_eq!(value["active_scenario_id"], "ddos");
		assert_eq!(value["current_step_index"], 2);
		assert_eq!(value["phase"], "paused");
		assert_eq!(value["has_pending_timer"], false);
		assert_eq!(value["authority"], "local");
		assert!(value.get("activeScenarioId").is_none());
	}
}
