use crate::catalog::ScenarioCatalog;
use playback_events::{PlaybackCommandData, PlaybackPhase, PlaybackSnapshot};
use std::str::FromStr;

/// Presenter key bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKey {
	/// `space`
	PlayPause,
	/// `esc`
	Stop,
	/// `left`
	PreviousStep,
	/// `right`
	NextStep,
	/// `+`
	Faster,
	/// `-`
	Slower,
	/// `1`..=`9`, as a 0-based catalog position
	Scenario(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown key: {0}")]
pub struct UnknownKey(pub String);

impl FromStr for OperatorKey {
	type Err = UnknownKey;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let token = s.trim().to_ascii_lowercase();
		let key = match token.as_str() {
			"space" | "" => Self::PlayPause,
			"esc" | "escape" => Self::Stop,
			"left" => Self::PreviousStep,
			"right" => Self::NextStep,
			"+" | "=" => Self::Faster,
			"-" | "_" => Self::Slower,
			digit => match digit.parse::<usize>() {
				Ok(n @ 1..=9) => Self::Scenario(n - 1),
				_ => return Err(UnknownKey(s.to_string())),
			},
		};
		Ok(key)
	}
}

impl OperatorKey {
	/// Command for this key given the current state, or `None` when the key has nothing to act on.
	///
	/// Step keys don't check bounds; stepping past either end is left for the engine to reject.
	pub fn to_command(self, snapshot: &PlaybackSnapshot, catalog: &ScenarioCatalog, speed_step: f64) -> Option<PlaybackCommandData> {
		match self {
			Self::PlayPause => match snapshot.phase {
				PlaybackPhase::Running => Some(PlaybackCommandData::PauseScenario),
				PlaybackPhase::Paused => Some(PlaybackCommandData::ResumeScenario),
				PlaybackPhase::Idle | PlaybackPhase::Stopped => None,
			},
			Self::Stop => Some(PlaybackCommandData::StopScenario),
			Self::PreviousStep => step_command(snapshot, -1),
			Self::NextStep => step_command(snapshot, 1),
			Self::Faster => Some(PlaybackCommandData::SetSpeed {
				multiplier: snapshot.speed.stepped(speed_step).value(),
			}),
			Self::Slower => Some(PlaybackCommandData::SetSpeed {
				multiplier: snapshot.speed.stepped(-speed_step).value(),
			}),
			Self::Scenario(position) => catalog.by_position(position).map(|s| PlaybackCommandData::start(s.id.clone())),
		}
	}
}

fn step_command(snapshot: &PlaybackSnapshot, delta: i64) -> Option<PlaybackCommandData> {
	if !snapshot.is_active() {
		return None;
	}
	let scenario_id = snapshot.active_scenario_id.clone()?;
	let current = i64::try_from(snapshot.current_step_index).ok()?;
	Some(PlaybackCommandData::jump_to_step(scenario_id, current + delta))
}
