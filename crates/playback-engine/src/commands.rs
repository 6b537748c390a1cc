use playback_events::{Authority, PlaybackCommandData, ScenarioId};

/// Who issued a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandSource {
	/// Operator console or in-process caller
	Local,
	/// Remote driver, via RemoteSync
	Remote,
}

/// Command as the controller consumes it, with the session authority resolved
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
	Start { scenario_id: ScenarioId, authority: Authority },
	Pause,
	Resume,
	Stop,
	Seek { step_index: i64 },
	JumpToStep { scenario_id: ScenarioId, step_index: i64 },
	SetSpeed { multiplier: f64 },
}

impl PlaybackCommand {
	/// Convert from the wire command; `default_authority` applies to starts that don't name one
	pub fn from_data(data: PlaybackCommandData, default_authority: Authority) -> Self {
		match data {
			PlaybackCommandData::StartScenario { scenario_id, authority } => Self::Start {
				scenario_id,
				authority: authority.unwrap_or(default_authority),
			},
			PlaybackCommandData::PauseScenario => Self::Pause,
			PlaybackCommandData::ResumeScenario => Self::Resume,
			PlaybackCommandData::StopScenario => Self::Stop,
			PlaybackCommandData::JumpToStep { scenario_id, step_index } => Self::JumpToStep { scenario_id, step_index },
			PlaybackCommandData::SetSpeed { multiplier } => Self::SetSpeed { multiplier },
		}
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Start { .. } => "start",
			Self::Pause => "pause",
			Self::Resume => "resume",
			Self::Stop => "stop",
			Self::Seek { .. } => "seek",
			Self::JumpToStep { .. } => "jump_to_step",
			Self::SetSpeed { .. } => "set_speed",
		}
	}
}
