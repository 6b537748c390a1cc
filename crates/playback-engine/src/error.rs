use playback_events::ScenarioId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlaybackError>;

#[derive(Debug, Error)]
pub enum PlaybackError {
	#[error("Unknown scenario: {0}")]
	UnknownScenario(ScenarioId),

	#[error("A scenario is already running")]
	AlreadyRunning,

	#[error("Playback is not paused")]
	NotPaused,

	#[error("No scenario is active")]
	NotActive,

	#[error("Step index {index} out of range (scenario has {step_count} steps)")]
	OutOfRange { index: i64, step_count: usize },

	#[error("Scenario {requested} is not the active scenario ({active})")]
	ScenarioMismatch { requested: ScenarioId, active: ScenarioId },

	#[error("This session is driven by its remote authority")]
	NotAuthoritative,

	#[error("Invalid scenario catalog: {0}")]
	InvalidCatalog(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Internal error: {0}")]
	Internal(String),
}

impl PlaybackError {
	/// Command rejections: the caller sent something invalid for the current state
	pub fn is_recoverable(&self) -> bool {
		matches!(
			self,
			Self::UnknownScenario(_) | Self::AlreadyRunning | Self::NotPaused | Self::NotActive | Self::OutOfRange { .. } | Self::ScenarioMismatch { .. } | Self::NotAuthoritative
		)
	}
}

/// Successful result of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
	/// State transitioned and observers were notified
	Applied,
	/// Accepted, but there was nothing to do
	NoOp,
}

impl CommandOutcome {
	pub fn is_applied(self) -> bool {
		self == Self::Applied
	}
}
