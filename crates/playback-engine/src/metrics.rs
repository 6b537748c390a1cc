use crate::bus::{EventBus, Subscription};
use playback_events::{MetricsDelta, PlaybackEvent, ScenarioId, Severity};
use std::sync::{Arc, Mutex, PoisonError};

/// Displayed metrics for the active scenario, accumulated from step deltas
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsBoard {
	scenario_id: Option<ScenarioId>,
	step_index: Option<usize>,
	severity: Severity,
	visualization_target: Option<String>,
	metrics: MetricsDelta,
}

pub type SharedMetricsBoard = Arc<Mutex<MetricsBoard>>;

impl MetricsBoard {
	pub fn new() -> Self {
		Self::default()
	}

	/// Keep a shared board current from `bus`
	pub fn observe(bus: &EventBus) -> (SharedMetricsBoard, Subscription) {
		let board = Arc::new(Mutex::new(Self::new()));
		let subscription = bus.subscribe({
			let board = Arc::clone(&board);
			move |event| board.lock().unwrap_or_else(PoisonError::into_inner).apply(event)
		});
		(board, subscription)
	}

	pub fn apply(&mut self, event: &PlaybackEvent) {
		match event {
			PlaybackEvent::ScenarioStarted { scenario_id, .. } => {
				*self = Self::new();
				self.scenario_id = Some(scenario_id.clone());
			}
			PlaybackEvent::StepChanged { scenario_id, step_index, step } => {
				if self.scenario_id.as_ref() != Some(scenario_id) {
					*self = Self::new();
					self.scenario_id = Some(scenario_id.clone());
				}
				self.step_index = Some(*step_index);
				self.severity = step.severity;
				self.visualization_target = Some(step.visualization_target.clone()).filter(|t| !t.is_empty());
				self.metrics.extend(step.metrics_delta.iter().map(|(k, v)| (k.clone(), v.clone())));
			}
			_ => {}
		}
	}

	pub fn scenario_id(&self) -> Option<&str> {
		self.scenario_id.as_deref()
	}

	pub fn step_index(&self) -> Option<usize> {
		self.step_index
	}

	pub fn severity(&self) -> Severity {
		self.severity
	}

	/// Panel the current step points the audience at
	pub fn visualization_target(&self) -> Option<&str> {
		self.visualization_target.as_deref()
	}

	pub fn metrics(&self) -> &MetricsDelta {
		&self.metrics
	}

	pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
		self.metrics.get(name)
	}
}
