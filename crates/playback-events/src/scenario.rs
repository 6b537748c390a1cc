use super::types::{MetricsDelta, ScenarioId, Severity, StepId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One narrative beat of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
	pub id: StepId,
	/// 0-based position within the scenario
	pub order: usize,
	/// Pacing at speed 1.0
	pub nominal_duration_secs: f64,
	#[serde(default)]
	pub metrics_delta: MetricsDelta,
	#[serde(default)]
	pub severity: Severity,
	/// Opaque panel identifier this step is about
	pub visualization_target: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub title: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub narrative: String,
}

impl Step {
	pub fn new(id: impl Into<StepId>, order: usize, nominal_duration_secs: f64) -> Self {
		Self {
			id: id.into(),
			order,
			nominal_duration_secs,
			metrics_delta: MetricsDelta::new(),
			severity: Severity::Info,
			visualization_target: String::new(),
			title: String::new(),
			narrative: String::new(),
		}
	}

	pub fn with_metric(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.metrics_delta.insert(name.into(), value.into());
		self
	}

	pub fn with_severity(mut self, severity: Severity) -> Self {
		self.severity = severity;
		self
	}

	pub fn targeting(mut self, visualization_target: impl Into<String>) -> Self {
		self.visualization_target = visualization_target.into();
		self
	}

	pub fn nominal_duration(&self) -> Duration {
		Duration::from_secs_f64(self.nominal_duration_secs)
	}
}

/// An authored, ordered sequence of steps plus metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
	pub id: ScenarioId,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub category: String,
	/// Target running time; not derived from the steps
	pub total_duration_secs: f64,
	#[serde(default)]
	pub business_value: String,
	pub steps: Vec<Step>,
}

impl Scenario {
	pub fn new(id: impl Into<ScenarioId>, steps: Vec<Step>) -> Self {
		let total_duration_secs = steps.iter().map(|s| s.nominal_duration_secs).sum();
		Self {
			id: id.into(),
			title: String::new(),
			category: String::new(),
			total_duration_secs,
			business_value: String::new(),
			steps,
		}
	}

	/// Build a scenario whose steps are numbered from the given durations
	pub fn from_durations(id: impl Into<ScenarioId>, durations: &[f64]) -> Self {
		let steps = durations.iter().enumerate().map(|(order, &secs)| Step::new(format!("step_{order}"), order, secs)).collect();
		Self::new(id, steps)
	}

	pub fn with_category(mut self, category: impl Into<String>) -> Self {
		self.category = category.into();
		self
	}

	pub fn with_business_value(mut self, business_value: impl Into<String>) -> Self {
		self.business_value = business_value.into();
		self
	}

	pub fn step_count(&self) -> usize {
		self.steps.len()
	}

	pub fn step(&self, index: usize) -> Option<&Step> {
		self.steps.get(index)
	}

	pub fn is_last_step(&self, index: usize) -> bool {
		index + 1 == self.steps.len()
	}

	/// Cumulative nominal start of the step at `index`, in seconds
	pub fn step_start_offset(&self, index: usize) -> f64 {
		self.steps.iter().take(index).map(|s| s.nominal_duration_secs).sum()
	}

	pub fn nominal_step_sum(&self) -> f64 {
		self.steps.iter().map(|s| s.nominal_duration_secs).sum()
	}
}
