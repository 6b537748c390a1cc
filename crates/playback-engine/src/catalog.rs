use crate::error::{PlaybackError, Result};
use playback_events::{Scenario, ScenarioId};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Longest nominal step accepted, in seconds (one day)
pub const MAX_STEP_DURATION_SECS: f64 = 86_400.0;

/// On-disk catalog document
#[derive(Debug, Deserialize)]
struct CatalogDocument {
	scenarios: Vec<Scenario>,
}

/// Immutable registry of authored scenarios, in author order
#[derive(Debug)]
pub struct ScenarioCatalog {
	scenarios: Vec<Arc<Scenario>>,
	index: HashMap<ScenarioId, usize>,
}

impl ScenarioCatalog {
	/// Validate and freeze a set of scenarios. Steps are sorted by `order`.
	pub fn new(scenarios: Vec<Scenario>) -> Result<Self> {
		if scenarios.is_empty() {
			return Err(PlaybackError::InvalidCatalog("catalog has no scenarios".into()));
		}

		let mut index = HashMap::with_capacity(scenarios.len());
		let mut frozen = Vec::with_capacity(scenarios.len());

		for (position, mut scenario) in scenarios.into_iter().enumerate() {
			if scenario.id.is_empty() {
				return Err(PlaybackError::InvalidCatalog(format!("scenario {position} has an empty id")));
			}
			if index.insert(scenario.id.clone(), position).is_some() {
				return Err(PlaybackError::InvalidCatalog(format!("duplicate scenario id: {}", scenario.id)));
			}

			validate_steps(&mut scenario)?;
			frozen.push(Arc::new(scenario));
		}

		Ok(Self { scenarios: frozen, index })
	}

	pub fn from_json_str(json: &str) -> Result<Self> {
		let document: CatalogDocument = serde_json::from_str(json).map_err(|e| PlaybackError::InvalidCatalog(e.to_string()))?;
		Self::new(document.scenarios)
	}

	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let json = std::fs::read_to_string(path)?;
		let catalog = Self::from_json_str(&json)?;
		info!("Loaded {} scenarios from {}", catalog.len(), path.display());
		Ok(catalog)
	}

	pub fn get(&self, id: &str) -> Option<&Arc<Scenario>> {
		self.index.get(id).map(|&i| &self.scenarios[i])
	}

	pub fn contains(&self, id: &str) -> bool {
		self.index.contains_key(id)
	}

	/// Scenario at a 0-based author position
	pub fn by_position(&self, position: usize) -> Option<&Arc<Scenario>> {
		self.scenarios.get(position)
	}

	/// Next scenario in author order. With `wrap`, the last one is followed by the first.
	pub fn successor(&self, id: &str, wrap: bool) -> Option<&Arc<Scenario>> {
		let position = *self.index.get(id)?;
		match self.scenarios.get(position + 1) {
			Some(next) => Some(next),
			None if wrap => self.scenarios.first(),
			None => None,
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = &Arc<Scenario>> {
		self.scenarios.iter()
	}

	pub fn ids(&self) -> Vec<&str> {
		self.scenarios.iter().map(|s| s.id.as_str()).collect()
	}

	pub fn len(&self) -> usize {
		self.scenarios.len()
	}

	pub fn is_empty(&self) -> bool {
		self.scenarios.is_empty()
	}
}

fn validate_steps(scenario: &mut Scenario) -> Result<()> {
	let id = &scenario.id;

	if scenario.steps.is_empty() {
		return Err(PlaybackError::InvalidCatalog(format!("scenario '{id}' has no steps")));
	}

	let mut step_ids = HashSet::new();
	for step in &scenario.steps {
		if !step_ids.insert(step.id.as_str()) {
			return Err(PlaybackError::InvalidCatalog(format!("scenario '{id}' has duplicate step id '{}'", step.id)));
		}
		if !step.nominal_duration_secs.is_finite() || step.nominal_duration_secs <= 0.0 {
			return Err(PlaybackError::InvalidCatalog(format!("step '{}' of scenario '{id}' has invalid duration", step.id)));
		}
		if step.nominal_duration_secs > MAX_STEP_DURATION_SECS {
			return Err(PlaybackError::InvalidCatalog(format!(
				"step '{}' of scenario '{id}' runs {}s, longer than the {MAX_STEP_DURATION_SECS}s limit",
				step.id, step.nominal_duration_secs
			)));
		}
	}

	scenario.steps.sort_by_key(|s| s.order);

	// Sorted orders must read 0, 1, ..., N-1
	if let Some((expected, step)) = scenario.steps.iter().enumerate().find(|(expected, step)| step.order != *expected) {
		return Err(PlaybackError::InvalidCatalog(format!(
			"scenario '{id}' step orders are not contiguous: expected {expected}, found {} at step '{}'",
			step.order, step.id
		)));
	}

	Ok(())
}
