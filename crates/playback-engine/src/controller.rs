//! Playback state machine.
//!
//! The controller owns every piece of mutable playback state and is driven by
//! exactly one task (see [`crate::engine`]). Commands and timer expirations are
//! applied one at a time, so no transition ever observes another half-applied.

use crate::bus::EventBus;
use crate::catalog::ScenarioCatalog;
use crate::commands::{CommandSource, PlaybackCommand};
use crate::config::PlaybackSettings;
use crate::error::{CommandOutcome, PlaybackError, Result};
use crate::scheduler::{Scheduler, TimerHandle};
use playback_events::{Authority, PlaybackEvent, PlaybackPhase, PlaybackSnapshot, Scenario, ScenarioId, Speed, Step};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Where fired timer handles are delivered. The engine posts them back onto its own queue.
pub type TimerSink = Arc<dyn Fn(TimerHandle) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Transition {
	/// Current step's scaled duration elapsed
	AdvanceStep,
	/// Inter-scenario delay elapsed
	AutoStart(ScenarioId),
}

#[derive(Debug)]
struct PendingTimer {
	handle: TimerHandle,
	transition: Transition,
}

/// Nominal seconds spent in the current step.
///
/// Progress accrues at the current speed while running; banking it on every
/// pause or speed change keeps the remaining time exact across both.
#[derive(Debug, Default)]
struct StepClock {
	banked_secs: f64,
	running_since: Option<Instant>,
}

impl StepClock {
	fn restart(&mut self, running_since: Option<Instant>) {
		self.banked_secs = 0.0;
		self.running_since = running_since;
	}

	fn progress(&self, now: Instant, speed: Speed) -> f64 {
		let live = self.running_since.map_or(0.0, |since| now.saturating_duration_since(since).as_secs_f64() * speed.value());
		self.banked_secs + live
	}

	fn freeze(&mut self, now: Instant, speed: Speed) {
		self.banked_secs = self.progress(now, speed);
		self.running_since = None;
	}

	fn run(&mut self, now: Instant) {
		self.running_since = Some(now);
	}
}

#[derive(Debug)]
struct PlaybackState {
	scenario: Option<Arc<Scenario>>,
	step_index: usize,
	phase: PlaybackPhase,
	speed: Speed,
	authority: Authority,
	session: u64,
	clock: StepClock,
	pending: Option<PendingTimer>,
}

pub struct PlaybackController<S: Scheduler> {
	catalog: Arc<ScenarioCatalog>,
	settings: PlaybackSettings,
	scheduler: S,
	bus: Arc<EventBus>,
	timer_sink: TimerSink,
	state: PlaybackState,
}

impl<S: Scheduler> PlaybackController<S> {
	pub fn new(catalog: Arc<ScenarioCatalog>, settings: PlaybackSettings, scheduler: S, bus: Arc<EventBus>, timer_sink: TimerSink) -> Self {
		let speed = settings.initial_speed();
		Self {
			catalog,
			settings,
			scheduler,
			bus,
			timer_sink,
			state: PlaybackState {
				scenario: None,
				step_index: 0,
				phase: PlaybackPhase::Idle,
				speed,
				authority: Authority::Local,
				session: 0,
				clock: StepClock::default(),
				pending: None,
			},
		}
	}

	/// Apply a command after checking the issuer may drive the current session
	pub fn execute(&mut self, source: CommandSource, command: PlaybackCommand) -> Result<CommandOutcome> {
		let name = command.name();
		self.authorize(source, &command)?;

		let outcome = match command {
			PlaybackCommand::Start { scenario_id, authority } => self.start(&scenario_id, authority),
			PlaybackCommand::Pause => self.pause(),
			PlaybackCommand::Resume => self.resume(),
			PlaybackCommand::Stop => self.stop(),
			PlaybackCommand::Seek { step_index } => self.seek(step_index),
			PlaybackCommand::JumpToStep { scenario_id, step_index } => self.jump_to_step(&scenario_id, step_index),
			PlaybackCommand::SetSpeed { multiplier } => self.set_speed(multiplier),
		};

		if let Err(e) = &outcome {
			debug!(command = name, ?source, "Command rejected: {}", e);
		}
		outcome
	}

	/// A session under remote authority only accepts local stop (and start, which then fails as already running)
	fn authorize(&self, source: CommandSource, command: &PlaybackCommand) -> Result<()> {
		let remote_session = self.state.phase.is_active() && self.state.authority == Authority::Remote;
		let exempt = matches!(command, PlaybackCommand::Stop | PlaybackCommand::Start { .. });

		if source == CommandSource::Local && remote_session && !exempt {
			return Err(PlaybackError::NotAuthoritative);
		}
		Ok(())
	}

	pub fn start(&mut self, scenario_id: &str, authority: Authority) -> Result<CommandOutcome> {
		let scenario = Arc::clone(self.catalog.get(scenario_id).ok_or_else(|| PlaybackError::UnknownScenario(scenario_id.to_string()))?);
		if self.state.phase.is_active() {
			return Err(PlaybackError::AlreadyRunning);
		}

		// Supersedes a pending auto-start, if any
		self.cancel_pending();

		let now = self.scheduler.now();
		self.state.session += 1;
		self.state.scenario = Some(Arc::clone(&scenario));
		self.state.step_index = 0;
		self.state.phase = PlaybackPhase::Running;
		self.state.authority = authority;
		self.state.clock.restart(Some(now));
		self.schedule_step_end();

		info!(scenario = %scenario.id, session = self.state.session, ?authority, "Scenario started");

		self.publish(PlaybackEvent::ScenarioStarted {
			scenario_id: scenario.id.clone(),
			authority,
			session: self.state.session,
		});
		self.publish_step_changed(&scenario);
		Ok(CommandOutcome::Applied)
	}

	pub fn pause(&mut self) -> Result<CommandOutcome> {
		match self.state.phase {
			PlaybackPhase::Paused => Ok(CommandOutcome::NoOp),
			PlaybackPhase::Running => {
				let now = self.scheduler.now();
				self.cancel_pending();
				self.state.clock.freeze(now, self.state.speed);
				self.state.phase = PlaybackPhase::Paused;

				let elapsed_secs = self.elapsed_secs();
				debug!(elapsed_secs, "Playback paused");
				self.publish(PlaybackEvent::Paused { elapsed_secs });
				Ok(CommandOutcome::Applied)
			}
			PlaybackPhase::Idle | PlaybackPhase::Stopped => Err(PlaybackError::NotActive),
		}
	}

	pub fn resume(&mut self) -> Result<CommandOutcome> {
		if self.state.phase != PlaybackPhase::Paused {
			return Err(PlaybackError::NotPaused);
		}

		let now = self.scheduler.now();
		self.state.clock.run(now);
		self.state.phase = PlaybackPhase::Running;
		self.schedule_step_end();

		let elapsed_secs = self.elapsed_secs();
		debug!(elapsed_secs, "Playback resumed");
		self.publish(PlaybackEvent::Resumed { elapsed_secs });
		Ok(CommandOutcome::Applied)
	}

	pub fn stop(&mut self) -> Result<CommandOutcome> {
		let cancelled = self.cancel_pending();

		let Some(scenario) = self.active_scenario() else {
			if cancelled {
				info!("Pending auto-start cancelled");
			}
			return Ok(CommandOutcome::NoOp);
		};

		self.clear_session(PlaybackPhase::Idle);
		info!(scenario = %scenario.id, "Scenario stopped");
		self.publish(PlaybackEvent::ScenarioStopped { scenario_id: scenario.id.clone() });
		Ok(CommandOutcome::Applied)
	}

	/// Move to a step of the active scenario. A running session restarts the step's full duration.
	pub fn seek(&mut self, step_index: i64) -> Result<CommandOutcome> {
		let scenario = self.active_scenario().ok_or(PlaybackError::NotActive)?;
		let index = usize::try_from(step_index).ok().filter(|&i| i < scenario.step_count()).ok_or(PlaybackError::OutOfRange {
			index: step_index,
			step_count: scenario.step_count(),
		})?;

		self.cancel_pending();
		let running = self.state.phase == PlaybackPhase::Running;
		let now = self.scheduler.now();

		self.state.step_index = index;
		self.state.clock.restart(running.then_some(now));
		if running {
			self.schedule_step_end();
		}

		debug!(scenario = %scenario.id, step_index = index, "Seek");
		self.publish_step_changed(&scenario);
		Ok(CommandOutcome::Applied)
	}

	pub fn jump_to_step(&mut self, scenario_id: &str, step_index: i64) -> Result<CommandOutcome> {
		if !self.catalog.contains(scenario_id) {
			return Err(PlaybackError::UnknownScenario(scenario_id.to_string()));
		}

		let active = self.active_scenario().ok_or(PlaybackError::NotActive)?;
		if active.id != scenario_id {
			return Err(PlaybackError::ScenarioMismatch {
				requested: scenario_id.to_string(),
				active: active.id.clone(),
			});
		}

		self.seek(step_index)
	}

	/// Clamp and apply a speed multiplier; a running step keeps its nominal progress
	pub fn set_speed(&mut self, multiplier: f64) -> Result<CommandOutcome> {
		let speed = Speed::new(multiplier);
		if speed == self.state.speed {
			return Ok(CommandOutcome::NoOp);
		}

		let running = self.state.phase == PlaybackPhase::Running;
		if running {
			let now = self.scheduler.now();
			self.state.clock.freeze(now, self.state.speed);
			self.state.clock.run(now);
		}

		self.state.speed = speed;
		if running {
			self.schedule_step_end();
		}

		debug!(%speed, "Speed changed");
		self.publish(PlaybackEvent::SpeedChanged { speed });
		Ok(CommandOutcome::Applied)
	}

	/// Timer expiry. Handles that are no longer the pending one are ignored.
	pub fn on_timer(&mut self, handle: TimerHandle) {
		let pending = match self.state.pending.take() {
			Some(pending) if pending.handle == handle => pending,
			other => {
				self.state.pending = other;
				debug!(generation = handle.generation(), "Ignoring stale timer");
				return;
			}
		};

		match pending.transition {
			Transition::AdvanceStep => self.advance(),
			Transition::AutoStart(scenario_id) => {
				if let Err(e) = self.start(&scenario_id, Authority::Local) {
					warn!(scenario = %scenario_id, "Auto-start failed: {}", e);
				}
			}
		}
	}

	pub fn snapshot(&self) -> PlaybackSnapshot {
		PlaybackSnapshot {
			active_scenario_id: self.state.scenario.as_ref().map(|s| s.id.clone()),
			current_step_index: self.state.step_index,
			phase: self.state.phase,
			speed: self.state.speed,
			elapsed_secs: self.elapsed_secs(),
			authority: self.state.authority,
			session: self.state.session,
			has_pending_timer: self.state.pending.is_some(),
		}
	}

	pub fn phase(&self) -> PlaybackPhase {
		self.state.phase
	}

	pub fn speed(&self) -> Speed {
		self.state.speed
	}

	pub fn pending_timer(&self) -> Option<TimerHandle> {
		self.state.pending.as_ref().map(|p| p.handle)
	}

	pub fn bus(&self) -> &Arc<EventBus> {
		&self.bus
	}

	pub fn catalog(&self) -> &Arc<ScenarioCatalog> {
		&self.catalog
	}

	fn advance(&mut self) {
		let Some(scenario) = self.active_scenario().filter(|_| self.state.phase == PlaybackPhase::Running) else {
			warn!("Step timer fired outside a running session");
			return;
		};

		let next = self.state.step_index + 1;
		if next >= scenario.step_count() {
			self.complete(&scenario);
			return;
		}

		let now = self.scheduler.now();
		self.state.step_index = next;
		self.state.clock.restart(Some(now));
		self.schedule_step_end();

		debug!(scenario = %scenario.id, step_index = next, "Advanced to next step");
		self.publish_step_changed(&scenario);
	}

	fn complete(&mut self, scenario: &Scenario) {
		self.clear_session(PlaybackPhase::Idle);
		info!(scenario = %scenario.id, "Scenario completed");
		self.publish(PlaybackEvent::ScenarioCompleted { scenario_id: scenario.id.clone() });

		if !self.settings.auto_advance {
			return;
		}
		if let Some(successor) = self.catalog.successor(&scenario.id, self.settings.loop_catalog) {
			let successor = successor.id.clone();
			let delay = self.settings.inter_scenario_delay();
			info!(scenario = %successor, ?delay, "Auto-advance scheduled");
			self.arm(delay, Transition::AutoStart(successor));
		}
	}

	/// Arm the end of the current step: remaining nominal time, scaled by speed.
	/// Remote sessions are driven entirely by their authority and never arm.
	fn schedule_step_end(&mut self) {
		if self.state.authority == Authority::Remote {
			return;
		}
		let Some(duration) = self.current_step().map(|s| s.nominal_duration_secs) else {
			return;
		};

		let now = self.scheduler.now();
		let remaining = (duration - self.state.clock.progress(now, self.state.speed)).max(0.0);
		let delay = Duration::try_from_secs_f64(remaining / self.state.speed.value()).unwrap_or(Duration::MAX);
		self.arm(delay, Transition::AdvanceStep);
	}

	fn arm(&mut self, delay: Duration, transition: Transition) {
		self.cancel_pending();

		let sink = Arc::clone(&self.timer_sink);
		let handle = self.scheduler.schedule(delay, move |fired| sink(fired));
		debug!(generation = handle.generation(), ?delay, ?transition, "Timer armed");
		self.state.pending = Some(PendingTimer { handle, transition });
	}

	fn cancel_pending(&mut self) -> bool {
		match self.state.pending.take() {
			Some(pending) => {
				self.scheduler.cancel(pending.handle);
				true
			}
			None => false,
		}
	}

	fn clear_session(&mut self, phase: PlaybackPhase) {
		self.cancel_pending();
		self.state.scenario = None;
		self.state.step_index = 0;
		self.state.clock = StepClock::default();
		self.state.phase = phase;
	}

	fn active_scenario(&self) -> Option<Arc<Scenario>> {
		self.state.scenario.as_ref().filter(|_| self.state.phase.is_active()).map(Arc::clone)
	}

	fn current_step(&self) -> Option<&Step> {
		self.state.scenario.as_ref()?.step(self.state.step_index)
	}

	/// Nominal seconds since the scenario began; never runs past the current step's end
	fn elapsed_secs(&self) -> f64 {
		let (Some(scenario), Some(step)) = (self.state.scenario.as_ref(), self.current_step()) else {
			return 0.0;
		};
		let progress = self.state.clock.progress(self.scheduler.now(), self.state.speed).min(step.nominal_duration_secs);
		scenario.step_start_offset(self.state.step_index) + progress
	}

	fn publish_step_changed(&self, scenario: &Scenario) {
		if let Some(step) = scenario.step(self.state.step_index) {
			self.publish(PlaybackEvent::StepChanged {
				scenario_id: scenario.id.clone(),
				step_index: self.state.step_index,
				step: step.clone(),
			});
		}
	}

	fn publish(&self, event: PlaybackEvent) {
		self.bus.publish(&event);
	}
}

impl<S: Scheduler> std::fmt::Debug for PlaybackController<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PlaybackController").field("state", &self.state).field("settings", &self.settings).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scheduler::manual::ManualScheduler;
	use std::sync::Mutex;

	const EPSILON: f64 = 1e-6;

	struct Harness {
		controller: PlaybackController<ManualScheduler>,
		clock: ManualScheduler,
		fired: Arc<Mutex<Vec<TimerHandle>>>,
		events: Arc<Mutex<Vec<(f64, PlaybackEvent)>>>,
	}

	impl Harness {
		fn new(scenarios: Vec<Scenario>, settings: PlaybackSettings) -> Self {
			let catalog = Arc::new(ScenarioCatalog::new(scenarios).unwrap());
			let clock = ManualScheduler::new();
			let bus = Arc::new(EventBus::new());

			let fired = Arc::new(Mutex::new(Vec::new()));
			let sink: TimerSink = {
				let fired = Arc::clone(&fired);
				Arc::new(move |handle| fired.lock().unwrap().push(handle))
			};

			let events = Arc::new(Mutex::new(Vec::new()));
			bus.subscribe({
				let events = Arc::clone(&events);
				let clock = clock.clone();
				move |event| events.lock().unwrap().push((clock.elapsed().as_secs_f64(), event.clone()))
			});

			let controller = PlaybackController::new(catalog, settings, clock.clone(), bus, sink);
			Self { controller, clock, fired, events }
		}

		fn single(durations: &[f64]) -> Self {
			Self::new(vec![Scenario::from_durations("s", durations)], PlaybackSettings::default())
		}

		/// Advance virtual time, feeding every fired timer back to the controller as the engine would
		fn run_until(&mut self, secs: f64) {
			let target = Duration::from_secs_f64(secs);
			loop {
				match self.clock.next_deadline() {
					Some(at) if at <= target => {
						self.clock.advance_to(at);
						self.drain_fired();
					}
					_ => {
						self.clock.advance_to(target);
						self.drain_fired();
						break;
					}
				}
			}
		}

		fn drain_fired(&mut self) {
			let fired: Vec<TimerHandle> = std::mem::take(&mut *self.fired.lock().unwrap());
			for handle in fired {
				self.controller.on_timer(handle);
			}
		}

		fn events(&self) -> Vec<(f64, PlaybackEvent)> {
			self.events.lock().unwrap().clone()
		}

		fn kinds(&self) -> Vec<&'static str> {
			self.events().iter().map(|(_, e)| e.kind()).collect()
		}

		fn step_changes(&self) -> Vec<(f64, String, usize)> {
			self.events()
				.into_iter()
				.filter_map(|(at, e)| match e {
					PlaybackEvent::StepChanged { scenario_id, step_index, .. } => Some((at, scenario_id, step_index)),
					_ => None,
				})
				.collect()
		}

		fn clear_events(&self) {
			self.events.lock().unwrap().clear();
		}
	}

	fn assert_close(actual: f64, expected: f64) {
		assert!((actual - expected).abs() < EPSILON, "expected {expected}, got {actual}");
	}

	#[test]
	fn test_start_publishes_started_then_first_step() {
		let mut h = Harness::single(&[10.0, 20.0]);

		assert_eq!(h.controller.start("s", Authority::Local).unwrap(), CommandOutcome::Applied);

		assert_eq!(h.kinds(), vec!["scenario_started", "step_changed"]);
		let snapshot = h.controller.snapshot();
		assert_eq!(snapshot.active_scenario_id.as_deref(), Some("s"));
		assert_eq!(snapshot.current_step_index, 0);
		assert_eq!(snapshot.phase, PlaybackPhase::Running);
		assert_eq!(snapshot.session, 1);
		assert!(snapshot.has_pending_timer);
		assert_eq!(h.clock.next_deadline(), Some(Duration::from_secs(10)));
	}

	#[test]
	fn test_start_rejections_leave_state_untouched() {
		let mut h = Harness::single(&[10.0]);

		assert!(matches!(h.controller.start("nope", Authority::Local), Err(PlaybackError::UnknownScenario(id)) if id == "nope"));
		assert!(h.events().is_empty());

		h.controller.start("s", Authority::Local).unwrap();
		let before = h.controller.snapshot();
		h.clear_events();

		assert!(matches!(h.controller.start("s", Authority::Local), Err(PlaybackError::AlreadyRunning)));
		h.controller.pause().unwrap();
		h.clear_events();
		assert!(matches!(h.controller.start("s", Authority::Local), Err(PlaybackError::AlreadyRunning)));
		assert!(h.events().is_empty());
		assert_eq!(h.controller.snapshot().session, before.session);
	}

	#[test]
	fn test_steps_advance_monotonically_and_complete_once() {
		let mut h = Harness::single(&[10.0, 20.0, 30.0]);

		h.controller.start("s", Authority::Local).unwrap();
		h.run_until(500.0);

		let steps: Vec<(f64, usize)> = h.step_changes().into_iter().map(|(at, _, i)| (at, i)).collect();
		assert_eq!(steps, vec![(0.0, 0), (10.0, 1), (30.0, 2)]);

		let completions: Vec<f64> = h
			.events()
			.into_iter()
			.filter(|(_, e)| matches!(e, PlaybackEvent::ScenarioCompleted { .. }))
			.map(|(at, _)| at)
			.collect();
		assert_eq!(completions, vec![60.0]);

		let snapshot = h.controller.snapshot();
		assert_eq!(snapshot.phase, PlaybackPhase::Idle);
		assert!(snapshot.active_scenario_id.is_none());
		assert!(!snapshot.has_pending_timer);
		assert_eq!(h.clock.outstanding(), 0);
	}

	#[test]
	fn test_pause_resume_keeps_remaining_time() {
		let mut h = Harness::single(&[60.0, 10.0]);

		h.controller.start("s", Authority::Local).unwrap();
		h.run_until(20.0);
		h.controller.pause().unwrap();
		assert_close(h.controller.snapshot().elapsed_secs, 20.0);
		assert!(!h.controller.snapshot().has_pending_timer);

		// Arbitrarily long pause: nothing advances
		h.run_until(500.0);
		assert_eq!(h.step_changes().len(), 1);
		assert_close(h.controller.snapshot().elapsed_secs, 20.0);

		h.controller.resume().unwrap();
		h.run_until(600.0);

		let steps = h.step_changes();
		assert_eq!(steps.len(), 2);
		assert_close(steps[1].0, 540.0);
		assert_eq!(steps[1].2, 1);
	}

	#[test]
	fn test_pause_at_start_delays_first_transition() {
		let mut h = Harness::single(&[10.0, 20.0, 30.0]);

		h.controller.start("s", Authority::Local).unwrap();
		h.controller.pause().unwrap();
		h.run_until(5.0);
		h.controller.resume().unwrap();
		h.run_until(40.0);

		let steps: Vec<(f64, usize)> = h.step_changes().into_iter().map(|(at, _, i)| (at, i)).collect();
		assert_eq!(steps, vec![(0.0, 0), (15.0, 1), (35.0, 2)]);
	}

	#[test]
	fn test_speed_scales_step_duration() {
		let mut h = Harness::single(&[30.0, 10.0]);

		h.controller.set_speed(2.0).unwrap();
		h.controller.start("s", Authority::Local).unwrap();
		h.run_until(16.0);

		let steps = h.step_changes();
		assert_eq!(steps.len(), 2);
		assert_close(steps[1].0, 15.0);
	}

	#[test]
	fn test_speed_change_mid_step_rescales_remaining() {
		let mut h = Harness::single(&[60.0, 10.0]);

		h.controller.start("s", Authority::Local).unwrap();
		h.run_until(20.0);
		assert_eq!(h.controller.set_speed(2.0).unwrap(), CommandOutcome::Applied);

		// 40 nominal seconds left at 2x
		assert_eq!(h.clock.next_deadline(), Some(Duration::from_secs(40)));
		h.run_until(41.0);
		assert_close(h.step_changes()[1].0, 40.0);
		assert_eq!(h.clock.max_outstanding(), 1);
	}

	#[test]
	fn test_speed_change_while_paused_applies_on_resume() {
		let mut h = Harness::single(&[60.0, 10.0]);

		h.controller.start("s", Authority::Local).unwrap();
		h.run_until(20.0);
		h.controller.pause().unwrap();

		assert!(h.controller.set_speed(2.0).unwrap().is_applied());
		assert!(h.controller.snapshot().is_paused());
		assert!(!h.controller.snapshot().has_pending_timer);
		assert_close(h.controller.snapshot().elapsed_secs, 20.0);

		h.run_until(100.0);
		h.controller.resume().unwrap();

		// 40 nominal seconds left, run at 2x
		assert_eq!(h.clock.next_deadline(), Some(Duration::from_secs(120)));
		h.run_until(121.0);
		assert_close(h.step_changes()[1].0, 120.0);
	}

	#[test]
	fn test_longest_step_at_slowest_speed_schedules() {
		let mut h = Harness::new(vec![Scenario::from_durations("long", &[crate::catalog::MAX_STEP_DURATION_SECS])], PlaybackSettings::default());

		h.controller.set_speed(0.25).unwrap();
		h.controller.start("long", Authority::Local).unwrap();

		assert_eq!(h.clock.next_deadline(), Some(Duration::from_secs(4 * 86_400)));
		assert_eq!(h.controller.pause().unwrap(), CommandOutcome::Applied);
	}

	#[test]
	fn test_speed_is_clamped_and_unchanged_speed_is_noop() {
		let mut h = Harness::single(&[10.0]);

		h.controller.set_speed(10.0).unwrap();
		assert_eq!(h.controller.speed().value(), playback_events::MAX_SPEED);
		assert_eq!(h.controller.set_speed(3.0).unwrap(), CommandOutcome::NoOp);

		h.controller.set_speed(0.0).unwrap();
		assert_eq!(h.controller.speed().value(), playback_events::MIN_SPEED);

		let speed_events = h.events().iter().filter(|(_, e)| matches!(e, PlaybackEvent::SpeedChanged { .. })).count();
		assert_eq!(speed_events, 2);
	}

	#[test]
	fn test_pause_and_stop_are_idempotent() {
		let mut h = Harness::single(&[10.0, 10.0]);

		assert_eq!(h.controller.stop().unwrap(), CommandOutcome::NoOp);
		assert!(h.events().is_empty());

		h.controller.start("s", Authority::Local).unwrap();
		h.clear_events();

		assert_eq!(h.controller.pause().unwrap(), CommandOutcome::Applied);
		assert_eq!(h.controller.pause().unwrap(), CommandOutcome::NoOp);
		assert_eq!(h.kinds(), vec!["paused"]);

		assert_eq!(h.controller.stop().unwrap(), CommandOutcome::Applied);
		assert_eq!(h.controller.stop().unwrap(), CommandOutcome::NoOp);
		assert_eq!(h.kinds(), vec!["paused", "scenario_stopped"]);
		assert_eq!(h.controller.phase(), PlaybackPhase::Idle);
		assert!(h.controller.snapshot().active_scenario_id.is_none());
		assert_eq!(h.clock.outstanding(), 0);
	}

	#[test]
	fn test_commands_that_need_an_active_scenario() {
		let mut h = Harness::single(&[10.0]);

		assert!(matches!(h.controller.pause(), Err(PlaybackError::NotActive)));
		assert!(matches!(h.controller.resume(), Err(PlaybackError::NotPaused)));
		assert!(matches!(h.controller.seek(0), Err(PlaybackError::NotActive)));
		assert!(matches!(h.controller.jump_to_step("s", 0), Err(PlaybackError::NotActive)));

		h.controller.start("s", Authority::Local).unwrap();
		assert!(matches!(h.controller.resume(), Err(PlaybackError::NotPaused)));
	}

	#[test]
	fn test_seek_out_of_range_changes_nothing() {
		let mut h = Harness::single(&[10.0, 20.0, 30.0]);

		h.controller.start("s", Authority::Local).unwrap();
		h.run_until(5.0);
		let before = h.controller.snapshot();
		let pending = h.controller.pending_timer();
		h.clear_events();

		for index in [3, -1, i64::MAX] {
			let err = h.controller.jump_to_step("s", index).unwrap_err();
			assert!(matches!(err, PlaybackError::OutOfRange { step_count: 3, .. }));
		}

		assert!(h.events().is_empty());
		assert_eq!(h.controller.snapshot(), before);
		assert_eq!(h.controller.pending_timer(), pending);
	}

	#[test]
	fn test_jump_to_step_validates_scenario() {
		let mut h = Harness::new(
			vec![Scenario::from_durations("a", &[10.0, 10.0]), Scenario::from_durations("b", &[10.0])],
			PlaybackSettings::default(),
		);

		h.controller.start("a", Authority::Local).unwrap();

		assert!(matches!(h.controller.jump_to_step("zzz", 0), Err(PlaybackError::UnknownScenario(_))));
		assert!(matches!(
			h.controller.jump_to_step("b", 0),
			Err(PlaybackError::ScenarioMismatch { requested, active }) if requested == "b" && active == "a"
		));
		assert_eq!(h.controller.jump_to_step("a", 1).unwrap(), CommandOutcome::Applied);
		assert_eq!(h.controller.snapshot().current_step_index, 1);
	}

	#[test]
	fn test_seek_while_running_restarts_full_step() {
		let mut h = Harness::single(&[10.0, 20.0, 30.0]);

		h.controller.start("s", Authority::Local).unwrap();
		h.run_until(5.0);
		h.controller.seek(1).unwrap();

		assert_close(h.controller.snapshot().elapsed_secs, 10.0);
		assert_eq!(h.clock.next_deadline(), Some(Duration::from_secs(25)));

		h.run_until(26.0);
		assert_eq!(h.step_changes().last().map(|(at, _, i)| (*at, *i)), Some((25.0, 2)));
	}

	#[test]
	fn test_seek_while_paused_stays_paused() {
		let mut h = Harness::single(&[10.0, 20.0, 30.0]);

		// Start at t=0, pause at t=0, jump to step 1 at t=5, resume at t=5
		h.controller.start("s", Authority::Local).unwrap();
		h.controller.pause().unwrap();
		h.clock.jump_to(Duration::from_secs(5));
		h.controller.jump_to_step("s", 1).unwrap();

		let snapshot = h.controller.snapshot();
		assert_eq!(snapshot.phase, PlaybackPhase::Paused);
		assert_eq!(snapshot.current_step_index, 1);
		assert!(!snapshot.has_pending_timer);
		assert_close(snapshot.elapsed_secs, 10.0);

		h.controller.resume().unwrap();
		h.run_until(30.0);

		// Step 1 shows at t=5, step 2 follows its full 20 seconds later
		let steps: Vec<(f64, usize)> = h.step_changes().into_iter().map(|(at, _, i)| (at, i)).collect();
		assert_eq!(steps, vec![(0.0, 0), (5.0, 1), (25.0, 2)]);
	}

	#[test]
	fn test_elapsed_tracks_nominal_time() {
		let mut h = Harness::single(&[10.0, 20.0, 30.0]);

		h.controller.start("s", Authority::Local).unwrap();
		h.run_until(25.0);
		assert_close(h.controller.snapshot().elapsed_secs, 25.0);

		h.controller.set_speed(2.0).unwrap();
		h.run_until(27.0);
		assert_close(h.controller.snapshot().elapsed_secs, 29.0);
	}

	#[test]
	fn test_single_pending_timer_under_command_churn() {
		let mut h = Harness::new(
			vec![Scenario::from_durations("a", &[10.0, 20.0, 30.0]), Scenario::from_durations("b", &[5.0])],
			PlaybackSettings::new().with_auto_advance(true).with_inter_scenario_delay(1000),
		);

		h.controller.start("a", Authority::Local).unwrap();
		for (at, op) in [(3.0, 0), (4.0, 1), (6.0, 2), (7.0, 3), (9.0, 4), (12.0, 1), (14.0, 5), (15.0, 3)] {
			h.run_until(at);
			let _ = match op {
				0 => h.controller.set_speed(2.0),
				1 => h.controller.pause(),
				2 => h.controller.resume(),
				3 => h.controller.seek(2),
				4 => h.controller.set_speed(0.5),
				_ => h.controller.resume(),
			};
			assert!(h.clock.outstanding() <= 1);
			assert_eq!(h.clock.outstanding(), usize::from(h.controller.snapshot().has_pending_timer));
		}

		h.run_until(1_000.0);
		assert_eq!(h.clock.max_outstanding(), 1);
		assert_eq!(h.clock.outstanding(), 0);
	}

	#[test]
	fn test_stale_timer_is_ignored() {
		let mut h = Harness::single(&[10.0, 20.0, 30.0]);

		h.controller.start("s", Authority::Local).unwrap();
		let stale = h.controller.pending_timer().unwrap();
		h.controller.pause().unwrap();
		h.clear_events();

		h.controller.on_timer(stale);
		assert!(h.events().is_empty());
		assert_eq!(h.controller.snapshot().current_step_index, 0);

		h.controller.resume().unwrap();
		let current = h.controller.pending_timer();
		h.controller.on_timer(stale);
		assert_eq!(h.controller.pending_timer(), current);
	}

	#[test]
	fn test_auto_advance_starts_successor_after_delay() {
		let mut h = Harness::new(
			vec![Scenario::from_durations("a", &[5.0]), Scenario::from_durations("b", &[5.0])],
			PlaybackSettings::new().with_auto_advance(true).with_inter_scenario_delay(3000),
		);

		h.controller.start("a", Authority::Local).unwrap();
		h.run_until(100.0);

		let timeline: Vec<(f64, &'static str, Option<String>)> = h.events().into_iter().map(|(at, e)| (at, e.kind(), e.scenario_id().map(str::to_string))).collect();
		assert_eq!(
			timeline,
			vec![
				(0.0, "scenario_started", Some("a".into())),
				(0.0, "step_changed", Some("a".into())),
				(5.0, "scenario_completed", Some("a".into())),
				(8.0, "scenario_started", Some("b".into())),
				(8.0, "step_changed", Some("b".into())),
				(13.0, "scenario_completed", Some("b".into())),
			]
		);
		assert_eq!(h.controller.snapshot().session, 2);
	}

	#[test]
	fn test_loop_catalog_wraps_to_first() {
		let mut h = Harness::new(
			vec![Scenario::from_durations("a", &[5.0]), Scenario::from_durations("b", &[5.0])],
			PlaybackSettings::new().with_auto_advance(true).with_inter_scenario_delay(0).with_loop_catalog(true),
		);

		h.controller.start("b", Authority::Local).unwrap();
		h.run_until(12.0);

		let started: Vec<String> = h
			.events()
			.into_iter()
			.filter_map(|(_, e)| match e {
				PlaybackEvent::ScenarioStarted { scenario_id, .. } => Some(scenario_id),
				_ => None,
			})
			.collect();
		assert_eq!(started, vec!["b", "a", "b"]);
	}

	#[test]
	fn test_stop_cancels_pending_auto_start() {
		let mut h = Harness::new(
			vec![Scenario::from_durations("a", &[5.0]), Scenario::from_durations("b", &[5.0])],
			PlaybackSettings::new().with_auto_advance(true),
		);

		h.controller.start("a", Authority::Local).unwrap();
		h.run_until(6.0);
		assert!(h.controller.snapshot().has_pending_timer);

		assert_eq!(h.controller.stop().unwrap(), CommandOutcome::NoOp);
		assert!(!h.controller.snapshot().has_pending_timer);

		h.run_until(60.0);
		assert_eq!(h.kinds().iter().filter(|k| **k == "scenario_started").count(), 1);
	}

	#[test]
	fn test_manual_start_supersedes_pending_auto_start() {
		let mut h = Harness::new(
			vec![Scenario::from_durations("a", &[5.0]), Scenario::from_durations("b", &[5.0])],
			PlaybackSettings::new().with_auto_advance(true),
		);

		h.controller.start("a", Authority::Local).unwrap();
		h.run_until(6.0);
		h.controller.start("a", Authority::Local).unwrap();
		h.run_until(8.5);

		// "b" would have auto-started at t=8
		assert_eq!(h.controller.snapshot().active_scenario_id.as_deref(), Some("a"));
		assert_eq!(h.clock.max_outstanding(), 1);
	}

	#[test]
	fn test_remote_session_never_arms_timers() {
		let mut h = Harness::single(&[10.0, 20.0]);

		h.controller.execute(CommandSource::Remote, PlaybackCommand::Start { scenario_id: "s".into(), authority: Authority::Remote }).unwrap();
		h.run_until(1_000.0);

		let snapshot = h.controller.snapshot();
		assert_eq!(snapshot.current_step_index, 0);
		assert_eq!(snapshot.authority, Authority::Remote);
		assert!(!snapshot.has_pending_timer);
		assert_eq!(h.clock.counts(), (0, 0));

		assert!(matches!(h.controller.execute(CommandSource::Local, PlaybackCommand::Seek { step_index: 1 }), Err(PlaybackError::NotAuthoritative)));
		assert!(matches!(h.controller.execute(CommandSource::Local, PlaybackCommand::Pause), Err(PlaybackError::NotAuthoritative)));

		let jump = PlaybackCommand::JumpToStep { scenario_id: "s".into(), step_index: 1 };
		assert_eq!(h.controller.execute(CommandSource::Remote, jump).unwrap(), CommandOutcome::Applied);
		assert_eq!(h.controller.snapshot().current_step_index, 1);
		assert_eq!(h.clock.counts(), (0, 0));

		assert_eq!(h.controller.execute(CommandSource::Local, PlaybackCommand::Stop).unwrap(), CommandOutcome::Applied);

		// Authority no longer binds once the session is over
		assert_eq!(h.controller.execute(CommandSource::Local, PlaybackCommand::SetSpeed { multiplier: 2.0 }).unwrap(), CommandOutcome::Applied);
	}

	#[test]
	fn test_remote_session_ends_only_by_stop() {
		let mut h = Harness::single(&[10.0, 20.0]);

		h.controller.execute(CommandSource::Remote, PlaybackCommand::Start { scenario_id: "s".into(), authority: Authority::Remote }).unwrap();
		h.controller.execute(CommandSource::Remote, PlaybackCommand::JumpToStep { scenario_id: "s".into(), step_index: 1 }).unwrap();
		h.clear_events();

		// Jumping past the last step does not complete the session
		let past_end = PlaybackCommand::JumpToStep { scenario_id: "s".into(), step_index: 2 };
		assert!(matches!(h.controller.execute(CommandSource::Remote, past_end), Err(PlaybackError::OutOfRange { index: 2, step_count: 2 })));
		assert!(h.controller.snapshot().is_running());
		assert!(h.events().is_empty());

		assert_eq!(h.controller.execute(CommandSource::Remote, PlaybackCommand::Stop).unwrap(), CommandOutcome::Applied);
		assert_eq!(h.kinds(), vec!["scenario_stopped"]);
		assert_eq!(h.controller.phase(), PlaybackPhase::Idle);
	}

	#[test]
	fn test_remote_commands_drive_local_session() {
		let mut h = Harness::single(&[10.0, 20.0]);

		h.controller.start("s", Authority::Local).unwrap();
		assert_eq!(h.controller.execute(CommandSource::Remote, PlaybackCommand::Pause).unwrap(), CommandOutcome::Applied);
		assert_eq!(h.controller.phase(), PlaybackPhase::Paused);
	}
}
