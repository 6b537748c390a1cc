use crate::bus::{EventBus, Subscription};
use crate::catalog::ScenarioCatalog;
use crate::commands::{CommandSource, PlaybackCommand};
use crate::config::PlaybackSettings;
use crate::controller::PlaybackController;
use crate::engine::{timer_sink, EngineMsg, PlaybackActor};
use crate::error::{CommandOutcome, PlaybackError, Result};
use crate::scheduler::TokioScheduler;
use playback_events::{Authority, PlaybackCommandData, PlaybackEvent, PlaybackSnapshot, ScenarioId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Owns the engine task. Cloneable [`PlaybackHandle`]s drive it.
pub struct PlaybackEngine {
	handle: PlaybackHandle,
	task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
	cancel_token: CancellationToken,
}

impl PlaybackEngine {
	/// Spawn the engine task. Must be called within a tokio runtime.
	pub fn new(catalog: Arc<ScenarioCatalog>, settings: PlaybackSettings) -> Self {
		let cancel_token = CancellationToken::new();
		let (command_tx, command_rx) = mpsc::unbounded_channel();
		let bus = Arc::new(EventBus::new());

		let controller = PlaybackController::new(Arc::clone(&catalog), settings, TokioScheduler::new(), Arc::clone(&bus), timer_sink(&command_tx));
		let (actor, state_rx) = PlaybackActor::new(controller);
		let task_handle = tokio::spawn(actor.run(command_rx, cancel_token.clone()));

		info!("PlaybackEngine created");

		Self {
			handle: PlaybackHandle { command_tx, state_rx, bus, catalog },
			task_handle: Arc::new(Mutex::new(Some(task_handle))),
			cancel_token,
		}
	}

	pub fn handle(&self) -> PlaybackHandle {
		self.handle.clone()
	}

	/// Stop the engine task and wait for it. Pending timers are dropped with it.
	pub async fn shutdown(&self) {
		self.cancel_token.cancel();
		if let Some(handle) = self.task_handle.lock().await.take() {
			let _ = handle.await;
		}
	}
}

impl std::ops::Deref for PlaybackEngine {
	type Target = PlaybackHandle;

	fn deref(&self) -> &Self::Target {
		&self.handle
	}
}

impl Drop for PlaybackEngine {
	fn drop(&mut self) {
		self.cancel_token.cancel();
	}
}

/// Command and observation surface of a running engine
#[derive(Clone)]
pub struct PlaybackHandle {
	command_tx: mpsc::UnboundedSender<EngineMsg>,
	state_rx: watch::Receiver<PlaybackSnapshot>,
	bus: Arc<EventBus>,
	catalog: Arc<ScenarioCatalog>,
}

impl PlaybackHandle {
	/// Queue a command and await its outcome
	pub async fn execute(&self, source: CommandSource, command: PlaybackCommand) -> Result<CommandOutcome> {
		let (response, rx) = oneshot::channel();
		self.command_tx.send(EngineMsg::Command { source, command, response }).map_err(|_| PlaybackError::Internal("Failed to send command".into()))?;

		rx.await.map_err(|_| PlaybackError::Internal("Engine dropped".into()))?
	}

	/// Wire-command entry point. Starts default to local authority.
	pub async fn dispatch(&self, source: CommandSource, data: PlaybackCommandData) -> Result<CommandOutcome> {
		self.execute(source, PlaybackCommand::from_data(data, Authority::Local)).await
	}

	pub async fn start(&self, scenario_id: impl Into<ScenarioId>) -> Result<CommandOutcome> {
		self.start_with_authority(scenario_id, Authority::Local).await
	}

	pub async fn start_with_authority(&self, scenario_id: impl Into<ScenarioId>, authority: Authority) -> Result<CommandOutcome> {
		let command = PlaybackCommand::Start {
			scenario_id: scenario_id.into(),
			authority,
		};
		self.execute(CommandSource::Local, command).await
	}

	pub async fn pause(&self) -> Result<CommandOutcome> {
		self.execute(CommandSource::Local, PlaybackCommand::Pause).await
	}

	pub async fn resume(&self) -> Result<CommandOutcome> {
		self.execute(CommandSource::Local, PlaybackCommand::Resume).await
	}

	pub async fn stop(&self) -> Result<CommandOutcome> {
		self.execute(CommandSource::Local, PlaybackCommand::Stop).await
	}

	/// Seek within the active scenario
	pub async fn seek(&self, step_index: i64) -> Result<CommandOutcome> {
		self.execute(CommandSource::Local, PlaybackCommand::Seek { step_index }).await
	}

	pub async fn jump_to_step(&self, scenario_id: impl Into<ScenarioId>, step_index: i64) -> Result<CommandOutcome> {
		let command = PlaybackCommand::JumpToStep {
			scenario_id: scenario_id.into(),
			step_index,
		};
		self.execute(CommandSource::Local, command).await
	}

	pub async fn set_speed(&self, multiplier: f64) -> Result<CommandOutcome> {
		self.execute(CommandSource::Local, PlaybackCommand::SetSpeed { multiplier }).await
	}

	/// Fresh snapshot, with elapsed time computed at the moment of the request
	pub async fn snapshot(&self) -> Result<PlaybackSnapshot> {
		let (tx, rx) = oneshot::channel();
		self.command_tx.send(EngineMsg::Snapshot(tx)).map_err(|_| PlaybackError::Internal("Failed to send command".into()))?;
		rx.await.map_err(|_| PlaybackError::Internal("Engine dropped".into()))
	}

	/// Snapshot as of the last processed command or timer
	pub fn current_state(&self) -> PlaybackSnapshot {
		self.state_rx.borrow().clone()
	}

	pub fn watch_state(&self) -> watch::Receiver<PlaybackSnapshot> {
		self.state_rx.clone()
	}

	/// Observers run on the engine task; keep them short and non-blocking
	pub fn subscribe<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&PlaybackEvent) + Send + Sync + 'static,
	{
		self.bus.subscribe(handler)
	}

	pub fn subscribe_channel(&self) -> (Subscription, mpsc::UnboundedReceiver<PlaybackEvent>) {
		self.bus.subscribe_channel()
	}

	pub fn unsubscribe(&self, subscription: Subscription) -> bool {
		self.bus.unsubscribe(subscription)
	}

	pub fn bus(&self) -> &Arc<EventBus> {
		&self.bus
	}

	pub fn catalog(&self) -> &Arc<ScenarioCatalog> {
		&self.catalog
	}

	pub fn is_closed(&self) -> bool {
		self.command_tx.is_closed()
	}
}
