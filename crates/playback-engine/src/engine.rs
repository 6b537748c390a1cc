use crate::commands::{CommandSource, PlaybackCommand};
use crate::controller::{PlaybackController, TimerSink};
use crate::error::{CommandOutcome, Result};
use crate::scheduler::{Scheduler, TimerHandle};
use playback_events::PlaybackSnapshot;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Everything the engine task consumes, in arrival order
pub(crate) enum EngineMsg {
	Command {
		source: CommandSource,
		command: PlaybackCommand,
		response: oneshot::Sender<Result<CommandOutcome>>,
	},
	TimerFired(TimerHandle),
	Snapshot(oneshot::Sender<PlaybackSnapshot>),
}

/// Timer callbacks post back onto the engine queue. The sink holds a weak
/// sender so pending timers don't keep a dropped engine alive.
pub(crate) fn timer_sink(tx: &mpsc::UnboundedSender<EngineMsg>) -> TimerSink {
	let weak = tx.downgrade();
	Arc::new(move |handle| {
		if let Some(tx) = weak.upgrade() {
			let _ = tx.send(EngineMsg::TimerFired(handle));
		}
	})
}

/// Single owner of the controller; serializes commands and timer expirations
pub(crate) struct PlaybackActor<S: Scheduler> {
	controller: PlaybackController<S>,
	state_tx: watch::Sender<PlaybackSnapshot>,
}

impl<S: Scheduler> PlaybackActor<S> {
	pub(crate) fn new(controller: PlaybackController<S>) -> (Self, watch::Receiver<PlaybackSnapshot>) {
		let (state_tx, state_rx) = watch::channel(controller.snapshot());
		(Self { controller, state_tx }, state_rx)
	}

	pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<EngineMsg>, cancel: CancellationToken) {
		info!(scenarios = self.controller.catalog().len(), "Playback engine started");

		loop {
			tokio::select! {
				biased;

				() = cancel.cancelled() => {
					debug!("Playback engine cancelled");
					break;
				}

				msg = rx.recv() => match msg {
					Some(msg) => self.handle(msg),
					None => {
						debug!("All playback handles dropped");
						break;
					}
				}
			}
		}

		info!("Playback engine stopped");
	}

	fn handle(&mut self, msg: EngineMsg) {
		match msg {
			EngineMsg::Command { source, command, response } => {
				let result = self.controller.execute(source, command);
				self.publish_state();
				let _ = response.send(result);
			}
			EngineMsg::TimerFired(handle) => {
				self.controller.on_timer(handle);
				self.publish_state();
			}
			EngineMsg::Snapshot(response) => {
				let _ = response.send(self.controller.snapshot());
			}
		}
	}

	/// Refresh the watched snapshot before any reply goes out
	fn publish_state(&self) {
		let snapshot = self.controller.snapshot();
		self.state_tx.send_if_modified(|current| {
			if *current == snapshot {
				false
			} else {
				*current = snapshot;
				true
			}
		});
	}
}
