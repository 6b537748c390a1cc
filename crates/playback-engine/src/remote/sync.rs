use super::channel::{RemoteChannel, RemoteInbound, RemoteOutbound};
use super::OutboundFrame;
use crate::bus::Subscription;
use crate::commands::{CommandSource, PlaybackCommand};
use crate::player::PlaybackHandle;
use playback_events::{Authority, PlaybackEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Binds one remote driver to a playback engine.
///
/// Inbound commands are applied with [`CommandSource::Remote`]; starts that
/// don't name an authority use `mode`. Events of locally driven sessions are
/// mirrored back to the driver.
pub struct RemoteSync {
	handle: PlaybackHandle,
	subscription: Subscription,
	cancel_token: CancellationToken,
	tasks: Vec<JoinHandle<()>>,
}

impl RemoteSync {
	pub fn attach<C: RemoteChannel>(handle: PlaybackHandle, channel: C, mode: Authority) -> Self {
		let (inbound, outbound) = channel.split();
		let cancel_token = CancellationToken::new();
		let (frame_tx, frame_rx) = mpsc::unbounded_channel();

		let current = handle.current_state();
		let subscription = handle.subscribe(mirror_local_sessions(frame_tx.clone(), current.is_active() && current.authority == Authority::Local));

		let tasks = vec![
			tokio::spawn(inbound_pump(handle.clone(), inbound, frame_tx, mode, cancel_token.clone())),
			tokio::spawn(outbound_pump(outbound, frame_rx, cancel_token.clone())),
		];

		info!(?mode, "Remote driver attached");

		Self {
			handle,
			subscription,
			cancel_token,
			tasks,
		}
	}

	/// Resolves once the driver has gone away or the sync was detached
	pub async fn closed(&self) {
		self.cancel_token.cancelled().await;
	}

	pub fn is_attached(&self) -> bool {
		!self.cancel_token.is_cancelled()
	}

	/// Stop both pumps and stop mirroring events
	pub async fn detach(mut self) {
		self.handle.unsubscribe(self.subscription);
		self.cancel_token.cancel();
		for task in self.tasks.drain(..) {
			let _ = task.await;
		}
		info!("Remote driver detached");
	}
}

impl Drop for RemoteSync {
	fn drop(&mut self) {
		self.cancel_token.cancel();
		self.handle.unsubscribe(self.subscription);
	}
}

/// Observer forwarding events to the outbound pump while the current session is locally driven
fn mirror_local_sessions(frames: mpsc::UnboundedSender<OutboundFrame>, initially: bool) -> impl Fn(&PlaybackEvent) + Send + Sync + 'static {
	let mirroring = AtomicBool::new(initially);
	move |event| {
		if let PlaybackEvent::ScenarioStarted { authority, .. } = event {
			mirroring.store(*authority == Authority::Local, Ordering::Relaxed);
		}
		if mirroring.load(Ordering::Relaxed) {
			let _ = frames.send(OutboundFrame::Event(event.clone()));
		}
	}
}

async fn inbound_pump<I: RemoteInbound>(handle: PlaybackHandle, mut inbound: I, frames: mpsc::UnboundedSender<OutboundFrame>, mode: Authority, cancel: CancellationToken) {
	loop {
		let received = tokio::select! {
			biased;

			() = cancel.cancelled() => break,
			received = inbound.recv() => received,
		};

		match received {
			Ok(Some(data)) => {
				let name = data.name();
				match handle.execute(CommandSource::Remote, PlaybackCommand::from_data(data, mode)).await {
					Ok(outcome) => debug!(command = name, ?outcome, "Remote command applied"),
					Err(e) => {
						warn!(command = name, "Remote command rejected: {}", e);
						let _ = frames.send(OutboundFrame::Rejected {
							command: Some(name.to_string()),
							error: e.to_string(),
						});
					}
				}
			}
			Ok(None) => {
				info!("Remote driver closed the channel");
				break;
			}
			Err(e) if e.is_frame_error() => {
				warn!("{}", e);
				let _ = frames.send(OutboundFrame::Rejected { command: None, error: e.to_string() });
			}
			Err(e) => {
				error!("Remote inbound failed: {}", e);
				break;
			}
		}

		if handle.is_closed() {
			debug!("Playback engine gone, stopping remote inbound");
			break;
		}
	}

	cancel.cancel();
}

async fn outbound_pump<O: RemoteOutbound>(mut outbound: O, mut frames: mpsc::UnboundedReceiver<OutboundFrame>, cancel: CancellationToken) {
	loop {
		let frame = tokio::select! {
			biased;

			() = cancel.cancelled() => break,
			frame = frames.recv() => match frame {
				Some(frame) => frame,
				None => break,
			},
		};

		if let Err(e) = outbound.send(frame).await {
			error!("Remote outbound failed: {}", e);
			break;
		}
	}

	cancel.cancel();
}
