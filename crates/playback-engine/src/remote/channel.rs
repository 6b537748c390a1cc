use super::{OutboundFrame, RemoteError, Result};
use async_broadcast::{broadcast, Receiver, RecvError, Sender};
use async_trait::async_trait;
use playback_events::PlaybackCommandData;
use tokio::sync::mpsc;
use tracing::warn;

/// Command half of a remote channel
#[async_trait]
pub trait RemoteInbound: Send + 'static {
	/// Next command from the driver. `Ok(None)` once the driver has gone away.
	async fn recv(&mut self) -> Result<Option<PlaybackCommandData>>;
}

/// Frame half of a remote channel
#[async_trait]
pub trait RemoteOutbound: Send + 'static {
	async fn send(&mut self, frame: OutboundFrame) -> Result<()>;
}

/// Duplex connection to one remote driver
pub trait RemoteChannel: Send + 'static {
	type Inbound: RemoteInbound;
	type Outbound: RemoteOutbound;

	fn split(self) -> (Self::Inbound, Self::Outbound);
}

/// In-process channel, for embedding a driver in the same process and for tests
pub struct InMemRemoteChannel {
	commands: mpsc::Receiver<PlaybackCommandData>,
	frames: Sender<OutboundFrame>,
}

/// Driver end of an [`InMemRemoteChannel`]
pub struct RemotePeer {
	commands: mpsc::Sender<PlaybackCommandData>,
	frames: Receiver<OutboundFrame>,
}

impl InMemRemoteChannel {
	/// `capacity` bounds both directions. Slow peers lose their oldest frames.
	pub fn pair(capacity: usize) -> (Self, RemotePeer) {
		let (command_tx, command_rx) = mpsc::channel(capacity);
		let (mut frame_tx, frame_rx) = broadcast(capacity);
		frame_tx.set_await_active(false);
		frame_tx.set_overflow(true);

		let channel = Self {
			commands: command_rx,
			frames: frame_tx,
		};
		let peer = RemotePeer {
			commands: command_tx,
			frames: frame_rx,
		};
		(channel, peer)
	}
}

impl RemoteChannel for InMemRemoteChannel {
	type Inbound = InMemInbound;
	type Outbound = InMemOutbound;

	fn split(self) -> (Self::Inbound, Self::Outbound) {
		(InMemInbound(self.commands), InMemOutbound(self.frames))
	}
}

pub struct InMemInbound(mpsc::Receiver<PlaybackCommandData>);

#[async_trait]
impl RemoteInbound for InMemInbound {
	async fn recv(&mut self) -> Result<Option<PlaybackCommandData>> {
		Ok(self.0.recv().await)
	}
}

pub struct InMemOutbound(Sender<OutboundFrame>);

#[async_trait]
impl RemoteOutbound for InMemOutbound {
	async fn send(&mut self, frame: OutboundFrame) -> Result<()> {
		self.0.broadcast(frame).await.map(|_| ()).map_err(|_| RemoteError::Closed)
	}
}

impl RemotePeer {
	pub async fn send(&self, command: PlaybackCommandData) -> Result<()> {
		self.commands.send(command).await.map_err(|_| RemoteError::Closed)
	}

	/// Next frame from the engine, skipping over any lost to overflow
	pub async fn recv(&mut self) -> Result<OutboundFrame> {
		loop {
			match self.frames.recv().await {
				Ok(frame) => return Ok(frame),
				Err(RecvError::Overflowed(n)) => warn!(dropped = n, "Remote peer lagged"),
				Err(RecvError::Closed) => return Err(RemoteError::Closed),
			}
		}
	}
}
