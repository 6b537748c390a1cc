use super::channel::{RemoteChannel, RemoteInbound, RemoteOutbound};
use super::{OutboundFrame, RemoteError, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use playback_events::PlaybackCommandData;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Newline-delimited JSON over any byte stream (a TCP connection in the driver binary)
pub struct FramedRemoteChannel<T> {
	io: T,
}

impl<T> FramedRemoteChannel<T>
where
	T: AsyncRead + AsyncWrite + Send + 'static,
{
	pub fn new(io: T) -> Self {
		Self { io }
	}
}

impl<T> RemoteChannel for FramedRemoteChannel<T>
where
	T: AsyncRead + AsyncWrite + Send + 'static,
{
	type Inbound = FramedInbound<T>;
	type Outbound = FramedOutbound<T>;

	fn split(self) -> (Self::Inbound, Self::Outbound) {
		let (reader, writer) = tokio::io::split(self.io);
		(
			FramedInbound(FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH))),
			FramedOutbound(FramedWrite::new(writer, LinesCodec::new())),
		)
	}
}

pub struct FramedInbound<T>(FramedRead<ReadHalf<T>, LinesCodec>);

#[async_trait]
impl<T> RemoteInbound for FramedInbound<T>
where
	T: AsyncRead + AsyncWrite + Send + 'static,
{
	async fn recv(&mut self) -> Result<Option<PlaybackCommandData>> {
		loop {
			let Some(line) = self.0.next().await else {
				return Ok(None);
			};
			let line = line?;

			if line.trim().is_empty() {
				continue;
			}
			return serde_json::from_str(&line).map(Some).map_err(|e| RemoteError::Decode(e.to_string()));
		}
	}
}

pub struct FramedOutbound<T>(FramedWrite<WriteHalf<T>, LinesCodec>);

#[async_trait]
impl<T> RemoteOutbound for FramedOutbound<T>
where
	T: AsyncRead + AsyncWrite + Send + 'static,
{
	async fn send(&mut self, frame: OutboundFrame) -> Result<()> {
		let line = serde_json::to_string(&frame).map_err(|e| RemoteError::Codec(e.to_string()))?;
		self.0.send(line).await?;
		Ok(())
	}
}

impl From<LinesCodecError> for RemoteError {
	fn from(err: LinesCodecError) -> Self {
		match err {
			LinesCodecError::Io(e) => Self::Io(e),
			LinesCodecError::MaxLineLengthExceeded => Self::Codec(format!("line exceeds {MAX_LINE_LENGTH} bytes")),
		}
	}
}
