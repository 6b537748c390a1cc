//! Remote driver synchronization.
//!
//! A remote driver sends [`PlaybackCommandData`](playback_events::PlaybackCommandData)
//! frames and receives [`OutboundFrame`]s: mirrored events for locally driven
//! sessions, and rejections for commands the engine refused.

mod channel;
mod framed;
mod sync;

use playback_events::PlaybackEvent;
use serde::{Deserialize, Serialize};

pub use channel::{InMemRemoteChannel, RemoteChannel, RemoteInbound, RemoteOutbound, RemotePeer};
pub use framed::FramedRemoteChannel;
pub use sync::RemoteSync;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
	#[error("Remote channel closed")]
	Closed,

	#[error("Undecodable remote frame: {0}")]
	Decode(String),

	#[error("Remote I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Remote codec error: {0}")]
	Codec(String),
}

impl RemoteError {
	/// A single bad frame; the channel is still usable
	pub fn is_frame_error(&self) -> bool {
		matches!(self, Self::Decode(_))
	}
}

pub type Result<T> = std::result::Result<T, RemoteError>;

/// Frame sent to the remote driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum OutboundFrame {
	Event(PlaybackEvent),
	Rejected {
		/// Name of the refused command; absent when the frame could not be decoded
		#[serde(default, skip_serializing_if = "Option::is_none")]
		command: Option<String>,
		error: String,
	},
}
