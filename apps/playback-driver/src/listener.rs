use playback_engine::playback_events::Authority;
use playback_engine::{FramedRemoteChannel, PlaybackHandle, RemoteSync};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Attach every accepted connection as a remote driver until cancelled
pub async fn serve(listener: TcpListener, handle: PlaybackHandle, mode: Authority, cancel: CancellationToken) {
	loop {
		let (stream, peer) = tokio::select! {
			() = cancel.cancelled() => break,
			accepted = listener.accept() => match accepted {
				Ok(accepted) => accepted,
				Err(e) => {
					warn!(error = %e, "Failed to accept remote driver");
					continue;
				}
			}
		};

		info!(%peer, "Remote driver connected");
		let sync = RemoteSync::attach(handle.clone(), FramedRemoteChannel::new(stream), mode);
		let cancel = cancel.clone();

		tokio::spawn(async move {
			tokio::select! {
				() = sync.closed() => {}
				() = cancel.cancelled() => {}
			}
			sync.detach().await;
			info!(%peer, "Remote driver disconnected");
		});
	}
}
