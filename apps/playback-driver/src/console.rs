use playback_engine::{CommandSource, OperatorKey, PlaybackHandle};
use std::io::BufRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Presenter console: one key name per line on stdin, applied as a local command.
///
/// Stdin is read on a dedicated thread; the tokio handle is not meant for interactive input.
pub async fn run(handle: PlaybackHandle, speed_step: f64, cancel: CancellationToken) {
	let (line_tx, mut line_rx) = mpsc::unbounded_channel();

	std::thread::spawn(move || {
		for line in std::io::stdin().lock().lines() {
			match line {
				Ok(line) => {
					if line_tx.send(line).is_err() {
						break;
					}
				}
				Err(e) => {
					warn!(error = %e, "Failed to read operator input");
					break;
				}
			}
		}
	});

	loop {
		tokio::select! {
			() = cancel.cancelled() => break,
			line = line_rx.recv() => match line {
				Some(line) => apply(&handle, &line, speed_step).await,
				None => {
					debug!("Operator console closed");
					break;
				}
			}
		}
	}
}

async fn apply(handle: &PlaybackHandle, line: &str, speed_step: f64) {
	let key = match line.parse::<OperatorKey>() {
		Ok(key) => key,
		Err(e) => {
			warn!("{e}");
			return;
		}
	};

	let snapshot = handle.current_state();
	let Some(command) = key.to_command(&snapshot, handle.catalog(), speed_step) else {
		debug!(?key, phase = ?snapshot.phase, "Key has nothing to act on");
		return;
	};

	let name = command.name();
	match handle.dispatch(CommandSource::Local, command).await {
		Ok(outcome) => info!(command = name, ?outcome, "Operator command"),
		Err(e) => warn!(command = name, error = %e, "Operator command rejected"),
	}
}
