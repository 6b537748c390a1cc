use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::trace;

/// Opaque handle to one scheduled callback.
///
/// Generations are never reused, so comparing handles doubles as an epoch check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
	pub fn generation(self) -> u64 {
		self.0
	}
}

/// Clock plus cancellable delayed callbacks
pub trait Scheduler: Send + 'static {
	/// Clock used to measure running time
	fn now(&self) -> Instant;

	/// Run `fire` once after `delay`, unless cancelled first
	fn schedule<F>(&mut self, delay: Duration, fire: F) -> TimerHandle
	where
		F: FnOnce(TimerHandle) + Send + 'static;

	/// A cancelled callback never runs, even if its delay already elapsed
	fn cancel(&mut self, handle: TimerHandle);
}

/// Scheduler backed by tokio timers; one sleeping task per handle
pub struct TokioScheduler {
	next_generation: u64,
	armed: Arc<DashMap<TimerHandle, Option<AbortHandle>>>,
}

impl TokioScheduler {
	pub fn new() -> Self {
		Self {
			next_generation: 0,
			armed: Arc::new(DashMap::new()),
		}
	}

	/// Timers scheduled and neither fired nor cancelled
	pub fn outstanding(&self) -> usize {
		self.armed.len()
	}
}

impl Default for TokioScheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl Scheduler for TokioScheduler {
	fn now(&self) -> Instant {
		Instant::now()
	}

	fn schedule<F>(&mut self, delay: Duration, fire: F) -> TimerHandle
	where
		F: FnOnce(TimerHandle) + Send + 'static,
	{
		self.next_generation += 1;
		let handle = TimerHandle(self.next_generation);
		let armed = Arc::clone(&self.armed);

		// Armed before the task exists so a zero delay cannot outrun the insert.
		// Fire and cancel both remove the entry; whichever removes it wins.
		armed.insert(handle, None);
		let task = tokio::spawn({
			let armed = Arc::clone(&armed);
			async move {
				tokio::time::sleep(delay).await;
				if armed.remove(&handle).is_some() {
					fire(handle);
				} else {
					trace!(generation = handle.0, "Timer disarmed before firing");
				}
			}
		});

		if let Some(mut entry) = armed.get_mut(&handle) {
			*entry = Some(task.abort_handle());
		}
		trace!(generation = handle.0, ?delay, "Timer scheduled");
		handle
	}

	fn cancel(&mut self, handle: TimerHandle) {
		if let Some((_, task)) = self.armed.remove(&handle) {
			if let Some(task) = task {
				task.abort();
			}
			trace!(generation = handle.0, "Timer cancelled");
		}
	}
}

impl Drop for TokioScheduler {
	fn drop(&mut self) {
		for entry in self.armed.iter() {
			if let Some(task) = entry.value() {
				task.abort();
			}
		}
		self.armed.clear();
	}
}
