//! Synchronous fan-out of playback transitions to observers.

use playback_events::PlaybackEvent;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Observer callback. Receives its own copy of every published event.
pub type EventHandler = Arc<dyn Fn(&PlaybackEvent) + Send + Sync>;

/// Registration token returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Broadcaster owned by the engine; the playback controller is its only publisher.
///
/// Delivery happens on the publisher's thread, in subscription order. Each
/// publish iterates over the subscriber list as it was when the publish
/// began, so subscribing or unsubscribing from inside a handler takes effect
/// with the next publish.
///
/// A handler must not hold an `Arc<EventBus>` of the bus it is registered on
/// in a way that outlives its own unsubscription, or the bus leaks.
pub struct EventBus {
	next_id: AtomicU64,
	subscribers: RwLock<Vec<(Subscription, EventHandler)>>,
	published: AtomicU64,
}

impl EventBus {
	pub fn new() -> Self {
		Self {
			next_id: AtomicU64::new(1),
			subscribers: RwLock::new(Vec::new()),
			published: AtomicU64::new(0),
		}
	}

	pub fn subscribe<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&PlaybackEvent) + Send + Sync + 'static,
	{
		let subscription = Subscription(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.subscribers.write().unwrap_or_else(PoisonError::into_inner).push((subscription, Arc::new(handler)));
		debug!(subscription = subscription.0, "Observer subscribed");
		subscription
	}

	/// Forward events into an unbounded channel, for observers living in async tasks
	pub fn subscribe_channel(&self) -> (Subscription, mpsc::UnboundedReceiver<PlaybackEvent>) {
		let (tx, rx) = mpsc::unbounded_channel();
		let subscription = self.subscribe(move |event| {
			let _ = tx.send(event.clone());
		});
		(subscription, rx)
	}

	/// Returns `true` if the subscription was still registered
	pub fn unsubscribe(&self, subscription: Subscription) -> bool {
		let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
		let before = subscribers.len();
		subscribers.retain(|(s, _)| *s != subscription);
		let removed = subscribers.len() != before;

		if removed {
			debug!(subscription = subscription.0, "Observer unsubscribed");
		}
		removed
	}

	pub fn subscriber_count(&self) -> usize {
		self.subscribers.read().unwrap_or_else(PoisonError::into_inner).len()
	}

	/// Total number of events published so far
	pub fn published_count(&self) -> u64 {
		self.published.load(Ordering::Relaxed)
	}

	/// Deliver `event` to every current subscriber. Returns how many were called.
	pub(crate) fn publish(&self, event: &PlaybackEvent) -> usize {
		// Snapshot, then release the lock so handlers may (un)subscribe
		let snapshot: Vec<(Subscription, EventHandler)> = self.subscribers.read().unwrap_or_else(PoisonError::into_inner).clone();
		self.published.fetch_add(1, Ordering::Relaxed);

		trace!(event = event.kind(), subscribers = snapshot.len(), "Publishing event");

		for (subscription, handler) in &snapshot {
			if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
				warn!(subscription = subscription.0, event = event.kind(), "Observer panicked while handling event");
			}
		}

		snapshot.len()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for EventBus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EventBus")
			.field("subscriber_count", &self.subscriber_count())
			.field("published", &self.published_count())
			.finish()
	}
}
