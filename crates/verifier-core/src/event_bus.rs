//! Event bus for session observers.
//!
//! Wraps a tokio broadcast channel so the poller can publish session
//! events without knowing who is listening. Publishing never blocks;
//! slow subscribers lag and drop, they cannot stall polling.

use tokio::sync::broadcast;
use verifier_types::SessionEvent;

/// Default number of events buffered per subscriber.
const DEFAULT_CAPACITY: usize = 256;

/// Broadcast bus for [`SessionEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
	sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
	/// Creates a bus buffering up to `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns an error when nobody is subscribed; callers that do not
	/// care discard it with `.ok()`.
	pub fn publish(
		&self,
		event: SessionEvent,
	) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
		self.sender.send(event)
	}

	/// Creates a new subscription receiving events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}
