//! Session registry and single-flight admission.
//!
//! One entry per order id, owning the session counters and the timer
//! handle for the next scheduled attempt. The registry is the dedup guard:
//! `admit` rejects a new polling request for an order that is already
//! being polled, and `begin` replaces stale entries with a fresh session
//! instance carrying a new epoch so in-flight results from the old
//! instance can be told apart and discarded.

use crate::scheduler::TimerHandle;
use crate::state;
use crate::VerifierError;
use std::collections::HashMap;
use std::time::Duration;
use verifier_types::{SessionSnapshot, SessionStatus};

/// Live record for one verification session.
pub(crate) struct SessionEntry {
	pub order_id: String,
	pub status: SessionStatus,
	pub attempts: u32,
	pub max_attempts: u32,
	pub interval: Duration,
	pub last_error: Option<String>,
	/// At most one pending scheduled attempt; exclusively owned here.
	pub timer: Option<TimerHandle>,
	/// Identifies the session instance; bumped on every restart.
	pub epoch: u64,
}

impl SessionEntry {
	/// Point-in-time view of this entry.
	pub fn snapshot(&self) -> SessionSnapshot {
		SessionSnapshot {
			order_id: self.order_id.clone(),
			status: self.status,
			attempts: self.attempts,
			max_attempts: self.max_attempts,
			last_error: self.last_error.clone(),
		}
	}

	/// Moves the session to `to`, enforcing the transition table.
	pub fn transition(&mut self, to: SessionStatus) -> Result<(), VerifierError> {
		if !state::is_valid_transition(self.status, to) {
			return Err(VerifierError::InvalidTransition {
				from: self.status,
				to,
			});
		}
		self.status = to;
		Ok(())
	}
}

/// All sessions known to the verifier, keyed by order id.
#[derive(Default)]
pub(crate) struct SessionMap {
	entries: HashMap<String, SessionEntry>,
	next_epoch: u64,
}

impl SessionMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Single-flight admission check.
	///
	/// A new polling request for `order_id` is admitted only when no
	/// session with the same id is currently polling. Terminal and idle
	/// entries do not block a restart.
	pub fn admit(&self, order_id: &str) -> bool {
		!self
			.entries
			.get(order_id)
			.is_some_and(|entry| entry.status == SessionStatus::Polling)
	}

	/// Ids of all sessions currently polling.
	pub fn polling_ids(&self) -> Vec<String> {
		self.entries
			.values()
			.filter(|entry| entry.status == SessionStatus::Polling)
			.map(|entry| entry.order_id.clone())
			.collect()
	}

	/// Creates a fresh session instance for `order_id`, replacing any
	/// previous entry, and returns its epoch.
	pub fn begin(&mut self, order_id: &str, max_attempts: u32, interval: Duration) -> u64 {
		self.next_epoch += 1;
		let epoch = self.next_epoch;
		self.entries.insert(
			order_id.to_string(),
			SessionEntry {
				order_id: order_id.to_string(),
				status: SessionStatus::Polling,
				attempts: 0,
				max_attempts,
				interval,
				last_error: None,
				timer: None,
				epoch,
			},
		);
		epoch
	}

	pub fn get(&self, order_id: &str) -> Option<&SessionEntry> {
		self.entries.get(order_id)
	}

	pub fn get_mut(&mut self, order_id: &str) -> Option<&mut SessionEntry> {
		self.entries.get_mut(order_id)
	}
}
