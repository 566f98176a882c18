//! Session state types for the verifier system.
//!
//! A session is one bounded polling lifecycle for a single order identifier.
//! These types describe its externally visible state; the live record that
//! owns the pending timer lives in the core crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a verification session.
///
/// A session starts in `Polling` and moves monotonically toward one of the
/// terminal states. `Idle` is reached only through explicit cancellation and
/// is not a terminal outcome; a cancelled order can be started again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
	/// No polling in progress (initial state, or after cancellation).
	Idle,
	/// Verification attempts are running against the gateway.
	Polling,
	/// The gateway confirmed the payment.
	Succeeded,
	/// All attempts were used without a definitive answer.
	Exhausted,
	/// The gateway reported a definitive non-success outcome.
	Failed,
}

impl SessionStatus {
	/// Returns true for states that end a session for good.
	///
	/// `Idle` is deliberately not terminal: a cancelled session may be
	/// restarted with a fresh attempt budget.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			SessionStatus::Succeeded | SessionStatus::Exhausted | SessionStatus::Failed
		)
	}
}

impl fmt::Display for SessionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionStatus::Idle => write!(f, "Idle"),
			SessionStatus::Polling => write!(f, "Polling"),
			SessionStatus::Succeeded => write!(f, "Succeeded"),
			SessionStatus::Exhausted => write!(f, "Exhausted"),
			SessionStatus::Failed => write!(f, "Failed"),
		}
	}
}

/// Point-in-time view of a verification session.
///
/// Snapshots are what callers see: the live session record (including its
/// timer handle) never leaves the core crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
	/// Opaque identifier of the payment order.
	pub order_id: String,
	/// Current status of the session.
	pub status: SessionStatus,
	/// Number of completed verification calls.
	pub attempts: u32,
	/// Attempt budget configured at session start.
	pub max_attempts: u32,
	/// Last transient or fatal error observed, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_error: Option<String>,
}

/// User-facing progress derived from session counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
	/// Attempts remaining before the session exhausts.
	pub attempts_left: u32,
	/// Completed share of the attempt budget, rounded to whole percent.
	pub percent: u8,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn terminal_states() {
		assert!(!SessionStatus::Idle.is_terminal());
		assert!(!SessionStatus::Polling.is_terminal());
		assert!(SessionStatus::Succeeded.is_terminal());
		assert!(SessionStatus::Exhausted.is_terminal());
		assert!(SessionStatus::Failed.is_terminal());
	}

	#[test]
	fn status_serializes_camel_case() {
		let json = serde_json::to_string(&SessionStatus::Polling).unwrap();
		assert_eq!(json, "\"polling\"");
	}

	#[test]
	fn snapshot_omits_absent_error() {
		let snapshot = SessionSnapshot {
			order_id: "order-1".to_string(),
			status: SessionStatus::Polling,
			attempts: 2,
			max_attempts: 10,
			last_error: None,
		};
		let json = serde_json::to_value(&snapshot).unwrap();
		assert!(json.get("lastError").is_none());
		assert_eq!(json["maxAttempts"], 10);
	}
}
