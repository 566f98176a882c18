//! Event types for session observers.
//!
//! Events flow through a broadcast bus so any number of observers (the API
//! layer, logging, tests) can follow a session without the poller knowing
//! about them. They replace per-call callback bundles: a terminal event is
//! published exactly once per session instance.

use serde::{Deserialize, Serialize};

/// Events published over the lifetime of a verification session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SessionEvent {
	/// A session was admitted and polling begins.
	Started { order_id: String, max_attempts: u32 },
	/// A verification call completed without a final answer; polling continues.
	Progress {
		order_id: String,
		attempts: u32,
		max_attempts: u32,
		percent: u8,
	},
	/// The gateway confirmed the payment.
	Succeeded {
		order_id: String,
		detail: Option<String>,
	},
	/// The attempt budget ran out without a definitive answer.
	Exhausted { order_id: String, attempts: u32 },
	/// The gateway reported a definitive non-success outcome.
	Failed { order_id: String, reason: String },
	/// The session was cancelled by the caller before completion.
	Cancelled { order_id: String },
}

impl SessionEvent {
	/// The order this event belongs to.
	pub fn order_id(&self) -> &str {
		match self {
			SessionEvent::Started { order_id, .. }
			| SessionEvent::Progress { order_id, .. }
			| SessionEvent::Succeeded { order_id, .. }
			| SessionEvent::Exhausted { order_id, .. }
			| SessionEvent::Failed { order_id, .. }
			| SessionEvent::Cancelled { order_id } => order_id,
		}
	}
}
