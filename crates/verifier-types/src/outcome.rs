//! Verification outcome types.
//!
//! The gateway answers one question per call: has this payment settled?
//! The wire format is a tagged object, `{"status": "success" | "pending" |
//! "failed", ...}`, matching the backend verification endpoint.

use serde::{Deserialize, Serialize};

/// Result of one verification call for an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerifyOutcome {
	/// The payment has settled.
	Success {
		/// Optional human-readable detail from the gateway.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		detail: Option<String>,
	},
	/// The gateway does not know yet; ask again later.
	Pending,
	/// The gateway reports the payment definitively failed or was cancelled.
	Failed {
		/// Reason reported by the gateway.
		reason: String,
	},
}

impl VerifyOutcome {
	/// Returns true if this outcome ends polling (success or fatal failure).
	pub fn is_final(&self) -> bool {
		!matches!(self, VerifyOutcome::Pending)
	}
}
