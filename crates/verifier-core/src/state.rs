//! Session state machine.
//!
//! Two pure pieces: the transition table that says which status changes
//! are legal, and [`advance`], which folds one completed verification call
//! into the session counters and decides what happens next. Keeping both
//! free of I/O makes the attempt-bound invariant directly testable.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use verifier_types::{SessionStatus, VerifyOutcome};

/// What the poller does after one completed verification call.
///
/// Every variant carries the updated attempt count: a completed call always
/// counts, whatever its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
	/// The gateway confirmed the payment; stop with `Succeeded`.
	Succeeded {
		attempts: u32,
		detail: Option<String>,
	},
	/// The gateway reported a definitive failure; stop with `Failed`
	/// regardless of remaining attempts.
	Failed { attempts: u32, reason: String },
	/// The budget ran out without a definitive answer; stop with
	/// `Exhausted`.
	Exhausted { attempts: u32 },
	/// No answer yet and budget remains; schedule the next attempt after
	/// one interval.
	Retry { attempts: u32 },
}

impl Step {
	/// The attempt count after this call.
	pub fn attempts(&self) -> u32 {
		match self {
			Step::Succeeded { attempts, .. }
			| Step::Failed { attempts, .. }
			| Step::Exhausted { attempts }
			| Step::Retry { attempts } => *attempts,
		}
	}
}

/// Folds one verification outcome into the session counters.
///
/// `attempts` is the count before this call; the returned step carries the
/// count after it. `Retry` is only ever returned while the updated count is
/// still below `max_attempts`, which is what bounds the whole session.
pub fn advance(attempts: u32, max_attempts: u32, outcome: VerifyOutcome) -> Step {
	let attempts = attempts.saturating_add(1);
	match outcome {
		VerifyOutcome::Success { detail } => Step::Succeeded { attempts, detail },
		VerifyOutcome::Failed { reason } => Step::Failed { attempts, reason },
		VerifyOutcome::Pending => {
			if attempts >= max_attempts {
				Step::Exhausted { attempts }
			} else {
				Step::Retry { attempts }
			}
		},
	}
}

/// Checks if a status transition is valid.
///
/// Terminal states map to no successors: once a session succeeds, exhausts
/// or fails it never re-enters polling. `Idle` re-enters `Polling` only
/// through an explicit restart.
pub fn is_valid_transition(from: SessionStatus, to: SessionStatus) -> bool {
	static TRANSITIONS: Lazy<HashMap<SessionStatus, HashSet<SessionStatus>>> = Lazy::new(|| {
		let mut m = HashMap::new();
		m.insert(
			SessionStatus::Idle,
			HashSet::from([SessionStatus::Polling]),
		);
		m.insert(
			SessionStatus::Polling,
			HashSet::from([
				SessionStatus::Succeeded,
				SessionStatus::Exhausted,
				SessionStatus::Failed,
				SessionStatus::Idle,
			]),
		);
		m.insert(SessionStatus::Succeeded, HashSet::new()); // terminal
		m.insert(SessionStatus::Exhausted, HashSet::new()); // terminal
		m.insert(SessionStatus::Failed, HashSet::new()); // terminal
		m
	});

	TRANSITIONS
		.get(&from)
		.is_some_and(|set| set.contains(&to))
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn success_counts_the_call() {
		let step = advance(0, 10, VerifyOutcome::Success { detail: None });
		assert_eq!(
			step,
			Step::Succeeded {
				attempts: 1,
				detail: None
			}
		);
	}

	#[test]
	fn fatal_failure_stops_with_budget_remaining() {
		let step = advance(
			2,
			10,
			VerifyOutcome::Failed {
				reason: "declined".to_string(),
			},
		);
		assert_eq!(
			step,
			Step::Failed {
				attempts: 3,
				reason: "declined".to_string()
			}
		);
	}

	#[test]
	fn pending_exhausts_exactly_at_budget() {
		assert_eq!(advance(8, 10, VerifyOutcome::Pending), Step::Retry { attempts: 9 });
		assert_eq!(
			advance(9, 10, VerifyOutcome::Pending),
			Step::Exhausted { attempts: 10 }
		);
	}

	#[test]
	fn terminal_states_have_no_successors() {
		use SessionStatus::*;
		for terminal in [Succeeded, Exhausted, Failed] {
			for to in [Idle, Polling, Succeeded, Exhausted, Failed] {
				assert!(!is_valid_transition(terminal, to));
			}
		}
	}

	#[test]
	fn polling_transitions() {
		use SessionStatus::*;
		assert!(is_valid_transition(Polling, Succeeded));
		assert!(is_valid_transition(Polling, Exhausted));
		assert!(is_valid_transition(Polling, Failed));
		assert!(is_valid_transition(Polling, Idle)); // cancellation
		assert!(is_valid_transition(Idle, Polling)); // restart
		assert!(!is_valid_transition(Idle, Succeeded));
	}

	fn outcome_strategy() -> impl Strategy<Value = VerifyOutcome> {
		prop_oneof![
			3 => Just(VerifyOutcome::Pending),
			1 => Just(VerifyOutcome::Success { detail: None }),
			1 => Just(VerifyOutcome::Failed {
				reason: "declined".to_string()
			}),
		]
	}

	proptest! {
		/// Whatever the gateway answers, attempts never exceed the budget
		/// and polling stops at the first non-retry step.
		#[test]
		fn attempts_never_exceed_budget(
			outcomes in prop::collection::vec(outcome_strategy(), 1..40),
			max_attempts in 1u32..20,
		) {
			let mut attempts = 0u32;
			for outcome in outcomes {
				let step = advance(attempts, max_attempts, outcome);
				attempts = step.attempts();
				prop_assert!(attempts <= max_attempts);
				if !matches!(step, Step::Retry { .. }) {
					break;
				}
			}
			prop_assert!(attempts <= max_attempts);
		}
	}
}
