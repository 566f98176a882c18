//! Progress derivation from session counters.
//!
//! Pure functions, callable at any time while a session is polling; the
//! caller decides what to display once a session is terminal.

use verifier_types::Progress;

/// Attempts remaining before the session exhausts.
pub fn attempts_left(max_attempts: u32, attempts: u32) -> u32 {
	max_attempts.saturating_sub(attempts)
}

/// Completed share of the attempt budget, rounded to whole percent.
pub fn progress_percent(max_attempts: u32, attempts: u32) -> u8 {
	if max_attempts == 0 {
		return 0;
	}
	((attempts as f64 / max_attempts as f64) * 100.0).round() as u8
}

/// Both derived values as one report.
pub fn report(max_attempts: u32, attempts: u32) -> Progress {
	Progress {
		attempts_left: attempts_left(max_attempts, attempts),
		percent: progress_percent(max_attempts, attempts),
	}
}
