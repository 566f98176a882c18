//! Poller driving verification sessions.
//!
//! The [`Verifier`] owns the session registry and drives each admitted
//! session through repeated verification calls: the first call runs
//! immediately on start, every later one is scheduled through the
//! [`Scheduler`](crate::scheduler::Scheduler) after a fixed interval. All
//! session mutation happens here, either inside the attempt chain or in
//! the explicit `start`/`cancel` entry points, under a single lock that
//! is never held across an await.

use crate::event_bus::EventBus;
use crate::progress;
use crate::registry::SessionMap;
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::state::{self, Step};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use verifier_gateway::{GatewayError, GatewayService};
use verifier_types::{truncate_id, SessionEvent, SessionSnapshot, SessionStatus, VerifyOutcome};

/// Errors that can occur when starting or inspecting sessions.
#[derive(Debug, Error)]
pub enum VerifierError {
	/// The request is malformed; nothing was polled.
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	/// No session exists for the requested order.
	#[error("Session not found: {0}")]
	SessionNotFound(String),
	/// A status change violated the transition table.
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition {
		from: SessionStatus,
		to: SessionStatus,
	},
}

/// Session defaults and gateway-error policy, set once at construction.
#[derive(Debug, Clone, Copy)]
pub struct VerifierOptions {
	/// Attempt budget used when a start request does not override it.
	pub max_attempts: u32,
	/// Delay between attempts used when a start request does not
	/// override it.
	pub interval: Duration,
	/// Whether transport errors count as a pending (retryable) result.
	/// When false they end the session as failed.
	pub transport_errors_are_pending: bool,
}

/// Per-request overrides for [`Verifier::start_verification`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
	/// Attempt budget for this session.
	pub max_attempts: Option<u32>,
	/// Delay between attempts for this session.
	pub interval: Option<Duration>,
}

/// Drives verification sessions against the gateway.
#[derive(Clone)]
pub struct Verifier {
	/// Gateway service answering verification calls.
	gateway: Arc<GatewayService>,
	/// Scheduler for delayed attempts.
	scheduler: Arc<dyn Scheduler>,
	/// All sessions, keyed by order id.
	pub(crate) sessions: Arc<Mutex<SessionMap>>,
	/// Event bus for session observers.
	event_bus: EventBus,
	/// Defaults and policy.
	options: VerifierOptions,
}

impl Verifier {
	/// Creates a new Verifier with the given collaborators.
	pub fn new(
		gateway: Arc<GatewayService>,
		scheduler: Arc<dyn Scheduler>,
		event_bus: EventBus,
		options: VerifierOptions,
	) -> Self {
		Self {
			gateway,
			scheduler,
			sessions: Arc::new(Mutex::new(SessionMap::new())),
			event_bus,
			options,
		}
	}

	/// Starts a verification session for `order_id`.
	///
	/// Fails fast with [`VerifierError::InvalidRequest`] when the order id
	/// is empty; no polling begins. When a session for the same order is
	/// already polling the request is a no-op and the existing session's
	/// snapshot comes back unchanged. A session for a *different* order
	/// that is still polling is cancelled first, so at most one timer is
	/// live process-wide for a single logical flow.
	///
	/// The first verification call runs before this method returns;
	/// attempt 1 does not wait one interval.
	pub async fn start_verification(
		&self,
		order_id: &str,
		options: StartOptions,
	) -> Result<SessionSnapshot, VerifierError> {
		if order_id.trim().is_empty() {
			return Err(VerifierError::InvalidRequest(
				"order id is missing or empty".to_string(),
			));
		}
		let max_attempts = options.max_attempts.unwrap_or(self.options.max_attempts);
		if max_attempts == 0 {
			return Err(VerifierError::InvalidRequest(
				"max_attempts must be at least 1".to_string(),
			));
		}
		let interval = options.interval.unwrap_or(self.options.interval);

		let epoch = {
			let mut sessions = self.sessions.lock().await;

			if !sessions.admit(order_id) {
				tracing::debug!(
					order_id = %truncate_id(order_id),
					"Verification already in progress, request ignored"
				);
				if let Some(entry) = sessions.get(order_id) {
					return Ok(entry.snapshot());
				}
			}

			// One logical flow: a new order supersedes any other session
			// that is still polling.
			for other in sessions.polling_ids() {
				if other != order_id {
					if let Some(entry) = sessions.get_mut(&other) {
						self.cancel_entry(entry);
					}
				}
			}

			let epoch = sessions.begin(order_id, max_attempts, interval);
			tracing::info!(
				order_id = %truncate_id(order_id),
				max_attempts,
				interval_ms = interval.as_millis() as u64,
				"Verification session started"
			);
			self.event_bus
				.publish(SessionEvent::Started {
					order_id: order_id.to_string(),
					max_attempts,
				})
				.ok();
			epoch
		};

		// Attempt 1 runs immediately
		self.run_attempt(order_id, epoch).await;

		let sessions = self.sessions.lock().await;
		sessions
			.get(order_id)
			.map(|entry| entry.snapshot())
			.ok_or_else(|| VerifierError::SessionNotFound(order_id.to_string()))
	}

	/// Cancels the session for `order_id` if it is polling.
	///
	/// Clears the pending timer and returns the session to `Idle`; no
	/// further attempts fire. Safe to call when no session exists and
	/// idempotent. An attempt already in flight completes, but its result
	/// is discarded.
	pub async fn cancel_verification(&self, order_id: &str) {
		let mut sessions = self.sessions.lock().await;
		if let Some(entry) = sessions.get_mut(order_id) {
			self.cancel_entry(entry);
		}
	}

	/// Returns the current snapshot of the session for `order_id`.
	pub async fn session(&self, order_id: &str) -> Option<SessionSnapshot> {
		let sessions = self.sessions.lock().await;
		sessions.get(order_id).map(|entry| entry.snapshot())
	}

	/// Subscribes to session events published from now on.
	pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
		self.event_bus.subscribe()
	}

	/// Cancels one entry in place. Caller holds the registry lock.
	fn cancel_entry(&self, entry: &mut crate::registry::SessionEntry) {
		if entry.status != SessionStatus::Polling {
			return;
		}
		if let Some(mut timer) = entry.timer.take() {
			timer.cancel();
		}
		if let Err(e) = entry.transition(SessionStatus::Idle) {
			tracing::error!(
				order_id = %truncate_id(&entry.order_id),
				error = %e,
				"Cancellation transition rejected"
			);
			return;
		}
		tracing::info!(
			order_id = %truncate_id(&entry.order_id),
			attempts = entry.attempts,
			"Verification cancelled"
		);
		self.event_bus
			.publish(SessionEvent::Cancelled {
				order_id: entry.order_id.clone(),
			})
			.ok();
	}

	/// Wraps the next attempt as a schedulable task.
	fn attempt_task(&self, order_id: String, epoch: u64) -> ScheduledTask {
		let verifier = self.clone();
		Box::pin(async move {
			verifier.run_attempt(&order_id, epoch).await;
		})
	}

	/// Runs one verification attempt for the session instance `epoch`.
	///
	/// The session status is checked before the call and again after it:
	/// a session that was cancelled or replaced while the call was in
	/// flight has its result discarded.
	async fn run_attempt(&self, order_id: &str, epoch: u64) {
		{
			let mut sessions = self.sessions.lock().await;
			let Some(entry) = sessions.get_mut(order_id) else {
				return;
			};
			if entry.epoch != epoch || entry.status != SessionStatus::Polling {
				return;
			}
			// The timer that drove us here is spent; release it without
			// aborting the task that is currently running this attempt.
			if let Some(mut timer) = entry.timer.take() {
				timer.disarm();
			}
		}

		// The verification call happens outside the lock; the session can
		// be cancelled or restarted meanwhile.
		let result = self.gateway.verify(order_id).await;

		let mut sessions = self.sessions.lock().await;
		let Some(entry) = sessions.get_mut(order_id) else {
			return;
		};
		if entry.epoch != epoch || entry.status != SessionStatus::Polling {
			tracing::debug!(
				order_id = %truncate_id(order_id),
				"Discarding verification result for superseded attempt"
			);
			return;
		}

		let outcome = match result {
			Ok(outcome) => outcome,
			Err(GatewayError::Transport(message))
				if self.options.transport_errors_are_pending =>
			{
				entry.last_error = Some(message);
				VerifyOutcome::Pending
			},
			Err(e) => VerifyOutcome::Failed {
				reason: e.to_string(),
			},
		};

		let step = state::advance(entry.attempts, entry.max_attempts, outcome);
		entry.attempts = step.attempts();

		match step {
			Step::Succeeded { attempts, detail } => {
				if let Err(e) = entry.transition(SessionStatus::Succeeded) {
					tracing::error!(order_id = %truncate_id(order_id), error = %e, "Transition rejected");
					return;
				}
				tracing::info!(
					order_id = %truncate_id(order_id),
					attempts,
					"Payment confirmed"
				);
				self.event_bus
					.publish(SessionEvent::Succeeded {
						order_id: entry.order_id.clone(),
						detail,
					})
					.ok();
			},
			Step::Failed { attempts, reason } => {
				entry.last_error = Some(reason.clone());
				if let Err(e) = entry.transition(SessionStatus::Failed) {
					tracing::error!(order_id = %truncate_id(order_id), error = %e, "Transition rejected");
					return;
				}
				tracing::warn!(
					order_id = %truncate_id(order_id),
					attempts,
					reason = %reason,
					"Payment definitively failed"
				);
				self.event_bus
					.publish(SessionEvent::Failed {
						order_id: entry.order_id.clone(),
						reason,
					})
					.ok();
			},
			Step::Exhausted { attempts } => {
				if let Err(e) = entry.transition(SessionStatus::Exhausted) {
					tracing::error!(order_id = %truncate_id(order_id), error = %e, "Transition rejected");
					return;
				}
				tracing::warn!(
					order_id = %truncate_id(order_id),
					attempts,
					"Could not confirm payment within the attempt budget"
				);
				self.event_bus
					.publish(SessionEvent::Exhausted {
						order_id: entry.order_id.clone(),
						attempts,
					})
					.ok();
			},
			Step::Retry { attempts } => {
				let percent = progress::progress_percent(entry.max_attempts, attempts);
				tracing::debug!(
					order_id = %truncate_id(order_id),
					attempts,
					max_attempts = entry.max_attempts,
					"Verification pending, next attempt scheduled"
				);
				self.event_bus
					.publish(SessionEvent::Progress {
						order_id: entry.order_id.clone(),
						attempts,
						max_attempts: entry.max_attempts,
						percent,
					})
					.ok();
				let task = self.attempt_task(entry.order_id.clone(), epoch);
				entry.timer = Some(self.scheduler.schedule(entry.interval, task));
			},
		}
	}
}
