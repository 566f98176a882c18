//! Scheduler abstraction for delayed, cancellable callbacks.
//!
//! The scheduler is the only suspension primitive the poller uses: every
//! wait between verification attempts goes through [`Scheduler::schedule`],
//! and the returned [`TimerHandle`] is the single ownership token for the
//! pending callback. Injecting the scheduler as a trait keeps the poller
//! testable without real wall-clock delay and lets tests instrument
//! scheduling decisions.

use futures::future::BoxFuture;
use std::time::Duration;
use tokio::task::AbortHandle;

/// A unit of work the scheduler runs after a delay.
pub type ScheduledTask = BoxFuture<'static, ()>;

/// Abstraction over delayed, cancellable callbacks.
pub trait Scheduler: Send + Sync {
	/// Runs `task` once `delay` has elapsed.
	///
	/// The returned handle owns the pending timer: dropping it cancels the
	/// callback if it has not fired yet.
	fn schedule(&self, delay: Duration, task: ScheduledTask) -> TimerHandle;
}

/// Ownership token for at most one pending scheduled callback.
///
/// Cancellation is released on every exit path: explicit [`cancel`],
/// [`disarm`] from within the fired callback, or simply dropping the
/// handle. Cancelling a handle whose callback already fired or was already
/// cancelled is a no-op, never an error.
///
/// [`cancel`]: TimerHandle::cancel
/// [`disarm`]: TimerHandle::disarm
#[derive(Debug)]
pub struct TimerHandle {
	inner: Option<AbortHandle>,
}

impl TimerHandle {
	/// Wraps a task abort handle as an owned timer.
	pub fn new(handle: AbortHandle) -> Self {
		Self {
			inner: Some(handle),
		}
	}

	/// Cancels the pending callback. Idempotent.
	pub fn cancel(&mut self) {
		if let Some(handle) = self.inner.take() {
			handle.abort();
		}
	}

	/// Releases the handle without cancelling.
	///
	/// A fired callback calls this on its own handle: the timer is spent,
	/// and aborting the task that is currently running it would cut the
	/// callback short.
	pub fn disarm(&mut self) {
		self.inner = None;
	}

	/// True while the callback has neither fired nor been cancelled.
	pub fn is_live(&self) -> bool {
		self.inner.as_ref().is_some_and(|handle| !handle.is_finished())
	}
}

impl Drop for TimerHandle {
	fn drop(&mut self) {
		self.cancel();
	}
}

/// Scheduler backed by the tokio runtime.
///
/// Each scheduled callback is a spawned task that sleeps for the delay and
/// then runs the work; under a paused test runtime the sleep resolves on
/// the virtual clock, so tests never wait in real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
	fn schedule(&self, delay: Duration, task: ScheduledTask) -> TimerHandle {
		let join = tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			task.await;
		});
		TimerHandle::new(join.abort_handle())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicBool, Ordering};
	use std::sync::Arc;

	fn flag_task(flag: &Arc<AtomicBool>) -> ScheduledTask {
		let flag = flag.clone();
		Box::pin(async move {
			flag.store(true, Ordering::SeqCst);
		})
	}

	#[tokio::test(start_paused = true)]
	async fn fires_after_delay() {
		let fired = Arc::new(AtomicBool::new(false));
		let handle = TokioScheduler.schedule(Duration::from_millis(100), flag_task(&fired));

		tokio::time::sleep(Duration::from_millis(99)).await;
		assert!(!fired.load(Ordering::SeqCst));
		assert!(handle.is_live());

		tokio::time::sleep(Duration::from_millis(2)).await;
		assert!(fired.load(Ordering::SeqCst));
		assert!(!handle.is_live());
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_prevents_firing() {
		let fired = Arc::new(AtomicBool::new(false));
		let mut handle = TokioScheduler.schedule(Duration::from_millis(100), flag_task(&fired));

		handle.cancel();
		// Double-cancel is a no-op, not an error
		handle.cancel();

		tokio::time::sleep(Duration::from_millis(200)).await;
		assert!(!fired.load(Ordering::SeqCst));
		assert!(!handle.is_live());
	}

	#[tokio::test(start_paused = true)]
	async fn drop_cancels() {
		let fired = Arc::new(AtomicBool::new(false));
		let handle = TokioScheduler.schedule(Duration::from_millis(100), flag_task(&fired));
		drop(handle);

		tokio::time::sleep(Duration::from_millis(200)).await;
		assert!(!fired.load(Ordering::SeqCst));
	}

	#[tokio::test(start_paused = true)]
	async fn disarm_releases_without_cancelling() {
		let fired = Arc::new(AtomicBool::new(false));
		let mut handle = TokioScheduler.schedule(Duration::from_millis(100), flag_task(&fired));
		handle.disarm();
		drop(handle);

		tokio::time::sleep(Duration::from_millis(200)).await;
		assert!(fired.load(Ordering::SeqCst));
	}
}
