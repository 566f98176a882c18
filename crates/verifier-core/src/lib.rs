//! Core polling engine for the payment verifier.
//!
//! This crate owns the payment-confirmation polling mechanism: a bounded,
//! single-flight, cancellable sequence of verification calls per order.
//! The [`Verifier`] drives sessions through the state machine in
//! [`state`], suspends between attempts only through the [`scheduler`]
//! abstraction, and reports outcomes over the [`event_bus`].

/// Broadcast bus for session events.
pub mod event_bus;
/// Poller driving verification sessions.
pub mod poller;
/// Progress derivation from session counters.
pub mod progress;
/// Session registry and single-flight admission.
mod registry;
/// Delayed, cancellable callback abstraction.
pub mod scheduler;
/// Pure session state machine.
pub mod state;

pub use event_bus::EventBus;
pub use poller::{StartOptions, Verifier, VerifierError, VerifierOptions};
pub use scheduler::{ScheduledTask, Scheduler, TimerHandle, TokioScheduler};
