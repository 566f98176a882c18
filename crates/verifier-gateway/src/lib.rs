//! Gateway module for the payment verifier.
//!
//! This module handles the single backend collaborator of the polling
//! subsystem: the verification endpoint that answers whether a payment has
//! settled. It supports different gateway implementations behind one trait,
//! and owns the handling of gateway return URLs (parameter read + sanitize).

use async_trait::async_trait;
use thiserror::Error;
use verifier_types::{truncate_id, VerifyOutcome};

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod mock;
}

/// Return URL handling: parameter extraction and sanitizing.
pub mod return_url;

/// Errors that can occur during gateway verification calls.
#[derive(Debug, Error)]
pub enum GatewayError {
	/// Error that occurs during network communication; retryable by policy.
	#[error("Transport error: {0}")]
	Transport(String),
	/// Error that occurs when the gateway answers something unparseable.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for gateway verification backends.
///
/// This trait must be implemented by any backend that wants to answer
/// verification calls. One call carries one order id; the response is one
/// of success, pending, or failed. Transport problems surface as
/// [`GatewayError::Transport`] and are classified by the caller's policy.
#[async_trait]
pub trait VerificationGateway: Send + Sync {
	/// Returns the implementation name (e.g. "http").
	fn name(&self) -> &str;

	/// Asks the gateway whether the payment for `order_id` has settled.
	async fn verify(&self, order_id: &str) -> Result<VerifyOutcome, GatewayError>;
}

/// Type alias for gateway factory functions.
///
/// This is the function signature that all gateway implementations must
/// provide to create instances of their interface from raw TOML config.
pub type GatewayFactory = fn(&toml::Value) -> Result<Box<dyn VerificationGateway>, GatewayError>;

/// Get all registered gateway implementations.
///
/// Returns a vector of (name, factory) tuples for all available gateway
/// implementations. Used by the service wiring to resolve the configured
/// primary implementation by name.
pub fn get_all_implementations() -> Vec<(&'static str, GatewayFactory)> {
	use implementations::{http, mock};

	vec![
		(http::NAME, http::create_gateway),
		(mock::NAME, mock::create_gateway),
	]
}

/// Service wrapping the configured gateway backend.
///
/// Adds tracing around each verification call; classification of transport
/// errors into pending/fatal is the poller's job, so errors pass through
/// unchanged here.
pub struct GatewayService {
	/// The underlying gateway implementation.
	backend: Box<dyn VerificationGateway>,
}

impl GatewayService {
	/// Creates a new GatewayService with the specified backend.
	pub fn new(backend: Box<dyn VerificationGateway>) -> Self {
		Self { backend }
	}

	/// Performs one verification call for `order_id`.
	pub async fn verify(&self, order_id: &str) -> Result<VerifyOutcome, GatewayError> {
		let result = self.backend.verify(order_id).await;
		match &result {
			Ok(outcome) => {
				tracing::debug!(
					order_id = %truncate_id(order_id),
					gateway = self.backend.name(),
					outcome = ?outcome,
					"Verification call completed"
				);
			},
			Err(e) => {
				tracing::warn!(
					order_id = %truncate_id(order_id),
					gateway = self.backend.name(),
					error = %e,
					"Verification call failed"
				);
			},
		}
		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::mock::MockGateway;

	#[tokio::test]
	async fn service_delegates_to_backend() {
		let backend = MockGateway::with_script(vec![
			VerifyOutcome::Pending,
			VerifyOutcome::Success { detail: None },
		]);
		let service = GatewayService::new(Box::new(backend));

		assert_eq!(service.verify("order-1").await.unwrap(), VerifyOutcome::Pending);
		assert_eq!(
			service.verify("order-1").await.unwrap(),
			VerifyOutcome::Success { detail: None }
		);
	}
}
