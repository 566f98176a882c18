//! Mock gateway implementation for testing and development.
//!
//! Answers verification calls from a scripted sequence of outcomes instead
//! of a live backend. Once the script is used up the last entry repeats, so
//! a script of `["pending"]` simulates a payment that never settles.

use crate::{GatewayError, VerificationGateway};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use verifier_types::VerifyOutcome;

/// Implementation name used in configuration.
pub const NAME: &str = "mock";

/// Configuration for the mock gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockGatewayConfig {
	/// Outcome per call, in order: "success", "pending" or "failed".
	#[serde(default = "default_outcomes")]
	pub outcomes: Vec<String>,
}

fn default_outcomes() -> Vec<String> {
	vec!["pending".to_string()]
}

/// Mock gateway backend that replays a scripted outcome sequence.
///
/// Clones share the script and the call counter, so a test can hand one
/// clone to the verifier and keep another for assertions.
#[derive(Clone)]
pub struct MockGateway {
	script: Arc<Vec<VerifyOutcome>>,
	calls: Arc<AtomicUsize>,
}

impl MockGateway {
	/// Creates a mock that replays `script` call by call.
	///
	/// The script must be non-empty; the last entry repeats once the
	/// script is exhausted.
	pub fn with_script(script: Vec<VerifyOutcome>) -> Self {
		assert!(!script.is_empty(), "mock script must not be empty");
		Self {
			script: Arc::new(script),
			calls: Arc::new(AtomicUsize::new(0)),
		}
	}

	/// Number of verification calls served so far.
	pub fn call_count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl VerificationGateway for MockGateway {
	fn name(&self) -> &str {
		NAME
	}

	async fn verify(&self, _order_id: &str) -> Result<VerifyOutcome, GatewayError> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);
		let index = call.min(self.script.len() - 1);
		Ok(self.script[index].clone())
	}
}

/// Factory function to create a mock gateway from configuration.
///
/// Configuration parameters:
/// - `outcomes` (optional, default `["pending"]`): scripted outcome names
pub fn create_gateway(
	config: &toml::Value,
) -> Result<Box<dyn VerificationGateway>, GatewayError> {
	let config: MockGatewayConfig = config
		.clone()
		.try_into()
		.map_err(|e| GatewayError::Configuration(format!("Invalid mock gateway config: {}", e)))?;

	let script = config
		.outcomes
		.iter()
		.map(|name| match name.as_str() {
			"success" => Ok(VerifyOutcome::Success { detail: None }),
			"pending" => Ok(VerifyOutcome::Pending),
			"failed" => Ok(VerifyOutcome::Failed {
				reason: "scripted failure".to_string(),
			}),
			other => Err(GatewayError::Configuration(format!(
				"Unknown scripted outcome '{}'",
				other
			))),
		})
		.collect::<Result<Vec<_>, _>>()?;

	if script.is_empty() {
		return Err(GatewayError::Configuration(
			"outcomes cannot be empty".to_string(),
		));
	}

	Ok(Box::new(MockGateway::with_script(script)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn replays_script_then_repeats_last() {
		let mock = MockGateway::with_script(vec![
			VerifyOutcome::Pending,
			VerifyOutcome::Success {
				detail: Some("ok".to_string()),
			},
		]);

		assert_eq!(mock.verify("o").await.unwrap(), VerifyOutcome::Pending);
		assert_eq!(
			mock.verify("o").await.unwrap(),
			VerifyOutcome::Success {
				detail: Some("ok".to_string())
			}
		);
		// Script exhausted: last entry repeats
		assert_eq!(
			mock.verify("o").await.unwrap(),
			VerifyOutcome::Success {
				detail: Some("ok".to_string())
			}
		);
		assert_eq!(mock.call_count(), 3);
	}

	#[test]
	fn factory_parses_outcome_names() {
		let config: toml::Value =
			toml::from_str(r#"outcomes = ["pending", "pending", "failed"]"#).unwrap();
		let gateway = create_gateway(&config).unwrap();
		assert_eq!(gateway.name(), "mock");
	}

	#[test]
	fn factory_rejects_unknown_names() {
		let config: toml::Value = toml::from_str(r#"outcomes = ["maybe"]"#).unwrap();
		assert!(create_gateway(&config).is_err());
	}
}
