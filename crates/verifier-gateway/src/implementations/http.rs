//! HTTP gateway implementation.
//!
//! Talks to the backend verification endpoint over HTTPS. One verification
//! call is a POST to `{endpoint}/verify` carrying the order id; the answer
//! is the tagged outcome object. Connection errors, timeouts and 5xx
//! responses surface as transport errors for the caller's retry policy.

use crate::{GatewayError, VerificationGateway};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use verifier_types::VerifyOutcome;

/// Implementation name used in configuration.
pub const NAME: &str = "http";

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpGatewayConfig {
	/// Base URL of the backend verification service.
	pub endpoint: String,
	/// Request timeout in seconds.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
	/// Optional bearer token sent with each request.
	#[serde(default)]
	pub auth_token: Option<String>,
}

/// Returns the default request timeout in seconds.
fn default_timeout_seconds() -> u64 {
	10
}

/// HTTP-based gateway backend.
pub struct HttpGateway {
	client: reqwest::Client,
	config: HttpGatewayConfig,
}

impl HttpGateway {
	/// Creates a new HttpGateway from validated configuration.
	pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(config.timeout_seconds))
			.build()
			.map_err(|e| GatewayError::Configuration(e.to_string()))?;

		Ok(Self { client, config })
	}

	fn verify_url(&self) -> String {
		format!("{}/verify", self.config.endpoint.trim_end_matches('/'))
	}
}

#[async_trait]
impl VerificationGateway for HttpGateway {
	fn name(&self) -> &str {
		NAME
	}

	async fn verify(&self, order_id: &str) -> Result<VerifyOutcome, GatewayError> {
		let mut request = self
			.client
			.post(self.verify_url())
			.json(&serde_json::json!({ "order_id": order_id }));

		if let Some(token) = &self.config.auth_token {
			request = request.bearer_auth(token);
		}

		let response = request
			.send()
			.await
			.map_err(|e| GatewayError::Transport(e.to_string()))?;

		let status = response.status();
		if status.is_server_error() {
			return Err(GatewayError::Transport(format!(
				"Gateway returned {}",
				status
			)));
		}
		if !status.is_success() {
			return Err(GatewayError::InvalidResponse(format!(
				"Gateway returned {}",
				status
			)));
		}

		response
			.json::<VerifyOutcome>()
			.await
			.map_err(|e| GatewayError::InvalidResponse(e.to_string()))
	}
}

/// Factory function to create an HTTP gateway from configuration.
///
/// Configuration parameters:
/// - `endpoint` (required): base URL of the verification service
/// - `timeout_seconds` (optional, default 10)
/// - `auth_token` (optional)
pub fn create_gateway(
	config: &toml::Value,
) -> Result<Box<dyn VerificationGateway>, GatewayError> {
	let config: HttpGatewayConfig = config
		.clone()
		.try_into()
		.map_err(|e| GatewayError::Configuration(format!("Invalid http gateway config: {}", e)))?;

	if config.endpoint.is_empty() {
		return Err(GatewayError::Configuration(
			"endpoint cannot be empty".to_string(),
		));
	}
	if !config.endpoint.starts_with("http://") && !config.endpoint.starts_with("https://") {
		return Err(GatewayError::Configuration(format!(
			"endpoint must be an http(s) URL, got '{}'",
			config.endpoint
		)));
	}

	Ok(Box::new(HttpGateway::new(config)?))
}
