//! Configuration module for the payment verifier.
//!
//! This module provides structures and utilities for managing verifier
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required configuration values are
//! properly set before any polling starts.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the verifier.
///
/// Contains all sections required to run: service identity, polling
/// parameters, the gateway collaborator, and the optional HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this verifier instance.
	pub service: ServiceConfig,
	/// Polling parameters for verification sessions.
	pub polling: PollingConfig,
	/// Configuration for the gateway verification backend.
	pub gateway: GatewayConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to this verifier instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this verifier instance.
	pub id: String,
}

/// Polling parameters for verification sessions.
///
/// The interval deliberately has no default: the reference behavior does
/// not pin a number, so deployments must choose one explicitly.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PollingConfig {
	/// Attempt budget per session. Defaults to 10.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	/// Delay between verification attempts, in milliseconds. Required.
	pub interval_ms: u64,
}

/// Returns the default attempt budget per session.
fn default_max_attempts() -> u32 {
	10
}

/// Configuration for the gateway verification backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Whether transport errors count as a pending (retryable) result.
	/// Defaults to true; when false they end the session as failed.
	#[serde(default = "default_transport_as_pending")]
	pub treat_transport_errors_as_pending: bool,
	/// Names of the query parameters the gateway appends to its return URL.
	#[serde(default)]
	pub return_params: ReturnParams,
	/// Map of gateway implementation names to their configurations.
	/// Each implementation has its own format stored as raw TOML values.
	pub implementations: HashMap<String, toml::Value>,
}

/// Returns the default transport-error policy.
fn default_transport_as_pending() -> bool {
	true
}

/// Names of the query parameters read once from the gateway return URL
/// and stripped from the displayed address.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReturnParams {
	/// Query parameter carrying the gateway order identifier.
	#[serde(default = "default_order_id_param")]
	pub order_id: String,
	/// Query parameter carrying the one-time verification token.
	#[serde(default = "default_token_param")]
	pub token: String,
}

impl Default for ReturnParams {
	fn default() -> Self {
		Self {
			order_id: default_order_id_param(),
			token: default_token_param(),
		}
	}
}

fn default_order_id_param() -> String {
	"order_id".to_string()
}

fn default_token_param() -> String {
	"token".to_string()
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
}

/// Returns the default API host.
fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

/// Returns the default API port.
fn default_api_port() -> u16 {
	3000
}

/// Returns the default API timeout in seconds.
fn default_api_timeout() -> u64 {
	30
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).expect("capture 0 always present");
		let var_name = cap.get(1).expect("group 1 always present").as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let raw = tokio::fs::read_to_string(path).await?;
		raw.parse()
	}

	/// Validates the configuration to ensure all required fields are
	/// properly set.
	///
	/// - Ensures the service id is not empty
	/// - Checks polling bounds (`max_attempts` in 1..=100, interval >= 1ms)
	/// - Verifies the primary gateway exists among the implementations
	/// - Ensures the two return parameter names are distinct and non-empty
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service id cannot be empty".into()));
		}

		if self.polling.max_attempts == 0 {
			return Err(ConfigError::Validation(
				"polling.max_attempts must be at least 1".into(),
			));
		}
		if self.polling.max_attempts > 100 {
			return Err(ConfigError::Validation(
				"polling.max_attempts cannot exceed 100".into(),
			));
		}
		if self.polling.interval_ms == 0 {
			return Err(ConfigError::Validation(
				"polling.interval_ms must be at least 1".into(),
			));
		}

		if self.gateway.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one gateway implementation must be configured".into(),
			));
		}
		if self.gateway.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Gateway primary implementation cannot be empty".into(),
			));
		}
		if !self
			.gateway
			.implementations
			.contains_key(&self.gateway.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary gateway '{}' not found in implementations",
				self.gateway.primary
			)));
		}

		let params = &self.gateway.return_params;
		if params.order_id.is_empty() || params.token.is_empty() {
			return Err(ConfigError::Validation(
				"Return parameter names cannot be empty".into(),
			));
		}
		if params.order_id == params.token {
			return Err(ConfigError::Validation(format!(
				"Return parameters must be distinct, both are '{}'",
				params.order_id
			)));
		}

		Ok(())
	}
}

/// Implementation of FromStr for Config to enable parsing from string.
///
/// Environment variables are resolved and the configuration is
/// automatically validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE_CONFIG: &str = r#"
[service]
id = "invoice-verifier"

[polling]
interval_ms = 3000

[gateway]
primary = "http"

[gateway.return_params]
order_id = "cashfree_order_id"
token = "token"

[gateway.implementations.http]
endpoint = "https://backend.internal/payments"
"#;

	#[test]
	fn parses_with_defaults() {
		let config: Config = BASE_CONFIG.parse().unwrap();
		assert_eq!(config.service.id, "invoice-verifier");
		assert_eq!(config.polling.max_attempts, 10);
		assert_eq!(config.polling.interval_ms, 3000);
		assert!(config.gateway.treat_transport_errors_as_pending);
		assert_eq!(config.gateway.return_params.order_id, "cashfree_order_id");
		assert!(config.api.is_none());
	}

	#[test]
	fn interval_is_required() {
		let config_str = BASE_CONFIG.replace("interval_ms = 3000", "");
		let result = config_str.parse::<Config>();
		assert!(result.is_err());
	}

	#[test]
	fn env_var_resolution() {
		std::env::set_var("TEST_VERIFIER_ENDPOINT", "https://pay.example");
		let input = "endpoint = \"${TEST_VERIFIER_ENDPOINT}/verify\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "endpoint = \"https://pay.example/verify\"");
		std::env::remove_var("TEST_VERIFIER_ENDPOINT");
	}

	#[test]
	fn env_var_with_default() {
		let input = "value = \"${MISSING_VERIFIER_VAR:-fallback}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn missing_env_var_error() {
		let input = "value = \"${MISSING_VERIFIER_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("MISSING_VERIFIER_VAR"));
	}

	#[test]
	fn unknown_primary_rejected() {
		let config_str = BASE_CONFIG.replace("primary = \"http\"", "primary = \"grpc\"");
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary gateway 'grpc'"));
	}

	#[test]
	fn max_attempts_bounds_enforced() {
		let zero = BASE_CONFIG.replace("interval_ms = 3000", "interval_ms = 3000\nmax_attempts = 0");
		assert!(zero.parse::<Config>().is_err());

		let too_many =
			BASE_CONFIG.replace("interval_ms = 3000", "interval_ms = 3000\nmax_attempts = 101");
		assert!(too_many.parse::<Config>().is_err());

		let ok = BASE_CONFIG.replace("interval_ms = 3000", "interval_ms = 3000\nmax_attempts = 25");
		assert_eq!(ok.parse::<Config>().unwrap().polling.max_attempts, 25);
	}

	#[test]
	fn identical_return_params_rejected() {
		let config_str = BASE_CONFIG.replace("token = \"token\"", "token = \"cashfree_order_id\"");
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("must be distinct"));
	}

	#[test]
	fn zero_interval_rejected() {
		let config_str = BASE_CONFIG.replace("interval_ms = 3000", "interval_ms = 0");
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("interval_ms"));
	}

	#[tokio::test]
	async fn loads_from_file() {
		use std::io::Write;

		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(BASE_CONFIG.as_bytes()).unwrap();

		let config = Config::from_file(file.path().to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(config.gateway.primary, "http");
	}
}
