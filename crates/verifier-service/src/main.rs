//! Main entry point for the payment verifier service.
//!
//! This binary wires the configured gateway implementation into the
//! polling engine and exposes the verification API over HTTP. It uses a
//! modular architecture with pluggable gateway implementations resolved
//! by name from configuration.

use anyhow::Context;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use verifier_config::Config;
use verifier_core::{EventBus, TokioScheduler, Verifier, VerifierOptions};
use verifier_gateway::{GatewayFactory, GatewayService};
use verifier_types::{truncate_id, SessionEvent};

mod server;

/// Command-line arguments for the verifier service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the verifier service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the verifier with the configured gateway implementation
/// 5. Runs the API server until interrupted
#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.to_string()));

	fmt().with_env_filter(env_filter).with_target(true).init();

	tracing::info!("Started verifier");

	// Load configuration
	let config_path = args
		.config
		.to_str()
		.context("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path)
		.await
		.with_context(|| format!("Failed to load configuration from {}", config_path))?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	// Build the verifier with the configured gateway
	let verifier = Arc::new(build_verifier(&config)?);

	let api_enabled = config.api.as_ref().is_some_and(|api| api.enabled);
	let events = log_events(verifier.subscribe());

	if api_enabled {
		let api_config = config
			.api
			.clone()
			.context("API enabled but not configured")?;
		let api_task = server::start_server(api_config, config.clone(), Arc::clone(&verifier));

		tokio::select! {
			result = api_task => {
				tracing::info!("API server finished");
				result?;
			}
			_ = events => {}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Shutdown signal received");
			}
		}
	} else {
		tracing::warn!("API server disabled, running event log only");
		tokio::select! {
			_ = events => {}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Shutdown signal received");
			}
		}
	}

	tracing::info!("Stopped verifier");
	Ok(())
}

/// Builds the verifier with the configured gateway implementation.
///
/// Gateway implementations register themselves by name; the configured
/// primary is resolved against that registry and constructed from its own
/// TOML section.
fn build_verifier(config: &Config) -> anyhow::Result<Verifier> {
	let factories: HashMap<&str, GatewayFactory> =
		verifier_gateway::get_all_implementations().into_iter().collect();

	let primary = config.gateway.primary.as_str();
	let factory = factories
		.get(primary)
		.with_context(|| format!("Unknown gateway implementation '{}'", primary))?;
	let implementation_config = config
		.gateway
		.implementations
		.get(primary)
		.with_context(|| format!("Missing configuration for gateway '{}'", primary))?;
	let backend =
		factory(implementation_config).context("Failed to construct gateway implementation")?;

	tracing::info!(gateway = primary, "Gateway implementation ready");

	Ok(Verifier::new(
		Arc::new(GatewayService::new(backend)),
		Arc::new(TokioScheduler),
		EventBus::default(),
		VerifierOptions {
			max_attempts: config.polling.max_attempts,
			interval: Duration::from_millis(config.polling.interval_ms),
			transport_errors_are_pending: config.gateway.treat_transport_errors_as_pending,
		},
	))
}

/// Logs every session event; also keeps the event bus alive.
async fn log_events(mut receiver: broadcast::Receiver<SessionEvent>) {
	loop {
		match receiver.recv().await {
			Ok(event) => {
				tracing::debug!(
					order_id = %truncate_id(event.order_id()),
					event = ?event,
					"Session event"
				);
			},
			Err(broadcast::error::RecvError::Lagged(missed)) => {
				tracing::warn!(missed, "Event logger lagged behind");
			},
			Err(broadcast::error::RecvError::Closed) => break,
		}
	}
}
