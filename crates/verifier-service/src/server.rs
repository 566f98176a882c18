//! HTTP server for the verifier API.
//!
//! Exposes the verification lifecycle over three endpoints: start a
//! session from a gateway return URL (or a bare order id), inspect a
//! session, and cancel one. The gateway parameters are read exactly once
//! at session start; the response carries the sanitized URL for the
//! client to display, whatever the polling outcome turns out to be.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::Json,
	routing::{get, post},
	Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use verifier_config::{ApiConfig, Config};
use verifier_core::{progress, StartOptions, Verifier, VerifierError};
use verifier_gateway::return_url::{self, GatewayReturn};
use verifier_types::{
	ApiError, GetVerificationResponse, StartVerificationRequest, StartVerificationResponse,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Verifier engine processing the requests.
	pub verifier: Arc<Verifier>,
	/// Complete configuration.
	pub config: Config,
}

/// Starts the HTTP server for the verification API.
pub async fn start_server(
	api_config: ApiConfig,
	config: Config,
	verifier: Arc<Verifier>,
) -> anyhow::Result<()> {
	let app_state = AppState { verifier, config };

	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/verifications", post(handle_start))
				.route(
					"/verifications/{order_id}",
					get(handle_get).delete(handle_cancel),
				),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(app_state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Verifier API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST /api/verifications requests.
///
/// Accepts either a gateway return URL (order id and token are read from
/// it once, and the sanitized address comes back as `displayUrl`) or a
/// bare order id. Starting an order that is already being polled is a
/// no-op returning the existing session unchanged.
async fn handle_start(
	State(state): State<AppState>,
	Json(request): Json<StartVerificationRequest>,
) -> Result<Json<StartVerificationResponse>, ApiError> {
	let params = &state.config.gateway.return_params;

	let (order_id, display_url) = match (&request.return_url, &request.order_id) {
		(Some(url), _) => {
			let parsed = GatewayReturn::from_url(url, &params.order_id, &params.token)
				.ok_or_else(|| {
					ApiError::InvalidRequest(format!(
						"return URL carries no '{}' parameter",
						params.order_id
					))
				})?;
			let display =
				return_url::sanitize(url, &[params.order_id.as_str(), params.token.as_str()]);
			(parsed.order_id, Some(display))
		},
		(None, Some(order_id)) => (order_id.clone(), None),
		(None, None) => {
			return Err(ApiError::InvalidRequest(
				"either returnUrl or orderId is required".to_string(),
			));
		},
	};

	let session = state
		.verifier
		.start_verification(&order_id, StartOptions::default())
		.await
		.map_err(map_verifier_error)?;
	let progress = progress::report(session.max_attempts, session.attempts);

	Ok(Json(StartVerificationResponse {
		session,
		progress,
		display_url,
	}))
}

/// Handles GET /api/verifications/{order_id} requests.
async fn handle_get(
	Path(order_id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<GetVerificationResponse>, ApiError> {
	let session = state
		.verifier
		.session(&order_id)
		.await
		.ok_or(ApiError::NotFound(order_id))?;
	let progress = progress::report(session.max_attempts, session.attempts);

	Ok(Json(GetVerificationResponse { session, progress }))
}

/// Handles DELETE /api/verifications/{order_id} requests.
///
/// Cancellation is idempotent and safe for unknown orders, so this always
/// answers 204.
async fn handle_cancel(
	Path(order_id): Path<String>,
	State(state): State<AppState>,
) -> StatusCode {
	state.verifier.cancel_verification(&order_id).await;
	StatusCode::NO_CONTENT
}

/// Maps verifier errors onto API errors.
fn map_verifier_error(err: VerifierError) -> ApiError {
	match err {
		VerifierError::InvalidRequest(message) => ApiError::InvalidRequest(message),
		VerifierError::SessionNotFound(order_id) => ApiError::NotFound(order_id),
		other => ApiError::Internal(other.to_string()),
	}
}
