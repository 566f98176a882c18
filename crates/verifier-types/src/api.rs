//! API types for the verifier HTTP endpoints.
//!
//! Request and response structures for starting, inspecting and cancelling
//! verification sessions, plus the error body shared by all endpoints.

use crate::session::{Progress, SessionSnapshot};
use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request body for `POST /api/verifications`.
///
/// Exactly one of `return_url` or `order_id` is expected. A `return_url` is
/// the full address the gateway redirected the browser to; the order id and
/// one-time token are read from it once, and the sanitized address comes
/// back in the response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartVerificationRequest {
	/// Gateway return URL carrying the order id and token parameters.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub return_url: Option<String>,
	/// Order identifier, for callers that already extracted it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_id: Option<String>,
}

/// Response body for `POST /api/verifications`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartVerificationResponse {
	/// Session state after the first verification call.
	pub session: SessionSnapshot,
	/// Progress derived from the session counters.
	pub progress: Progress,
	/// The return URL with gateway parameters stripped, ready to display.
	/// Present only when the request carried a `return_url`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub display_url: Option<String>,
}

/// Response body for `GET /api/verifications/{order_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVerificationResponse {
	/// Current session state.
	pub session: SessionSnapshot,
	/// Progress derived from the session counters.
	pub progress: Progress,
}

/// Errors returned by the API endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
	/// The request is malformed (missing or empty order id).
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	/// No session exists for the requested order.
	#[error("Unknown order: {0}")]
	NotFound(String),
	/// Something went wrong inside the verifier.
	#[error("Internal error: {0}")]
	Internal(String),
}

impl ApiError {
	fn status_code(&self) -> StatusCode {
		match self {
			ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
			ApiError::NotFound(_) => StatusCode::NOT_FOUND,
			ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = serde_json::json!({ "error": self.to_string() });
		(self.status_code(), Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn start_request_accepts_either_field() {
		let by_url: StartVerificationRequest =
			serde_json::from_str(r#"{"returnUrl":"http://h/p?cashfree_order_id=X"}"#).unwrap();
		assert!(by_url.return_url.is_some());
		assert!(by_url.order_id.is_none());

		let by_id: StartVerificationRequest =
			serde_json::from_str(r#"{"orderId":"order-1"}"#).unwrap();
		assert_eq!(by_id.order_id.as_deref(), Some("order-1"));
	}
}
