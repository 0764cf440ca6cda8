//! Request gate for mutating routes
//!
//! Callers send `x-ipam-timestamp` (Unix ms) and `x-ipam-hash`, the hex
//! SHA-256 of `"{timestamp}:{secret}"`. A shared secret of 0 turns the gate off.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use ipam_common::api::{validate_hash, validate_timestamp, ApiAuthError, HASH_HEADER, TIMESTAMP_HEADER};
use serde_json::json;
use tracing::warn;

use crate::AppState;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Check the gate headers against the shared secret
pub fn check_headers(headers: &HeaderMap, shared_secret: i64) -> Result<(), ApiAuthError> {
    if shared_secret == 0 {
        return Ok(());
    }

    let timestamp = header_str(headers, TIMESTAMP_HEADER).ok_or(ApiAuthError::MissingTimestamp)?;
    let timestamp: i64 = timestamp
        .trim()
        .parse()
        .map_err(|e| ApiAuthError::ParseError(format!("{}: {}", TIMESTAMP_HEADER, e)))?;
    let hash = header_str(headers, HASH_HEADER).ok_or(ApiAuthError::MissingHash)?;

    validate_timestamp(timestamp)?;
    validate_hash(hash.trim(), timestamp, shared_secret)
}

/// Gate middleware; the handler never runs on failure
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if let Err(err) = check_headers(request.headers(), state.shared_secret) {
        if let ApiAuthError::InvalidHash { provided, calculated } = &err {
            warn!("Hash validation failed: provided={}, calculated={}", provided, calculated);
        } else {
            warn!(path = %request.uri().path(), "Request gate refused: {}", err);
        }
        return Err(AuthError(err));
    }

    Ok(next.run(request).await)
}

/// Gate failure, always 401
#[derive(Debug)]
pub struct AuthError(pub ApiAuthError);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": "UNAUTHORIZED",
                "message": self.0.to_string(),
            }
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}
