//! Custom Axum extractors for request authentication.
//!
//! Provides `AdminAuth`, which checks the `EventSync-Admin-Authorization`
//! header against the argon2 hash of the admin secret. When no admin secret
//! is configured every request passes.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use eventsync_sdk::headers::ADMIN_AUTH_HEADER;
use eventsync_sdk::objects::ErrorResponse;

use crate::state::AppState;

/// Marker extractor for the admin endpoints.
///
/// # Header format
///
/// ```text
/// EventSync-Admin-Authorization: {plaintext_admin_secret}
/// ```
pub struct AdminAuth;

/// Errors returned by the [`AdminAuth`] extractor.
#[derive(Debug, thiserror::Error)]
pub enum AdminAuthError {
    #[error("missing EventSync-Admin-Authorization header")]
    MissingHeader,
    #[error("invalid EventSync-Admin-Authorization header")]
    InvalidHeader,
    #[error("admin secret verification failed")]
    VerificationFailed,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let (status, kind) = match self {
            AdminAuthError::MissingHeader => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AdminAuthError::InvalidHeader => (StatusCode::BAD_REQUEST, "invalid_header"),
            AdminAuthError::VerificationFailed => (StatusCode::UNAUTHORIZED, "unauthorized"),
        };
        let body = ErrorResponse {
            kind: kind.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(admin) = state.admin.as_ref() else {
            return Ok(AdminAuth);
        };

        let secret = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidHeader)?;

        if admin.verify_secret(secret) {
            Ok(AdminAuth)
        } else {
            tracing::warn!("admin request rejected: wrong secret");
            Err(AdminAuthError::VerificationFailed)
        }
    }
}
