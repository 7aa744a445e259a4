//! Error handling for the authentication filter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use crate::api::ApiResponse;
use crate::jwt::TokenError;

/// Failures produced while authenticating a request.
///
/// Expired tokens are routine and map to 401. Malformed or unsupported
/// tokens should never come from our own clients, so they map to 500 as an
/// anomaly worth investigating. Store failures stay distinct from any
/// invalid-token condition: a transient outage must not log users out.
#[derive(Debug)]
pub enum AuthError {
    Token(TokenError),
    IdentityNotFound,
    Store(sqlx::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::Token(TokenError::Expired) => {
                (StatusCode::UNAUTHORIZED, "JWT token has expired".to_string())
            }
            AuthError::Token(e) => {
                warn!(error = %e, "Rejected bearer token");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AuthError::IdentityNotFound => {
                (StatusCode::UNAUTHORIZED, "User not found".to_string())
            }
            AuthError::Store(e) => {
                error!(error = %e, "User lookup failed during authentication");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
        };
        (status, Json(ApiResponse::failure(message))).into_response()
    }
}
