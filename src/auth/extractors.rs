//! Axum extractors for authentication and client metadata.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::api::ApiResponse;
use crate::auth::device::{extract_client_ip, extract_device_info};
use crate::auth::filter::AuthContext;
use crate::db::User;

/// Extractor for endpoints that require an authenticated identity.
/// Rejects with 401 when the filter did not populate an auth context.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .map(|ctx| CurrentUser(ctx.user.clone()))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ApiResponse::failure("Not authenticated")),
                )
                    .into_response()
            })
    }
}

/// Client IP and device fingerprint for the current request.
/// Never fails; both values are best-effort.
pub struct ClientMeta {
    pub ip: Option<String>,
    pub device: String,
}

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientMeta {
            ip: extract_client_ip(&parts.headers, &parts.extensions),
            device: extract_device_info(&parts.headers),
        })
    }
}
