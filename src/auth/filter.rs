//! Per-request bearer token authentication.
//!
//! The filter runs as router middleware on every API request. A missing
//! Authorization header (or one without the Bearer prefix) is a legitimate
//! unauthenticated request and passes through; downstream extractors decide
//! whether the route actually requires an identity. A present token that
//! fails to decode short-circuits the request with a structured error body.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::AppState;
use crate::auth::AuthError;
use crate::db::User;

/// Request-scoped authenticated identity, inserted into request extensions
/// by the filter and read back by the `CurrentUser` extractor. Lives for
/// one request only.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Middleware that resolves a bearer token into an [`AuthContext`].
pub async fn authenticate_request(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return next.run(request).await;
    };

    let subject = match state.jwt.subject_of(token) {
        Ok(subject) => subject,
        Err(e) => return AuthError::Token(e).into_response(),
    };

    let user = match state.db.users().get_by_email(&subject).await {
        Ok(Some(user)) => user,
        Ok(None) => return AuthError::IdentityNotFound.into_response(),
        Err(e) => return AuthError::Store(e).into_response(),
    };

    if state.jwt.is_valid(token, &user) {
        debug!(user_id = user.id, "Authenticated request");
        request.extensions_mut().insert(AuthContext { user });
    }

    next.run(request).await
}
