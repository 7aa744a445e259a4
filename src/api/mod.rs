mod auth;
mod error;
mod users;

use std::sync::Arc;

use axum::{Router, middleware};
use serde::Serialize;

use crate::AppState;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ResultExt};

/// Uniform response envelope for every API endpoint, including filter
/// short-circuits.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            error: Some(message.clone()),
            message,
            data: None,
        }
    }
}

/// Create the API router. The authentication filter wraps every route;
/// routes that require an identity use the `CurrentUser` extractor.
pub fn create_api_router(state: AppState, rate_limits: Arc<RateLimitConfig>) -> Router {
    Router::new()
        .nest("/auth", auth::router(state.clone(), rate_limits))
        .merge(users::router(state.clone()))
        .layer(middleware::from_fn_with_state(
            state,
            crate::auth::authenticate_request,
        ))
}
