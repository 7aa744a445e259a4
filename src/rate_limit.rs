//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to prevent brute force
//! and signup spam.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

use crate::api::ApiResponse;
use crate::auth::extract_client_ip;

/// Per-IP rate limiter for endpoint-specific limiting.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration for authentication endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Per-IP limiter for registration (10 per minute)
    pub register: Arc<IpLimiter>,
    /// Per-IP limiter for credential login (2 per second, burst of 10)
    pub login: Arc<IpLimiter>,
    /// Per-IP limiter for refresh token rotation (5 per second, burst of 20)
    pub refresh: Arc<IpLimiter>,
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self {
            register: Arc::new(RateLimiter::keyed(Quota::per_minute(
                NonZeroU32::new(10).unwrap(),
            ))),
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(NonZeroU32::new(2).unwrap())
                    .allow_burst(NonZeroU32::new(10).unwrap()),
            )),
            refresh: Arc::new(RateLimiter::keyed(
                Quota::per_second(NonZeroU32::new(5).unwrap())
                    .allow_burst(NonZeroU32::new(20).unwrap()),
            )),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn check(limiter: &IpLimiter, request: Request, message: &'static str) -> Result<Request, Response> {
    let Some(ip) = extract_client_ip(request.headers(), request.extensions()) else {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::failure("Unable to determine client IP")),
        )
            .into_response());
    };

    match limiter.check_key(&ip) {
        Ok(_) => Ok(request),
        Err(_) => Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiResponse::failure(message)),
        )
            .into_response()),
    }
}

/// Middleware for rate limiting registration.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        &config.register,
        request,
        "Too many signup attempts. Please wait before trying again.",
    ) {
        Ok(request) => next.run(request).await,
        Err(response) => response,
    }
}

/// Middleware for rate limiting credential login.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        &config.login,
        request,
        "Too many authentication attempts. Please wait before trying again.",
    ) {
        Ok(request) => next.run(request).await,
        Err(response) => response,
    }
}

/// Middleware for rate limiting refresh token rotation.
pub async fn rate_limit_refresh(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        &config.refresh,
        request,
        "Too many requests. Please try again later.",
    ) {
        Ok(request) => next.run(request).await,
        Err(response) => response,
    }
}
