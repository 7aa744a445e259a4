pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod rate_limit;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use auth::RefreshTokenManager;
use db::Database;
use jwt::{Clock, JwtConfig};
use rate_limit::RateLimitConfig;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Raw key material for signing tokens
    pub jwt_secret: Vec<u8>,
}

/// Shared state for API handlers and the authentication filter.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub refresh_tokens: RefreshTokenManager,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    create_app_with_clock(config, Clock::system())
}

/// Create the application router with an explicit clock (for tests).
pub fn create_app_with_clock(config: &ServerConfig, clock: Clock) -> Router {
    let jwt = Arc::new(JwtConfig::with_clock(&config.jwt_secret, clock.clone()));
    let state = AppState {
        db: config.db.clone(),
        jwt,
        refresh_tokens: RefreshTokenManager::new(config.db.clone(), clock),
    };
    let rate_limits = Arc::new(RateLimitConfig::new());

    Router::new().nest("/api/v1", api::create_api_router(state, rate_limits))
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
