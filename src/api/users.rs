//! Endpoints operating on the authenticated user.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use super::ApiResponse;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::db::User;

/// Public view of a user record.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub authorities: Vec<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            authorities: user.authorities.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/me", get(me)).with_state(state)
}

async fn me(CurrentUser(user): CurrentUser) -> Json<ApiResponse<UserProfile>> {
    Json(ApiResponse::success("OK", UserProfile::from(&user)))
}
