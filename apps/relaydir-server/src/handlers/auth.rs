use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;
use crate::auth::create_admin_token;
use crate::error::ApiError;
use relaydir_db::models::admin::Admin;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let admin: Option<Admin> = sqlx::query_as("SELECT * FROM admins WHERE username = $1")
        .bind(&req.username)
        .fetch_optional(&state.pool)
        .await?;

    let Some(admin) = admin else {
        return Err(ApiError::Unauthorized("Invalid username or password".into()));
    };

    if !bcrypt::verify(&req.password, &admin.password_hash).unwrap_or(false) {
        return Err(ApiError::Unauthorized("Invalid username or password".into()));
    }

    let token = create_admin_token(admin.id, &admin.username, &state.jwt_secret)?;
    info!("Admin {} logged in", admin.username);
    Ok(Json(LoginResponse { token }))
}
