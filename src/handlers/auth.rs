// src/handlers/auth.rs

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{common::error::AppError, config::AppState, middleware::auth::AuthenticatedUser};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[validate(length(min = 1, message = "O campo 'username' é obrigatório."))]
    pub username: String,

    #[validate(length(min = 1, message = "O campo 'password' é obrigatório."))]
    pub password: String,
}

pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (token, user) = app_state
        .auth_service
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(json!({ "token": token, "user": user })))
}

pub async fn get_me(user: AuthenticatedUser) -> impl IntoResponse {
    Json(user.0)
}
