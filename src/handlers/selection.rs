// src/handlers/selection.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::{common::error::AppError, config::AppState, middleware::auth::AuthenticatedUser};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SelectionPayload {
    #[validate(range(min = 0, message = "A quantidade não pode ser negativa."))]
    pub qty: i64,

    // Marcar a linha é o caso comum; desmarcar manda included=false.
    #[serde(default = "default_included")]
    pub included: bool,
}

fn default_included() -> bool {
    true
}

pub async fn get_selection(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    let selections = app_state.selections.read().await;
    Json(selections.get(&user.0.username).cloned().unwrap_or_default())
}

pub async fn upsert_line(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(code): Path<String>,
    Json(payload): Json<SelectionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut selections = app_state.selections.write().await;
    let selection = selections.entry(user.0.username.clone()).or_default();
    selection.upsert(&code, payload.qty, payload.included);
    Ok(Json(selection.clone()))
}

pub async fn clear_selection(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    app_state.selections.write().await.remove(&user.0.username);
    StatusCode::NO_CONTENT
}
