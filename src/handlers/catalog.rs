// src/handlers/catalog.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::{common::error::AppError, config::AppState, middleware::auth::AuthenticatedUser};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

// A lista que o formulário de pedido mostra: só itens ativos, busca opcional.
pub async fn list_items(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let items = app_state
        .catalog_service
        .list_items(params.search.as_deref())
        .await?;
    Ok(Json(items))
}
