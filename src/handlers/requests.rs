// src/handlers/requests.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{common::error::AppError, config::AppState, middleware::auth::AuthenticatedUser};

// Envia a seleção atual da sessão como um pedido.
pub async fn submit(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    // Snapshot da seleção sem segurar o lock durante o I/O da planilha.
    let selection = {
        let selections = app_state.selections.read().await;
        selections.get(&user.0.username).cloned().unwrap_or_default()
    };

    let receipt = app_state.request_service.submit(&user.0, &selection).await?;

    // Committed: só aqui a seleção é limpa. Em qualquer falha o `?` acima já
    // saiu, e a seleção fica intacta para o usuário tentar de novo.
    app_state.selections.write().await.remove(&user.0.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!(
                "Pedido {} gravado ({} linha(s)).",
                receipt.order_id, receipt.line_count
            ),
            "receipt": receipt,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

pub async fn recent(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let orders = app_state
        .request_service
        .recent_orders(&user.0.username, params.limit.unwrap_or(20))
        .await?;
    Ok(Json(orders))
}
