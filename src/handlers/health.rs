// src/handlers/health.rs

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::config::AppState;

// Health check público: quais chaves de configuração existem e se a planilha
// responde. Falha de conectividade vira payload de erro, não 500 — a página
// existe justamente para diagnosticar isso.
pub async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    let found = &app_state.settings.found_keys;

    match app_state.accessor.probe().await {
        Ok(health) => Json(json!({
            "status": "ok",
            "spreadsheet": health.title,
            "tables": health.tables,
            "configKeys": found,
        })),
        Err(e) => Json(json!({
            "status": "error",
            "error": e.to_string(),
            "configKeys": found,
        })),
    }
}
