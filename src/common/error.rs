// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::request::StockShortage;
use crate::store::backend::StoreError;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Configuração inválida: {0}")]
    Config(String),

    // Falha no armazenamento tabular, já depois do retry. Guardamos a aba e a
    // operação para o usuário saber exatamente o que não foi gravado.
    #[error("Erro de armazenamento na aba '{table}' durante {op}: {source}")]
    Storage {
        table: String,
        op: &'static str,
        #[source]
        source: StoreError,
    },

    // Mensagem genérica de propósito: não revelamos se foi o usuário ou a
    // senha que falhou (nem conta inativa).
    #[error("Usuário não encontrado ou credencial inválida")]
    InvalidCredentials,

    // Exceção à regra acima: hash presente mas inutilizável é problema de
    // operação, não do usuário, então sai com mensagem própria.
    #[error("A conta usa senha com hash, mas o hash armazenado não pôde ser verificado")]
    HashUnavailable,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Nenhum item selecionado para enviar")]
    EmptySelection,

    #[error("Estoque insuficiente para {} item(ns)", .0.len())]
    InsufficientStock(Vec<StockShortage>),

    #[error("A aba '{table}' não tem as colunas obrigatórias: {missing:?}")]
    MissingColumns { table: String, missing: Vec<String> },

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    Internal(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            // Estoque insuficiente lista TODAS as linhas que falharam,
            // nunca só a primeira.
            AppError::InsufficientStock(lines) => {
                let body = Json(json!({
                    "error": "Estoque insuficiente para atender o pedido.",
                    "lines": lines,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }

            AppError::MissingColumns { ref table, ref missing } => {
                let body = Json(json!({
                    "error": format!("A aba '{table}' não tem as colunas obrigatórias."),
                    "missing": missing,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }

            AppError::Storage { ref table, op, ref source } => {
                // Sobe para o usuário como veio: ele precisa saber que nada
                // (ou só parte) foi gravado, para poder tentar de novo.
                tracing::error!("Erro de armazenamento em '{}' ({}): {}", table, op, source);
                let body = Json(json!({
                    "error": format!("Falha ao acessar a aba '{table}' durante {op}: {source}"),
                }));
                return (StatusCode::BAD_GATEWAY, body).into_response();
            }

            AppError::EmptySelection => (
                StatusCode::BAD_REQUEST,
                "Nenhum item selecionado para enviar.".to_string(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Usuário não encontrado ou credencial inválida.".to_string(),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),
            AppError::HashUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "A conta usa senha com hash, mas o hash armazenado não pôde ser verificado. \
                 Avise o administrador."
                    .to_string(),
            ),
            AppError::Config(ref msg) => {
                tracing::error!("Erro de configuração: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Configuração inválida: {msg}"),
                )
            }

            // Todos os outros erros viram 500. O `tracing` loga a mensagem
            // detalhada que o `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
