// src/config.rs

use std::{collections::HashMap, env, sync::Arc};

use anyhow::Context;
use tokio::sync::RwLock;

use crate::{
    common::retry::RetryPolicy,
    models::selection::SelectionSet,
    services::{auth::AuthService, catalog::CatalogService, request_service::RequestService},
    store::{
        accessor::SheetAccessor,
        backend::TabularStore,
        memory::MemoryStore,
        sheets::{ServiceAccountKey, SheetsStore},
    },
};

const DEFAULT_BRANCH_CODE: &str = "SWC000";

pub struct Settings {
    pub store_backend: String,
    pub service_account: Option<ServiceAccountKey>,
    pub sheet_id: Option<String>,
    pub jwt_secret: String,
    pub default_branch_code: String,
    pub deduct_stock_on_request: bool,
    pub audit_mirror: bool,
    /// Quais chaves de configuração foram encontradas (para o health check).
    pub found_keys: Vec<String>,
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y"))
        .unwrap_or(false)
}

// Aceita o ID direto ou a URL completa da planilha (".../d/<id>/edit...").
pub fn extract_sheet_id(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.split("/d/").nth(1) {
        Some(rest) => {
            let id = rest.split(['/', '?', '#']).next().unwrap_or("");
            (!id.is_empty()).then(|| id.to_string())
        }
        None if !value.contains('/') => Some(value.to_string()),
        None => None,
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut found_keys = Vec::new();

        // Service account: JSON inline ou caminho de arquivo.
        let sa_raw = if let Ok(raw) = env::var("GOOGLE_SERVICE_ACCOUNT_JSON") {
            found_keys.push("GOOGLE_SERVICE_ACCOUNT_JSON".to_string());
            Some(raw)
        } else if let Ok(path) = env::var("GOOGLE_SERVICE_ACCOUNT_FILE") {
            found_keys.push("GOOGLE_SERVICE_ACCOUNT_FILE".to_string());
            Some(
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Falha ao ler a service account em {path}"))?,
            )
        } else {
            None
        };
        let service_account = sa_raw
            .map(|raw| serde_json::from_str::<ServiceAccountKey>(&raw))
            .transpose()
            .context("JSON da service account ilegível")?;

        // A localização da planilha aceita as várias grafias históricas.
        let mut sheet_id = None;
        for key in ["SHEET_ID", "SPREADSHEET_ID", "SHEET_URL", "SPREADSHEET_URL"] {
            if let Ok(value) = env::var(key) {
                found_keys.push(key.to_string());
                if sheet_id.is_none() {
                    sheet_id = extract_sheet_id(&value);
                }
            }
        }

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        Ok(Self {
            store_backend: env::var("STORE_BACKEND").unwrap_or_else(|_| "sheets".to_string()),
            service_account,
            sheet_id,
            jwt_secret,
            default_branch_code: env::var("DEFAULT_BRANCH_CODE")
                .unwrap_or_else(|_| DEFAULT_BRANCH_CODE.to_string()),
            // Dedução de estoque no pedido é OPT-IN explícito, nunca inferido.
            deduct_stock_on_request: env_flag("DEDUCT_STOCK_ON_REQUEST"),
            audit_mirror: env_flag("AUDIT_MIRROR"),
            found_keys,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub accessor: SheetAccessor,
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub request_service: RequestService,
    // A seleção de cada sessão, por username. No app antigo isso era o
    // session-state ambiente; aqui é estado explícito do AppState.
    pub selections: Arc<RwLock<HashMap<String, SelectionSet>>>,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let settings = Settings::from_env()?;

        let store: Arc<dyn TabularStore> = match settings.store_backend.as_str() {
            "memory" => {
                tracing::warn!("STORE_BACKEND=memory: nada será persistido (modo dev)");
                Arc::new(MemoryStore::new())
            }
            _ => {
                let key = settings.service_account.clone().context(
                    "Service Account não encontrada (GOOGLE_SERVICE_ACCOUNT_JSON ou GOOGLE_SERVICE_ACCOUNT_FILE)",
                )?;
                let id = settings
                    .sheet_id
                    .clone()
                    .context("SHEET_ID ou SHEET_URL ausente")?;
                Arc::new(SheetsStore::new(key, id))
            }
        };

        tracing::info!("✅ Backend de armazenamento pronto ({})", settings.store_backend);
        Ok(Self::with_store(store, settings))
    }

    // Separado para os testes poderem injetar um MemoryStore semeado.
    pub fn with_store(store: Arc<dyn TabularStore>, settings: Settings) -> Self {
        let accessor = SheetAccessor::new(store, RetryPolicy::default());

        // --- Monta o gráfico de dependências ---
        let auth_service = AuthService::new(
            accessor.clone(),
            settings.jwt_secret.clone(),
            settings.default_branch_code.clone(),
        );
        let catalog_service = CatalogService::new(accessor.clone());
        let request_service = RequestService::new(
            accessor.clone(),
            catalog_service.clone(),
            settings.deduct_stock_on_request,
            settings.audit_mirror,
        );

        Self {
            settings: Arc::new(settings),
            accessor,
            auth_service,
            catalog_service,
            request_service,
            selections: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_id_from_plain_id() {
        assert_eq!(extract_sheet_id("abc123XYZ"), Some("abc123XYZ".to_string()));
    }

    #[test]
    fn sheet_id_from_url() {
        let url = "https://docs.google.com/spreadsheets/d/abc123XYZ/edit#gid=0";
        assert_eq!(extract_sheet_id(url), Some("abc123XYZ".to_string()));
    }

    #[test]
    fn garbage_yields_none() {
        assert_eq!(extract_sheet_id(""), None);
        assert_eq!(extract_sheet_id("https://example.com/nada"), None);
    }
}
