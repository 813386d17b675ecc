// src/models/auth.rs

use serde::{Deserialize, Serialize};

/// O perfil do usuário logado, já com o código de sucursal derivado.
/// Vem da aba Users (somente leitura para o portal).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalUser {
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub branch_code: String,
}

// Claims do token de sessão. O perfil inteiro viaja no token para não
// reler a aba Users a cada requisição.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub user: PortalUser,
}

/// Células de credencial de uma linha da aba Users, antes da verificação.
#[derive(Debug, Clone, Default)]
pub struct StoredCredential {
    pub password_hash: String,
    pub password: String,
}

// A planilha marca contas desativadas de vários jeitos; tudo que não for
// uma negação explícita conta como ativo (célula vazia inclusive).
pub fn cell_is_active(value: &str) -> bool {
    let s = value.trim().to_lowercase();
    !matches!(s.as_str(), "n" | "no" | "0" | "false" | "inactive" | "disabled")
}
