// src/services/auth.rs

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    models::auth::{cell_is_active, Claims, PortalUser, StoredCredential},
    store::{
        accessor::{SheetAccessor, USERS},
        columns::{canonical_index, MatchMode},
    },
};

#[derive(Clone)]
pub struct AuthService {
    accessor: SheetAccessor,
    jwt_secret: String,
    default_branch: String,
}

impl AuthService {
    pub fn new(accessor: SheetAccessor, jwt_secret: String, default_branch: String) -> Self {
        Self {
            accessor,
            jwt_secret,
            default_branch,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(String, PortalUser), AppError> {
        let table = self.accessor.get_table(&USERS).await?;
        let header = &table.header;

        // Username é obrigatório; de credencial basta UMA das duas colunas.
        let username_idx = canonical_index(header, "username", MatchMode::Exact);
        let password_idx = canonical_index(header, "password", MatchMode::Exact);
        let hash_idx = canonical_index(header, "passwordhash", MatchMode::Exact);

        let mut missing = Vec::new();
        if username_idx.is_none() {
            missing.push("Username".to_string());
        }
        if password_idx.is_none() && hash_idx.is_none() {
            missing.push("Password | PasswordHash".to_string());
        }
        if !missing.is_empty() {
            return Err(AppError::MissingColumns {
                table: USERS.title.to_string(),
                missing,
            });
        }
        let username_idx = username_idx.ok_or_else(|| AppError::MissingColumns {
            table: USERS.title.to_string(),
            missing: vec!["Username".to_string()],
        })?;

        let wanted = username.trim().to_lowercase();
        if wanted.is_empty() {
            return Err(AppError::InvalidCredentials);
        }
        let row = table
            .rows
            .iter()
            .find(|row| {
                row.get(username_idx)
                    .map(|c| c.trim().to_lowercase() == wanted)
                    .unwrap_or(false)
            })
            .ok_or(AppError::InvalidCredentials)?;

        let cell = |idx: Option<usize>| -> String {
            idx.and_then(|i| row.get(i))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        // Conta inativa cai na mesma mensagem genérica das credenciais.
        let active_idx = canonical_index(header, "active", MatchMode::Exact);
        if let Some(i) = active_idx {
            if !cell_is_active(row.get(i).map(String::as_str).unwrap_or("")) {
                return Err(AppError::InvalidCredentials);
            }
        }

        let credential = StoredCredential {
            password_hash: cell(hash_idx),
            password: cell(password_idx),
        };
        if !verify_credential(credential, password.to_string()).await? {
            return Err(AppError::InvalidCredentials);
        }

        let branch_idx = canonical_index(header, "branchcode", MatchMode::Exact);
        let branch_code = self.derive_branch_code(&cell(branch_idx)).await;

        let user = PortalUser {
            username: cell(Some(username_idx)),
            display_name: cell(canonical_index(header, "displayname", MatchMode::Exact)),
            role: cell(canonical_index(header, "role", MatchMode::Exact)),
            branch_code,
        };
        let token = self.create_token(&user)?;
        tracing::info!("Login de '{}' (sucursal {})", user.username, user.branch_code);
        Ok((token, user))
    }

    // Sucursal: valor da linha do usuário; senão a primeira linha da aba
    // Branches; senão o padrão configurado. Erro lendo Branches não derruba o
    // login — sempre foi melhor esforço.
    async fn derive_branch_code(&self, row_value: &str) -> String {
        let bc = row_value.trim();
        if !bc.is_empty() {
            return bc.to_string();
        }
        if let Ok(Some(table)) = self.accessor.try_get_table("Branches").await {
            // A aba Branches tem as próprias grafias de cabeçalho, "code"
            // genérico incluso (que no catálogo significaria itemcode).
            const CANDIDATES: [&str; 5] = ["code", "branchcode", "branch_code", "รหัสสาขา", "สาขา"];
            let idx = table
                .header
                .iter()
                .position(|h| CANDIDATES.contains(&h.trim().to_lowercase().as_str()))
                .unwrap_or(0);
            if let Some(first) = table.rows.first() {
                let guess = first.get(idx).map(|s| s.trim()).unwrap_or("");
                if !guess.is_empty() {
                    return guess.to_string();
                }
            }
        }
        self.default_branch.clone()
    }

    fn create_token(&self, user: &PortalUser) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: user.username.clone(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
            user: user.clone(),
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    pub fn validate_token(&self, token: &str) -> Result<PortalUser, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims.user)
    }
}

// bcrypt primeiro: hash presente decide sozinho (true/false). Hash presente
// mas ilegível é erro de configuração com mensagem própria — o operador
// resolve, o usuário não. Só cai na igualdade de texto puro quando NÃO há
// hash e a coluna Password existe.
async fn verify_credential(cred: StoredCredential, raw: String) -> Result<bool, AppError> {
    let hash = cred.password_hash.trim().to_string();
    if !hash.is_empty() {
        let raw_clone = raw.clone();
        // Verificação em thread separada, bcrypt é caro.
        let result = tokio::task::spawn_blocking(move || bcrypt::verify(&raw_clone, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))?;
        return match result {
            Ok(ok) => Ok(ok),
            Err(_) => Err(AppError::HashUnavailable),
        };
    }
    let plain = cred.password.trim();
    if !plain.is_empty() {
        return Ok(raw == plain);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::retry::RetryPolicy;
    use crate::store::memory::MemoryStore;
    use std::sync::Arc;

    fn service(store: Arc<MemoryStore>) -> AuthService {
        AuthService::new(
            SheetAccessor::new(store, RetryPolicy::default()),
            "segredo-de-teste".to_string(),
            "SWC000".to_string(),
        )
    }

    async fn seeded(users: Vec<Vec<&str>>) -> (Arc<MemoryStore>, AuthService) {
        let store = Arc::new(MemoryStore::new());
        store.seed("Users", users).await;
        let svc = service(store.clone());
        (store, svc)
    }

    #[tokio::test]
    async fn plaintext_login_roundtrip() {
        let (_, svc) = seeded(vec![
            vec!["Username", "DisplayName", "Role", "Password", "Active", "BranchCode"],
            vec!["jdoe", "John Doe", "staff", "s3cret", "y", "SWC015"],
        ])
        .await;

        let (token, user) = svc.login("JDoe", "s3cret").await.unwrap();
        assert_eq!(user.username, "jdoe");
        assert_eq!(user.branch_code, "SWC015");

        let decoded = svc.validate_token(&token).unwrap();
        assert_eq!(decoded.username, "jdoe");
    }

    #[tokio::test]
    async fn wrong_password_is_generic() {
        let (_, svc) = seeded(vec![
            vec!["Username", "Password"],
            vec!["jdoe", "s3cret"],
        ])
        .await;
        assert!(matches!(
            svc.login("jdoe", "errada").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn unknown_user_is_the_same_generic_error() {
        let (_, svc) = seeded(vec![
            vec!["Username", "Password"],
            vec!["jdoe", "s3cret"],
        ])
        .await;
        assert!(matches!(
            svc.login("ninguem", "s3cret").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn inactive_account_is_generic_too() {
        let (_, svc) = seeded(vec![
            vec!["Username", "Password", "Active"],
            vec!["jdoe", "s3cret", "N"],
        ])
        .await;
        assert!(matches!(
            svc.login("jdoe", "s3cret").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn bcrypt_hash_wins_over_plaintext() {
        let hash = bcrypt::hash("s3cret", 4).unwrap();
        let (_, svc) = seeded(vec![
            vec!["Username", "Password", "PasswordHash"],
            vec!["jdoe", "outra-coisa", hash.as_str()],
        ])
        .await;

        assert!(svc.login("jdoe", "s3cret").await.is_ok());
        // O texto puro NÃO vale quando existe hash.
        assert!(matches!(
            svc.login("jdoe", "outra-coisa").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn malformed_hash_is_an_operator_error() {
        let (_, svc) = seeded(vec![
            vec!["Username", "PasswordHash"],
            vec!["jdoe", "isto-nao-e-bcrypt"],
        ])
        .await;
        assert!(matches!(
            svc.login("jdoe", "tanto-faz").await,
            Err(AppError::HashUnavailable)
        ));
    }

    #[tokio::test]
    async fn missing_credential_columns_are_reported() {
        let (_, svc) = seeded(vec![
            vec!["Username", "DisplayName"],
            vec!["jdoe", "John"],
        ])
        .await;
        match svc.login("jdoe", "x").await {
            Err(AppError::MissingColumns { table, missing }) => {
                assert_eq!(table, "Users");
                assert_eq!(missing, vec!["Password | PasswordHash".to_string()]);
            }
            other => panic!("esperava MissingColumns, veio {other:?}"),
        }
    }

    #[tokio::test]
    async fn branch_code_falls_back_to_branches_then_default() {
        let (store, svc) = seeded(vec![
            vec!["Username", "Password"],
            vec!["jdoe", "s3cret"],
        ])
        .await;

        // Sem aba Branches: padrão configurado.
        let (_, user) = svc.login("jdoe", "s3cret").await.unwrap();
        assert_eq!(user.branch_code, "SWC000");

        // Com Branches: primeira linha, coluna de código.
        store
            .seed("Branches", vec![vec!["Name", "Code"], vec!["Matriz", "SWC001"]])
            .await;
        let (_, user) = svc.login("jdoe", "s3cret").await.unwrap();
        assert_eq!(user.branch_code, "SWC001");
    }

    #[tokio::test]
    async fn thai_headers_resolve() {
        let (_, svc) = seeded(vec![
            vec!["ชื่อผู้ใช้", "รหัสผ่าน", "สถานะ"],
            vec!["jdoe", "s3cret", "y"],
        ])
        .await;
        assert!(svc.login("jdoe", "s3cret").await.is_ok());
    }
}
