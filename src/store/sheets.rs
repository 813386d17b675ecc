// src/store/sheets.rs

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use super::backend::{CellUpdate, StoreError, StoreHealth, TabularStore};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

// Os campos do JSON da service account que realmente usamos.
// O arquivo completo tem mais chaves (project_id, auth_uri...), mas o serde
// ignora o resto sozinho.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

// Claims da assertion OAuth2 (fluxo server-to-server do Google).
#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

struct CachedToken {
    value: String,
    expires_at: i64, // epoch seconds
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct ValuesResponse {
    values: Option<Vec<Vec<serde_json::Value>>>,
}

// Backend de produção: API REST do Google Sheets v4, autenticado com a
// service account. O token de acesso fica em cache até perto de expirar.
pub struct SheetsStore {
    http: reqwest::Client,
    spreadsheet_id: String,
    key: ServiceAccountKey,
    token: Mutex<Option<CachedToken>>,
}

impl SheetsStore {
    pub fn new(key: ServiceAccountKey, spreadsheet_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            spreadsheet_id,
            key,
            token: Mutex::new(None),
        }
    }

    // Assina a assertion RS256 e troca por um access token no token_uri.
    async fn fetch_token(&self) -> Result<CachedToken, StoreError> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| StoreError::Credentials(format!("private_key ilegível: {e}")))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| StoreError::Credentials(format!("falha ao assinar assertion: {e}")))?;

        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::BadResponse(format!("token: {e}")))?;
        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + token.expires_in,
        })
    }

    async fn access_token(&self) -> Result<String, StoreError> {
        let mut guard = self.token.lock().await;
        let now = Utc::now().timestamp();
        if let Some(cached) = guard.as_ref() {
            // Margem de 60s para não usar um token à beira de expirar.
            if cached.expires_at - 60 > now {
                return Ok(cached.value.clone());
            }
        }
        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    fn values_url(&self, suffix: &str) -> String {
        format!("{SHEETS_API}/{}/values/{suffix}", self.spreadsheet_id)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.as_u16() == 429 {
        return Err(StoreError::RateLimited);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        // O Google também sinaliza quota por status no corpo.
        if body.contains("RESOURCE_EXHAUSTED") {
            return Err(StoreError::RateLimited);
        }
        return Err(StoreError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

fn stringify_cell(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl TabularStore for SheetsStore {
    async fn read_table(&self, title: &str) -> Result<Option<Vec<Vec<String>>>, StoreError> {
        let token = self.access_token().await?;
        let url = self.values_url(title);
        let resp = self.http.get(&url).bearer_auth(&token).send().await?;
        match check_status(resp).await {
            Ok(ok) => {
                let parsed: ValuesResponse = ok
                    .json()
                    .await
                    .map_err(|e| StoreError::BadResponse(format!("values: {e}")))?;
                let rows = parsed
                    .values
                    .unwrap_or_default()
                    .iter()
                    .map(|row| row.iter().map(stringify_cell).collect())
                    .collect();
                Ok(Some(rows))
            }
            // Aba inexistente vem como 400 "Unable to parse range".
            Err(StoreError::Http { status: 400, body }) if body.contains("Unable to parse range") => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_table(&self, title: &str, rows: u32, cols: u32) -> Result<(), StoreError> {
        let token = self.access_token().await?;
        let url = format!("{SHEETS_API}/{}:batchUpdate", self.spreadsheet_id);
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": rows, "columnCount": cols }
                    }
                }
            }]
        });
        let resp = self.http.post(&url).bearer_auth(&token).json(&body).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn update_range(
        &self,
        title: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), StoreError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}?valueInputOption=USER_ENTERED",
            self.values_url(&format!("{title}!{range}"))
        );
        let body = json!({ "values": values });
        let resp = self.http.put(&url).bearer_auth(&token).json(&body).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn append_rows(&self, title: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            self.values_url(title)
        );
        let body = json!({ "values": rows });
        let resp = self.http.post(&url).bearer_auth(&token).json(&body).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn batch_update(&self, title: &str, updates: Vec<CellUpdate>) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }
        let token = self.access_token().await?;
        let url = format!("{SHEETS_API}/{}/values:batchUpdate", self.spreadsheet_id);
        let data: Vec<serde_json::Value> = updates
            .iter()
            .map(|u| {
                json!({
                    "range": format!("{title}!{}", u.range),
                    "values": u.values,
                })
            })
            .collect();
        let body = json!({ "valueInputOption": "USER_ENTERED", "data": data });
        let resp = self.http.post(&url).bearer_auth(&token).json(&body).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn probe(&self) -> Result<StoreHealth, StoreError> {
        let token = self.access_token().await?;
        let url = format!(
            "{SHEETS_API}/{}?fields=properties.title,sheets.properties.title",
            self.spreadsheet_id
        );
        let resp = self.http.get(&url).bearer_auth(&token).send().await?;
        let resp = check_status(resp).await?;

        #[derive(Deserialize)]
        struct SheetProps {
            title: String,
        }
        #[derive(Deserialize)]
        struct SheetEntry {
            properties: SheetProps,
        }
        #[derive(Deserialize)]
        struct Meta {
            properties: SheetProps,
            #[serde(default)]
            sheets: Vec<SheetEntry>,
        }

        let meta: Meta = resp
            .json()
            .await
            .map_err(|e| StoreError::BadResponse(format!("metadata: {e}")))?;
        Ok(StoreHealth {
            title: meta.properties.title,
            tables: meta.sheets.into_iter().map(|s| s.properties.title).collect(),
        })
    }
}
