// src/store/backend.rs

use async_trait::async_trait;
use thiserror::Error;

// Erros do backend de armazenamento tabular.
// A única classe que o accessor repete automaticamente é a de rate limit
// (HTTP 429 / RESOURCE_EXHAUSTED); todo o resto sobe na hora.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("limite de requisições excedido (HTTP 429)")]
    RateLimited,

    #[error("falha HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("falha de rede: {0}")]
    Network(#[from] reqwest::Error),

    #[error("resposta inesperada da API: {0}")]
    BadResponse(String),

    #[error("credenciais da service account inválidas: {0}")]
    Credentials(String),
}

impl StoreError {
    pub fn is_rate_limited(&self) -> bool {
        match self {
            StoreError::RateLimited => true,
            StoreError::Http { status, .. } => *status == 429,
            StoreError::Network(e) => e.status().map(|s| s.as_u16() == 429).unwrap_or(false),
            _ => false,
        }
    }
}

// Um bloco retangular de células para escrita em lote.
// O `range` é em notação A1 local à aba (ex.: "C5"); o backend prefixa o título.
#[derive(Debug, Clone)]
pub struct CellUpdate {
    pub range: String,
    pub values: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct StoreHealth {
    pub title: String,
    pub tables: Vec<String>,
}

// A visão "grade de células" do armazenamento remoto. Tudo é String porque é
// assim que a planilha devolve: a normalização numérica acontece nas camadas
// de cima (catálogo, etc.), nunca aqui.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Todas as células da aba, linha a linha. `None` se a aba não existe.
    async fn read_table(&self, title: &str) -> Result<Option<Vec<Vec<String>>>, StoreError>;

    /// Cria uma aba vazia com as dimensões sugeridas.
    async fn create_table(&self, title: &str, rows: u32, cols: u32) -> Result<(), StoreError>;

    /// Escreve um bloco retangular a partir de `range` (notação A1 local).
    async fn update_range(
        &self,
        title: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), StoreError>;

    /// Acrescenta linhas depois da última linha com dados, posicionalmente.
    async fn append_rows(&self, title: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError>;

    /// Escritas pontuais em lote (melhor esforço, sem transação).
    async fn batch_update(&self, title: &str, updates: Vec<CellUpdate>) -> Result<(), StoreError>;

    /// Checagem de conectividade: título da planilha e abas existentes.
    async fn probe(&self) -> Result<StoreHealth, StoreError>;
}

// Converte um índice de coluna (0-based) para letras A1 (A, B, ..., Z, AA, ...).
pub fn column_letter(mut idx: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "A")]
    #[case(1, "B")]
    #[case(25, "Z")]
    #[case(26, "AA")]
    #[case(27, "AB")]
    #[case(51, "AZ")]
    #[case(52, "BA")]
    #[case(701, "ZZ")]
    fn column_letter_cases(#[case] idx: usize, #[case] expected: &str) {
        assert_eq!(column_letter(idx), expected);
    }

    #[test]
    fn rate_limit_detection() {
        assert!(StoreError::RateLimited.is_rate_limited());
        assert!(StoreError::Http { status: 429, body: String::new() }.is_rate_limited());
        assert!(!StoreError::Http { status: 403, body: String::new() }.is_rate_limited());
        assert!(!StoreError::BadResponse("x".into()).is_rate_limited());
    }
}
