// src/models/request.rs

use serde::Serialize;

/// Uma linha de pedido, na ordem física das colunas da aba Requests.
/// Várias linhas compartilham o mesmo `order_id`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLine {
    pub req_time: String,
    pub order_id: String,
    pub username: String,
    pub branch_code: String,
    pub item_code: String,
    pub item_name: String,
    pub qty: i64,
    pub status: String,
    pub note: String,
}

impl RequestLine {
    /// Valores posicionais para o append (ordem do cabeçalho padrão).
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.req_time.clone(),
            self.order_id.clone(),
            self.username.clone(),
            self.branch_code.clone(),
            self.item_code.clone(),
            self.item_name.clone(),
            self.qty.to_string(),
            self.status.clone(),
            self.note.clone(),
        ]
    }
}

/// Uma linha que não passou na validação de estoque.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockShortage {
    pub code: String,
    pub name: String,
    pub available: f64,
    pub requested: i64,
}

// O recibo de um envio bem-sucedido. `warnings` carrega os efeitos
// secundários que falharam (espelho de auditoria, dedução de estoque):
// sucesso degradado, nunca erro.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub order_id: String,
    pub line_count: usize,
    pub warnings: Vec<String>,
}

/// Um pedido agrupado para o histórico recente do usuário.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: String,
    pub total_qty: i64,
    pub last_time: String,
}
