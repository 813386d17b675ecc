// src/models/catalog.rs

use serde::Serialize;

/// Um item do catálogo (aba Items). Somente leitura do ponto de vista do
/// fluxo de pedido; o estoque só é tocado se a dedução estiver ligada.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub code: String,
    pub name: String,
    /// `None` quando a aba não rastreia estoque (sem coluna de stock).
    pub stock: Option<f64>,
    pub unit: String,
    pub category: String,
    pub active: bool,
}

// Normaliza a célula de estoque: remove separador de milhar, vazio vira 0.
// Qualquer coisa ilegível também vira 0 — é o que o portal sempre fez.
pub fn parse_stock_cell(value: &str) -> f64 {
    let cleaned = value.replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("10", 10.0)]
    #[case(" 1,234 ", 1234.0)]
    #[case("2.5", 2.5)]
    #[case("", 0.0)]
    #[case("   ", 0.0)]
    #[case("n/a", 0.0)]
    fn stock_cell_normalization(#[case] cell: &str, #[case] expected: f64) {
        assert_eq!(parse_stock_cell(cell), expected);
    }
}
