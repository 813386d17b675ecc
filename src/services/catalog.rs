// src/services/catalog.rs

use crate::{
    common::error::AppError,
    models::{
        auth::cell_is_active,
        catalog::{parse_stock_cell, CatalogItem},
    },
    store::{
        accessor::{SheetAccessor, ITEMS},
        columns::{canonical_index, MatchMode},
    },
};

// O lado de leitura do catálogo (aba Items). Lê fresco a cada chamada — a
// planilha é pequena e é editada por fora, então não vale a pena cachear.
#[derive(Clone)]
pub struct CatalogService {
    accessor: SheetAccessor,
}

impl CatalogService {
    pub fn new(accessor: SheetAccessor) -> Self {
        Self { accessor }
    }

    /// Todos os itens, inativos inclusive — a validação de pedido olha o
    /// catálogo inteiro. `stock: None` quando a aba não rastreia estoque.
    pub async fn load(&self) -> Result<Vec<CatalogItem>, AppError> {
        let table = self.accessor.get_table(&ITEMS).await?;
        let header = &table.header;

        let code_idx = canonical_index(header, "itemcode", MatchMode::Exact).ok_or_else(|| {
            AppError::MissingColumns {
                table: ITEMS.title.to_string(),
                missing: vec!["ItemCode".to_string()],
            }
        })?;
        let name_idx = canonical_index(header, "itemname", MatchMode::Exact);
        let stock_idx = canonical_index(header, "stock", MatchMode::Exact);
        let unit_idx = canonical_index(header, "unit", MatchMode::Exact);
        let category_idx = canonical_index(header, "category", MatchMode::Exact);
        let active_idx = canonical_index(header, "active", MatchMode::Exact);

        let cell = |row: &Vec<String>, idx: Option<usize>| -> String {
            idx.and_then(|i| row.get(i))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };

        let items = table
            .rows
            .iter()
            .filter_map(|row| {
                let code = cell(row, Some(code_idx));
                if code.is_empty() {
                    return None;
                }
                Some(CatalogItem {
                    code,
                    name: cell(row, name_idx),
                    stock: stock_idx.map(|i| parse_stock_cell(row.get(i).map(String::as_str).unwrap_or(""))),
                    unit: cell(row, unit_idx),
                    category: cell(row, category_idx),
                    active: active_idx
                        .map(|i| cell_is_active(row.get(i).map(String::as_str).unwrap_or("")))
                        .unwrap_or(true),
                })
            })
            .collect();
        Ok(items)
    }

    /// A listagem que o formulário mostra: só ativos, com busca opcional por
    /// código ou nome (substring, caixa-insensível).
    pub async fn list_items(&self, search: Option<&str>) -> Result<Vec<CatalogItem>, AppError> {
        let mut items: Vec<CatalogItem> = self
            .load()
            .await?
            .into_iter()
            .filter(|item| item.active)
            .collect();

        if let Some(q) = search {
            let q = q.trim().to_lowercase();
            if !q.is_empty() {
                items.retain(|item| {
                    item.code.to_lowercase().contains(&q) || item.name.to_lowercase().contains(&q)
                });
            }
        }
        Ok(items)
    }
}
