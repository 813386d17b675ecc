// src/services/request_service.rs

use std::collections::HashMap;

use chrono::{Local, NaiveDateTime};

use crate::{
    common::error::AppError,
    models::{
        auth::PortalUser,
        catalog::CatalogItem,
        request::{OrderSummary, RequestLine, StockShortage, SubmitReceipt},
        selection::SelectionSet,
    },
    services::{catalog::CatalogService, sequence},
    store::{
        accessor::{SheetAccessor, ITEMS, REQUESTS, TRANSACTIONS},
        backend::{column_letter, CellUpdate},
        columns::{canonical_index, MatchMode},
    },
};

// O workflow de envio de pedido: Idle -> Validating -> (Rejected | Persisting)
// -> (Committed | Failed). É o único componente que muta estado durável.
//
// Efeitos secundários (espelho de auditoria, dedução de estoque) são melhor
// esforço e NÃO transacionais com o append principal: se falharem depois do
// pedido gravado, o recibo sai com warnings (sucesso degradado).
#[derive(Clone)]
pub struct RequestService {
    accessor: SheetAccessor,
    catalog: CatalogService,
    deduct_stock: bool,
    audit_mirror: bool,
}

impl RequestService {
    pub fn new(
        accessor: SheetAccessor,
        catalog: CatalogService,
        deduct_stock: bool,
        audit_mirror: bool,
    ) -> Self {
        Self {
            accessor,
            catalog,
            deduct_stock,
            audit_mirror,
        }
    }

    pub async fn submit(
        &self,
        user: &PortalUser,
        selection: &SelectionSet,
    ) -> Result<SubmitReceipt, AppError> {
        self.submit_at(user, selection, Local::now().naive_local()).await
    }

    pub async fn submit_at(
        &self,
        user: &PortalUser,
        selection: &SelectionSet,
        now: NaiveDateTime,
    ) -> Result<SubmitReceipt, AppError> {
        let chosen = selection.chosen();
        if chosen.is_empty() {
            return Err(AppError::EmptySelection);
        }

        // --- Validating ---
        let items = self.catalog.load().await?;
        let by_code: HashMap<&str, &CatalogItem> =
            items.iter().map(|item| (item.code.as_str(), item)).collect();

        let mut shortages: Vec<StockShortage> = Vec::new();
        for (code, qty) in &chosen {
            match by_code.get(code.as_str()) {
                None => shortages.push(StockShortage {
                    code: code.clone(),
                    name: "não encontrado no catálogo".to_string(),
                    available: 0.0,
                    requested: *qty,
                }),
                Some(item) => {
                    // Só valida quando a aba rastreia estoque.
                    if let Some(stock) = item.stock {
                        if *qty as f64 > stock {
                            shortages.push(StockShortage {
                                code: code.clone(),
                                name: item.name.clone(),
                                available: stock,
                                requested: *qty,
                            });
                        }
                    }
                }
            }
        }
        if !shortages.is_empty() {
            // Rejected: TODAS as linhas com problema, de uma vez.
            return Err(AppError::InsufficientStock(shortages));
        }

        // --- Persisting ---
        // Um ID só para o envio inteiro; todas as linhas o compartilham.
        let order_id = self.next_order_id(&user.username, now).await?;
        let now_str = now.format("%Y-%m-%d %H:%M:%S").to_string();

        let lines: Vec<RequestLine> = chosen
            .iter()
            .map(|(code, qty)| {
                let item = by_code.get(code.as_str());
                RequestLine {
                    req_time: now_str.clone(),
                    order_id: order_id.clone(),
                    username: user.username.clone(),
                    branch_code: user.branch_code.clone(),
                    item_code: code.clone(),
                    item_name: item.map(|i| i.name.clone()).unwrap_or_default(),
                    qty: *qty,
                    status: "Pending".to_string(),
                    note: String::new(),
                }
            })
            .collect();

        // Garante a aba (e o cabeçalho) antes do append posicional.
        self.accessor.get_table(&REQUESTS).await?;
        self.accessor
            .append_rows(REQUESTS.title, lines.iter().map(RequestLine::to_row).collect())
            .await?;

        // --- Committed (com possíveis warnings) ---
        let mut warnings = Vec::new();

        if self.audit_mirror {
            if let Err(e) = self.mirror_to_transactions(&lines).await {
                tracing::warn!("Espelho de auditoria falhou para {}: {}", order_id, e);
                warnings.push(format!("Espelho de auditoria não gravado: {e}"));
            }
        }

        if self.deduct_stock {
            if let Err(e) = self.deduct(&chosen, &by_code).await {
                tracing::warn!("Dedução de estoque falhou para {}: {}", order_id, e);
                warnings.push(format!("Estoque não deduzido: {e}"));
            }
        }

        tracing::info!(
            "Pedido {} gravado ({} linha(s)) para '{}'",
            order_id,
            lines.len(),
            user.username
        );
        Ok(SubmitReceipt {
            order_id,
            line_count: lines.len(),
            warnings,
        })
    }

    // Varre a coluna de ID da aba Requests e delega o cálculo ao gerador.
    // Sem reserva: a corrida ler-depois-gravar do esquema original continua
    // existindo aqui.
    async fn next_order_id(&self, username: &str, now: NaiveDateTime) -> Result<String, AppError> {
        let table = self.accessor.get_table(&REQUESTS).await?;
        // Fallback para a coluna física 1, como o app antigo fazia.
        let id_idx = canonical_index(&table.header, "reqid", MatchMode::Exact).unwrap_or(1);
        let ids = table
            .rows
            .iter()
            .filter_map(|row| row.get(id_idx))
            .map(String::as_str);
        Ok(sequence::next_order_id(ids, username, now.date()))
    }

    async fn mirror_to_transactions(&self, lines: &[RequestLine]) -> Result<(), AppError> {
        self.accessor.get_table(&TRANSACTIONS).await?;
        let rows = lines
            .iter()
            .map(|line| {
                vec![
                    line.req_time.clone(),
                    line.order_id.clone(),
                    line.username.clone(),
                    line.branch_code.clone(),
                    line.item_code.clone(),
                    line.item_name.clone(),
                    line.qty.to_string(),
                    "OUT".to_string(),
                    line.note.clone(),
                ]
            })
            .collect();
        self.accessor.append_rows(TRANSACTIONS.title, rows).await
    }

    // Dedução de estoque por posição de linha, melhor esforço. O novo valor
    // sai do snapshot carregado na validação — se alguém mexeu no estoque no
    // meio do caminho, gravamos por cima mesmo (fraqueza herdada e mantida).
    async fn deduct(
        &self,
        chosen: &[(String, i64)],
        by_code: &HashMap<&str, &CatalogItem>,
    ) -> Result<(), AppError> {
        self.accessor.ensure_header_has(&ITEMS, &["Stock"]).await?;
        let table = self.accessor.get_table(&ITEMS).await?;

        let code_idx = canonical_index(&table.header, "itemcode", MatchMode::Exact).ok_or_else(
            || AppError::MissingColumns {
                table: ITEMS.title.to_string(),
                missing: vec!["ItemCode".to_string()],
            },
        )?;
        let stock_idx = canonical_index(&table.header, "stock", MatchMode::Exact).ok_or_else(
            || AppError::MissingColumns {
                table: ITEMS.title.to_string(),
                missing: vec!["Stock".to_string()],
            },
        )?;

        // código -> número de linha física (1-based, cabeçalho é a linha 1)
        let mut code_to_rownum: HashMap<&str, usize> = HashMap::new();
        for (i, row) in table.rows.iter().enumerate() {
            let code = row.get(code_idx).map(|s| s.trim()).unwrap_or("");
            if !code.is_empty() {
                code_to_rownum.entry(code).or_insert(i + 2);
            }
        }

        let mut updates = Vec::new();
        for (code, qty) in chosen {
            let (Some(rownum), Some(item)) =
                (code_to_rownum.get(code.as_str()), by_code.get(code.as_str()))
            else {
                continue;
            };
            let new_stock = item.stock.unwrap_or(0.0) - *qty as f64;
            updates.push(CellUpdate {
                range: format!("{}{}", column_letter(stock_idx), rownum),
                values: vec![vec![new_stock.to_string()]],
            });
        }
        if updates.is_empty() {
            return Ok(());
        }
        self.accessor.batch_update(ITEMS.title, updates).await
    }

    /// Histórico recente do usuário, agrupado por pedido (qty somada, hora
    /// mais recente), do mais novo para o mais antigo.
    pub async fn recent_orders(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<OrderSummary>, AppError> {
        let table = self.accessor.get_table(&REQUESTS).await?;
        let header = &table.header;
        let time_idx = canonical_index(header, "reqtime", MatchMode::Exact).unwrap_or(0);
        let id_idx = canonical_index(header, "reqid", MatchMode::Exact).unwrap_or(1);
        let user_idx = canonical_index(header, "username", MatchMode::Exact).unwrap_or(2);
        let qty_idx = canonical_index(header, "qty", MatchMode::Exact).unwrap_or(6);

        let wanted = username.trim().to_lowercase();
        let mut grouped: HashMap<String, OrderSummary> = HashMap::new();
        for row in &table.rows {
            let row_user = row.get(user_idx).map(|s| s.trim().to_lowercase()).unwrap_or_default();
            if row_user != wanted {
                continue;
            }
            let order_id = row.get(id_idx).map(|s| s.trim().to_string()).unwrap_or_default();
            if order_id.is_empty() {
                continue;
            }
            let qty: i64 = row
                .get(qty_idx)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .map(|q| q as i64)
                .unwrap_or(0);
            let time = row.get(time_idx).map(|s| s.trim().to_string()).unwrap_or_default();

            let entry = grouped.entry(order_id.clone()).or_insert(OrderSummary {
                order_id,
                total_qty: 0,
                last_time: String::new(),
            });
            entry.total_qty += qty;
            if time > entry.last_time {
                entry.last_time = time;
            }
        }

        let mut orders: Vec<OrderSummary> = grouped.into_values().collect();
        // O formato "%Y-%m-%d %H:%M:%S" ordena lexicograficamente.
        orders.sort_by(|a, b| b.last_time.cmp(&a.last_time));
        orders.truncate(limit);
        Ok(orders)
    }
}
