// src/store/accessor.rs

use std::sync::Arc;

use crate::common::error::AppError;
use crate::common::retry::RetryPolicy;

use super::backend::{CellUpdate, StoreError, StoreHealth, TabularStore};

// As abas que o portal conhece, com o cabeçalho padrão que é gravado quando a
// aba não existe (ou existe vazia). A ordem das colunas aqui define a ordem
// posicional dos appends.
pub struct TableSpec {
    pub title: &'static str,
    pub default_header: &'static [&'static str],
    pub rows: u32,
    pub cols: u32,
}

pub const USERS: TableSpec = TableSpec {
    title: "Users",
    default_header: &["Username", "DisplayName", "Role", "PasswordHash", "Active", "BranchCode"],
    rows: 100,
    cols: 10,
};

pub const ITEMS: TableSpec = TableSpec {
    title: "Items",
    default_header: &["ItemCode", "ItemName", "Stock", "Unit", "Category", "Active"],
    rows: 1000,
    cols: 10,
};

pub const REQUESTS: TableSpec = TableSpec {
    title: "Requests",
    default_header: &[
        "ReqTime", "ReqID", "Username", "BranchCode", "ItemCode", "ItemName", "Qty", "Status",
        "Note",
    ],
    rows: 1000,
    cols: 15,
};

// Espelho de auditoria, colunas legadas (TxID = ReqID, por compatibilidade).
pub const TRANSACTIONS: TableSpec = TableSpec {
    title: "Transactions",
    default_header: &[
        "TxTime", "TxID", "Username", "BranchCode", "ItemCode", "ItemName", "Qty", "Type", "Note",
    ],
    rows: 1000,
    cols: 15,
};

/// Uma aba já separada em cabeçalho + linhas de dados.
#[derive(Debug, Clone)]
pub struct Table {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// O accessor: dá ao resto do sistema uma visão "tabela" do armazenamento,
// com criação sob demanda, reparo de cabeçalho e o retry centralizado.
// É o equivalente dos repositórios da camada db/, só que sobre a planilha.
#[derive(Clone)]
pub struct SheetAccessor {
    store: Arc<dyn TabularStore>,
    retry: RetryPolicy,
}

impl SheetAccessor {
    pub fn new(store: Arc<dyn TabularStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &Arc<dyn TabularStore> {
        &self.store
    }

    fn storage<'a>(table: &'a str, op: &'static str) -> impl FnOnce(StoreError) -> AppError + 'a {
        move |source| AppError::Storage {
            table: table.to_string(),
            op,
            source,
        }
    }

    async fn read_raw(&self, title: &str) -> Result<Option<Vec<Vec<String>>>, StoreError> {
        self.retry
            .run(StoreError::is_rate_limited, || self.store.read_table(title))
            .await
    }

    /// Lê a aba inteira. Se não existir, cria com o cabeçalho padrão; se
    /// existir vazia, grava o cabeçalho. Ou seja: uma "leitura" pode escrever
    /// — é o bootstrap do esquema, e os testes contam com isso.
    pub async fn get_table(&self, spec: &TableSpec) -> Result<Table, AppError> {
        let op = "get_table";
        let header_row: Vec<String> = spec.default_header.iter().map(|s| s.to_string()).collect();

        let values = match self
            .read_raw(spec.title)
            .await
            .map_err(Self::storage(spec.title, op))?
        {
            Some(values) => values,
            None => {
                tracing::info!("Aba '{}' não existe, criando com cabeçalho padrão", spec.title);
                self.retry
                    .run(StoreError::is_rate_limited, || {
                        self.store.create_table(spec.title, spec.rows, spec.cols)
                    })
                    .await
                    .map_err(Self::storage(spec.title, op))?;
                self.write_header(spec.title, &header_row).await?;
                return Ok(Table {
                    title: spec.title.to_string(),
                    header: header_row,
                    rows: Vec::new(),
                });
            }
        };

        if values.is_empty() {
            self.write_header(spec.title, &header_row).await?;
            return Ok(Table {
                title: spec.title.to_string(),
                header: header_row,
                rows: Vec::new(),
            });
        }

        let mut iter = values.into_iter();
        let header = iter.next().unwrap_or_default();
        Ok(Table {
            title: spec.title.to_string(),
            header,
            rows: iter.collect(),
        })
    }

    /// Leitura sem bootstrap: `None` se a aba não existe. Usada para abas
    /// opcionais (Branches), que nunca devemos criar por engano.
    pub async fn try_get_table(&self, title: &str) -> Result<Option<Table>, AppError> {
        let values = self
            .read_raw(title)
            .await
            .map_err(Self::storage(title, "try_get_table"))?;
        Ok(values.map(|values| {
            let mut iter = values.into_iter();
            let header = iter.next().unwrap_or_default();
            Table {
                title: title.to_string(),
                header,
                rows: iter.collect(),
            }
        }))
    }

    async fn write_header(&self, title: &str, header: &[String]) -> Result<(), AppError> {
        self.retry
            .run(StoreError::is_rate_limited, || {
                self.store
                    .update_range(title, "A1", vec![header.to_vec()])
            })
            .await
            .map_err(Self::storage(title, "write_header"))
    }

    /// Append posicional: os valores devem vir na ordem física das colunas da
    /// aba, não na ordem canônica.
    pub async fn append_rows(&self, title: &str, rows: Vec<Vec<String>>) -> Result<(), AppError> {
        self.retry
            .run(StoreError::is_rate_limited, || {
                self.store.append_rows(title, rows.clone())
            })
            .await
            .map_err(Self::storage(title, "append_rows"))
    }

    /// Garante que todas as colunas pedidas existem no cabeçalho (comparação
    /// caixa-insensível). Colunas faltantes entram no FIM, preservando a
    /// ordem das existentes. Idempotente.
    pub async fn ensure_header_has(
        &self,
        spec: &TableSpec,
        required: &[&str],
    ) -> Result<Vec<String>, AppError> {
        let table = self.get_table(spec).await?;
        let mut header = table.header;
        let mut added = false;
        for req in required {
            let present = header
                .iter()
                .any(|h| h.trim().eq_ignore_ascii_case(req.trim()));
            if !present {
                header.push(req.to_string());
                added = true;
            }
        }
        if added {
            self.write_header(spec.title, &header).await?;
        }
        Ok(header)
    }

    pub async fn batch_update(
        &self,
        title: &str,
        updates: Vec<CellUpdate>,
    ) -> Result<(), AppError> {
        self.retry
            .run(StoreError::is_rate_limited, || {
                self.store.batch_update(title, updates.clone())
            })
            .await
            .map_err(Self::storage(title, "batch_update"))
    }

    pub async fn probe(&self) -> Result<StoreHealth, AppError> {
        self.retry
            .run(StoreError::is_rate_limited, || self.store.probe())
            .await
            .map_err(Self::storage("(planilha)", "probe"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn accessor(store: Arc<MemoryStore>) -> SheetAccessor {
        SheetAccessor::new(store, RetryPolicy::default())
    }

    #[tokio::test]
    async fn get_table_bootstraps_missing_table() {
        let store = Arc::new(MemoryStore::new());
        let acc = accessor(store.clone());

        let table = acc.get_table(&REQUESTS).await.unwrap();
        assert_eq!(table.header, REQUESTS.default_header);
        assert!(table.rows.is_empty());

        // E a escrita de bootstrap de fato aconteceu no store.
        let grid = store.snapshot("Requests").await.unwrap();
        assert_eq!(grid[0][1], "ReqID");
    }

    #[tokio::test]
    async fn get_table_bootstraps_empty_grid() {
        let store = Arc::new(MemoryStore::new());
        store.seed("Users", vec![]).await;
        let acc = accessor(store.clone());

        let table = acc.get_table(&USERS).await.unwrap();
        assert_eq!(table.header, USERS.default_header);
        let grid = store.snapshot("Users").await.unwrap();
        assert_eq!(grid[0][0], "Username");
    }

    #[tokio::test]
    async fn ensure_header_is_idempotent_and_preserves_order() {
        let store = Arc::new(MemoryStore::new());
        store
            .seed("Items", vec![vec!["ItemCode", "ItemName", "Unit"]])
            .await;
        let acc = accessor(store.clone());

        let h1 = acc.ensure_header_has(&ITEMS, &["Stock", "itemname"]).await.unwrap();
        assert_eq!(h1, vec!["ItemCode", "ItemName", "Unit", "Stock"]);

        // Segunda chamada: nada duplica, nada muda de lugar.
        let h2 = acc.ensure_header_has(&ITEMS, &["Stock", "itemname"]).await.unwrap();
        assert_eq!(h2, h1);

        let grid = store.snapshot("Items").await.unwrap();
        assert_eq!(grid[0], vec!["ItemCode", "ItemName", "Unit", "Stock"]);
    }

    #[tokio::test]
    async fn try_get_table_does_not_create() {
        let store = Arc::new(MemoryStore::new());
        let acc = accessor(store.clone());

        assert!(acc.try_get_table("Branches").await.unwrap().is_none());
        assert!(store.snapshot("Branches").await.is_none());
    }
}
