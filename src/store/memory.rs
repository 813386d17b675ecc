// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::backend::{CellUpdate, StoreError, StoreHealth, TabularStore};

// Backend em memória: o mesmo contrato do Sheets, mas sobre um HashMap de
// grades. É o que os testes usam e também serve como modo de desenvolvimento
// (STORE_BACKEND=memory), sem credenciais.
#[derive(Default)]
pub struct MemoryStore {
    grids: RwLock<HashMap<String, Vec<Vec<String>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Semeia uma aba inteira de uma vez (cabeçalho incluso). Útil nos testes.
    pub async fn seed(&self, title: &str, rows: Vec<Vec<&str>>) {
        let grid = rows
            .into_iter()
            .map(|r| r.into_iter().map(|c| c.to_string()).collect())
            .collect();
        self.grids.write().await.insert(title.to_string(), grid);
    }

    /// Cópia crua da grade, para inspeção nos testes.
    pub async fn snapshot(&self, title: &str) -> Option<Vec<Vec<String>>> {
        self.grids.read().await.get(title).cloned()
    }
}

// "A1" -> (linha 0-based, coluna 0-based). Só precisamos da célula inicial:
// o bloco de valores define o tamanho da escrita.
fn parse_a1_start(range: &str) -> Result<(usize, usize), StoreError> {
    let cell = range.split(':').next().unwrap_or(range);
    let mut col: usize = 0;
    let mut digits = String::new();
    for ch in cell.chars() {
        if ch.is_ascii_alphabetic() {
            col = col * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1);
        } else if ch.is_ascii_digit() {
            digits.push(ch);
        } else {
            return Err(StoreError::BadResponse(format!("range A1 inválido: {range}")));
        }
    }
    let row: usize = digits
        .parse()
        .map_err(|_| StoreError::BadResponse(format!("range A1 inválido: {range}")))?;
    if col == 0 || row == 0 {
        return Err(StoreError::BadResponse(format!("range A1 inválido: {range}")));
    }
    Ok((row - 1, col - 1))
}

fn write_block(grid: &mut Vec<Vec<String>>, start_row: usize, start_col: usize, values: &[Vec<String>]) {
    for (i, row_vals) in values.iter().enumerate() {
        let r = start_row + i;
        while grid.len() <= r {
            grid.push(Vec::new());
        }
        let row = &mut grid[r];
        for (j, val) in row_vals.iter().enumerate() {
            let c = start_col + j;
            while row.len() <= c {
                row.push(String::new());
            }
            row[c] = val.clone();
        }
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn read_table(&self, title: &str) -> Result<Option<Vec<Vec<String>>>, StoreError> {
        Ok(self.grids.read().await.get(title).cloned())
    }

    async fn create_table(&self, title: &str, _rows: u32, _cols: u32) -> Result<(), StoreError> {
        self.grids
            .write()
            .await
            .entry(title.to_string())
            .or_default();
        Ok(())
    }

    async fn update_range(
        &self,
        title: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<(), StoreError> {
        let (row, col) = parse_a1_start(range)?;
        let mut grids = self.grids.write().await;
        let grid = grids.entry(title.to_string()).or_default();
        write_block(grid, row, col, &values);
        Ok(())
    }

    async fn append_rows(&self, title: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError> {
        let mut grids = self.grids.write().await;
        let grid = grids
            .get_mut(title)
            .ok_or_else(|| StoreError::BadResponse(format!("aba '{title}' não existe")))?;
        grid.extend(rows);
        Ok(())
    }

    async fn batch_update(&self, title: &str, updates: Vec<CellUpdate>) -> Result<(), StoreError> {
        let mut grids = self.grids.write().await;
        let grid = grids
            .get_mut(title)
            .ok_or_else(|| StoreError::BadResponse(format!("aba '{title}' não existe")))?;
        for update in updates {
            let (row, col) = parse_a1_start(&update.range)?;
            write_block(grid, row, col, &update.values);
        }
        Ok(())
    }

    async fn probe(&self) -> Result<StoreHealth, StoreError> {
        let grids = self.grids.read().await;
        let mut tables: Vec<String> = grids.keys().cloned().collect();
        tables.sort();
        Ok(StoreHealth {
            title: "memória (dev)".to_string(),
            tables,
        })
    }
}
