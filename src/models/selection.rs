// src/models/selection.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Uma linha de seleção transitória: quanto o usuário quer de um item e se a
/// linha está marcada. Só contribui para o envio com included=true e qty>0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SelectionLine {
    pub qty: i64,
    pub included: bool,
}

// O conjunto de seleção da sessão. No app antigo isso vivia espalhado em
// dois mapas de session-state (sel_map/qty_map); aqui é um objeto de valor
// explícito, passado por quem chama o workflow.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectionSet {
    lines: BTreeMap<String, SelectionLine>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cria ou substitui a linha de um item. Quantidade negativa satura em 0,
    /// como os botões +/- do formulário faziam.
    pub fn upsert(&mut self, code: &str, qty: i64, included: bool) {
        self.lines.insert(
            code.to_string(),
            SelectionLine {
                qty: qty.max(0),
                included,
            },
        );
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &BTreeMap<String, SelectionLine> {
        &self.lines
    }

    /// As linhas que de fato entram num envio: marcadas e com quantidade > 0.
    pub fn chosen(&self) -> Vec<(String, i64)> {
        self.lines
            .iter()
            .filter(|(_, line)| line.included && line.qty > 0)
            .map(|(code, line)| (code.clone(), line.qty))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chosen_filters_unchecked_and_zero_qty() {
        let mut sel = SelectionSet::new();
        sel.upsert("A100", 3, true);
        sel.upsert("B200", 0, true);
        sel.upsert("C300", 5, false);
        sel.upsert("D400", 1, true);

        let chosen = sel.chosen();
        assert_eq!(chosen, vec![("A100".to_string(), 3), ("D400".to_string(), 1)]);
    }

    #[test]
    fn negative_qty_saturates_at_zero() {
        let mut sel = SelectionSet::new();
        sel.upsert("A100", -2, true);
        assert!(sel.chosen().is_empty());
        assert_eq!(sel.lines().get("A100").unwrap().qty, 0);
    }

    #[test]
    fn clear_empties_everything() {
        let mut sel = SelectionSet::new();
        sel.upsert("A100", 3, true);
        sel.clear();
        assert!(sel.is_empty());
    }
}
