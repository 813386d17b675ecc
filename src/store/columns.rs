// src/store/columns.rs

use std::collections::HashMap;

// Tabela estática de sinônimos: campo canônico -> cabeçalhos aceitos, nas
// grafias que as planilhas históricas realmente usam (inglês e tailandês,
// caixa livre). A ordem de declaração importa: em caso de ambiguidade, o
// primeiro canônico que casar fica com a coluna.
pub const CANONICAL_COLS: &[(&str, &[&str])] = &[
    ("username", &["username", "user", "บัญชีผู้ใช้", "ชื่อผู้ใช้", "ชื่อเข้าใช้"]),
    ("branchcode", &["branchcode", "branch", "สาขา", "รหัสสาขา", "branch_code"]),
    ("password", &["password", "รหัสผ่าน"]),
    ("passwordhash", &["passwordhash", "hash", "bcrypt", "passhash"]),
    ("displayname", &["displayname", "ชื่อ", "ชื่อแสดง"]),
    ("active", &["active", "enabled", "สถานะ", "isactive"]),
    ("role", &["role", "ตำแหน่ง", "สิทธิ์"]),
    ("itemcode", &["itemcode", "code", "รหัส", "รหัสสินค้า", "รหัสอุปกรณ์"]),
    ("itemname", &["itemname", "name", "สินค้า", "ชื่อสินค้า", "ชื่ออุปกรณ์", "รายการ"]),
    ("stock", &["stock", "คงเหลือ", "จำนวนคงคลัง"]),
    ("unit", &["unit", "หน่วย", "หน่วยนับ"]),
    ("category", &["category", "หมวดหมู่", "ประเภท"]),
    ("qty", &["qty", "quantity", "จำนวน"]),
    ("reqid", &["reqid", "txid", "orderid", "เลขที่ออเดอร์"]),
    ("reqtime", &["reqtime", "txtime", "เวลา"]),
    ("status", &["status"]),
    ("note", &["note", "หมายเหตุ"]),
];

/// Casamento exato (caixa-insensível) ou, em modo relaxado, uma segunda
/// passada onde o sinônimo contido no cabeçalho normalizado também conta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Relaxed,
}

fn normalize(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Para cada cabeçalho de entrada que casa com um sinônimo conhecido, devolve
/// o nome canônico para o qual renomeá-lo. Cabeçalho sem match fica de fora
/// (passa intocado). Cada canônico reivindica no máximo uma coluna.
pub fn resolve(headers: &[String], mode: MatchMode) -> HashMap<String, String> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize(h)).collect();
    let mut claimed = vec![false; headers.len()];
    let mut mapping = HashMap::new();

    // Passada 1: match exato, na ordem de declaração.
    for (canon, alts) in CANONICAL_COLS {
        'outer: for alt in alts.iter().chain(std::iter::once(canon)) {
            for (i, norm) in normalized.iter().enumerate() {
                if !claimed[i] && norm == alt {
                    claimed[i] = true;
                    mapping.insert(headers[i].clone(), canon.to_string());
                    break 'outer;
                }
            }
        }
    }

    // Passada 2 (opcional): sinônimo como substring do cabeçalho. Confiança
    // menor, então só roda para canônicos que ficaram sem coluna.
    if mode == MatchMode::Relaxed {
        for (canon, alts) in CANONICAL_COLS {
            if mapping.values().any(|c| c == canon) {
                continue;
            }
            'outer: for alt in alts.iter().chain(std::iter::once(canon)) {
                for (i, norm) in normalized.iter().enumerate() {
                    if !claimed[i] && norm.contains(alt) {
                        claimed[i] = true;
                        mapping.insert(headers[i].clone(), canon.to_string());
                        break 'outer;
                    }
                }
            }
        }
    }

    mapping
}

/// Índice físico (0-based) da coluna que resolve para `canonical`.
pub fn canonical_index(headers: &[String], canonical: &str, mode: MatchMode) -> Option<usize> {
    let mapping = resolve(headers, mode);
    headers
        .iter()
        .position(|h| mapping.get(h).map(String::as_str) == Some(canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn headers(hs: &[&str]) -> Vec<String> {
        hs.iter().map(|h| h.to_string()).collect()
    }

    #[rstest]
    #[case("Username", "username")]
    #[case("USER", "username")]
    #[case("ชื่อผู้ใช้", "username")]
    #[case("PasswordHash", "passwordhash")]
    #[case("รหัสผ่าน", "password")]
    #[case("คงเหลือ", "stock")]
    fn exact_synonyms(#[case] header: &str, #[case] canonical: &str) {
        let hs = headers(&[header]);
        let mapping = resolve(&hs, MatchMode::Exact);
        assert_eq!(mapping.get(header).map(String::as_str), Some(canonical));
    }

    #[test]
    fn unmatched_headers_pass_through() {
        let hs = headers(&["Username", "ColunaEsquisita"]);
        let mapping = resolve(&hs, MatchMode::Exact);
        assert!(!mapping.contains_key("ColunaEsquisita"));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn first_match_wins_on_ambiguity() {
        // "Name" é sinônimo de itemname; displayname não o reivindica mais.
        let hs = headers(&["Name", "ItemCode"]);
        let mapping = resolve(&hs, MatchMode::Exact);
        assert_eq!(mapping.get("Name").map(String::as_str), Some("itemname"));
    }

    #[test]
    fn each_canonical_claims_one_column() {
        // Dois cabeçalhos que resolvem para itemcode: só o primeiro é usado.
        let hs = headers(&["ItemCode", "Code"]);
        let mapping = resolve(&hs, MatchMode::Exact);
        assert_eq!(mapping.get("ItemCode").map(String::as_str), Some("itemcode"));
        // "Code" sobra sem dono de itemcode; nenhum outro canônico exato o pega.
        assert!(!mapping.contains_key("Code"));
    }

    #[test]
    fn relaxed_mode_matches_substring() {
        let hs = headers(&["Item Code (SKU)"]);
        assert!(resolve(&hs, MatchMode::Exact).is_empty());
        let mapping = resolve(&hs, MatchMode::Relaxed);
        assert_eq!(
            mapping.get("Item Code (SKU)").map(String::as_str),
            Some("itemcode")
        );
    }

    #[test]
    fn canonical_index_points_to_physical_column() {
        let hs = headers(&["TxTime", "TxID", "Username", "Qty"]);
        assert_eq!(canonical_index(&hs, "reqid", MatchMode::Exact), Some(1));
        assert_eq!(canonical_index(&hs, "qty", MatchMode::Exact), Some(3));
        assert_eq!(canonical_index(&hs, "stock", MatchMode::Exact), None);
    }
}
