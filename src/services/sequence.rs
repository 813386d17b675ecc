// src/services/sequence.rs

use chrono::NaiveDate;

// Gerador do número de pedido: <USERNAME><YYMMDD>-<NN>, NN de 01 a 99 por
// usuário por dia. É uma varredura linear sobre os IDs históricos — sem
// índice incremental e sem reserva: duas submissões simultâneas do mesmo
// usuário podem calcular o mesmo NN. Comportamento herdado e mantido.

pub fn order_prefix(username: &str, date: NaiveDate) -> String {
    format!(
        "{}{}-",
        username.trim().to_uppercase(),
        date.format("%y%m%d")
    )
}

/// O próximo ID para o prefixo do usuário+data. Linhas cujos dois caracteres
/// após o prefixo não são dígitos ASCII são ignoradas. Quando 99 já está em
/// uso, continua devolvendo ...-99: é o teto de capacidade do esquema, não
/// um erro.
pub fn next_order_id<'a, I>(existing: I, username: &str, date: NaiveDate) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = order_prefix(username, date);
    let mut max_run: u32 = 0;
    for id in existing {
        if let Some(suffix) = id.strip_prefix(prefix.as_str()) {
            let b = suffix.as_bytes();
            if b.len() >= 2 && b[0].is_ascii_digit() && b[1].is_ascii_digit() {
                let run = u32::from(b[0] - b'0') * 10 + u32::from(b[1] - b'0');
                max_run = max_run.max(run);
            }
        }
    }
    let next_run = (max_run + 1).min(99);
    format!("{prefix}{next_run:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn prefix_format() {
        assert_eq!(order_prefix("jdoe", day()), "JDOE240601-");
        assert_eq!(order_prefix("  Ana ", day()), "ANA240601-");
    }

    #[test]
    fn first_id_of_the_day_is_01() {
        assert_eq!(
            next_order_id(std::iter::empty::<&str>(), "jdoe", day()),
            "JDOE240601-01"
        );
    }

    #[test]
    fn sequence_is_monotonic_and_clamps_at_99() {
        let mut ids: Vec<String> = Vec::new();
        for call in 1..=150 {
            let next = next_order_id(ids.iter().map(String::as_str), "jdoe", day());
            let expected_run = call.min(99);
            assert_eq!(next, format!("JDOE240601-{expected_run:02}"));
            ids.push(next);
        }
        // Depois do teto, fica em 99 para sempre.
        assert_eq!(
            next_order_id(ids.iter().map(String::as_str), "jdoe", day()),
            "JDOE240601-99"
        );
    }

    #[test]
    fn prefixes_are_isolated_by_user_and_date() {
        let ids = ["JDOE240601-07".to_string(), "MARA240601-03".to_string()];
        let it = || ids.iter().map(String::as_str);

        // Outro usuário, mesmo dia: começa do 01 dele.
        assert_eq!(next_order_id(it(), "mara", day()), "MARA240601-04");
        // Mesmo usuário, outro dia: prefixo novo, começa do 01.
        let other_day = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert_eq!(next_order_id(it(), "jdoe", other_day), "JDOE240602-01");
    }

    #[test]
    fn gap_filling_is_not_attempted() {
        // O esquema usa max+1, não o menor buraco: 01 e 05 existindo, vem 06.
        let ids = ["JDOE240601-01".to_string(), "JDOE240601-05".to_string()];
        assert_eq!(
            next_order_id(ids.iter().map(String::as_str), "jdoe", day()),
            "JDOE240601-06"
        );
    }

    #[test]
    fn malformed_suffixes_are_ignored() {
        let ids = [
            "JDOE240601-XX".to_string(),
            "JDOE240601-9".to_string(),
            "JDOE240601-02".to_string(),
        ];
        assert_eq!(
            next_order_id(ids.iter().map(String::as_str), "jdoe", day()),
            "JDOE240601-03"
        );
    }
}
