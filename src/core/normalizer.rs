use crate::domain::model::{Dataset, Record};
use deunicode::deunicode;
use serde_json::Value;

/// Sentinels the portal uses for "no data".
const ZERO_SENTINELS: [&str; 2] = ["-", "*"];

/// `-` / `*` 轉為 `"0"`，其餘去除重音並轉大寫
pub fn normalize_text(text: &str) -> String {
    if ZERO_SENTINELS.contains(&text.trim()) {
        "0".to_string()
    } else {
        deunicode(text).to_uppercase()
    }
}

pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(normalize_text(text)),
        other => other.clone(),
    }
}

/// Applies [`normalize_text`] to every text field of a dataset. Must run
/// before numeric coercion so the sentinels become parseable.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldNormalizer;

impl FieldNormalizer {
    pub fn apply(&self, dataset: &Dataset) -> Dataset {
        let records = dataset
            .records()
            .iter()
            .map(|record| Record {
                data: record
                    .data
                    .iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            })
            .collect();
        Dataset::from_parts(dataset.columns().to_vec(), records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sentinels_become_zero() {
        assert_eq!(normalize_text("-"), "0");
        assert_eq!(normalize_text(" * "), "0");
        assert_eq!(normalize_text("--"), "--");
    }

    #[test]
    fn test_accents_are_folded_and_uppercased() {
        assert_eq!(normalize_text("café"), "CAFE");
        assert_eq!(normalize_text("Americanas e híbridas"), "AMERICANAS E HIBRIDAS");
        assert_eq!(normalize_text("Países Baixos"), "PAISES BAIXOS");
    }

    #[test]
    fn test_non_text_values_pass_through() {
        assert_eq!(normalize_value(&json!(2022)), json!(2022));
        assert_eq!(normalize_value(&Value::Null), Value::Null);
    }

    #[test]
    fn test_apply_returns_new_dataset() {
        let mut record = Record::default();
        record.data.insert("Produto".to_string(), json!("Vinho fino de mesa (viníferas)"));
        record.data.insert("Quantidade (L.)".to_string(), json!("*"));
        record.data.insert("Ano".to_string(), json!(2021));
        let columns = vec!["Produto".to_string(), "Quantidade (L.)".to_string(), "Ano".to_string()];
        let original = Dataset::from_parts(columns.clone(), vec![record]);

        let normalized = FieldNormalizer.apply(&original);

        let row = &normalized.records()[0];
        assert_eq!(row.get_str("Produto"), Some("VINHO FINO DE MESA (VINIFERAS)"));
        assert_eq!(row.get_str("Quantidade (L.)"), Some("0"));
        assert_eq!(row.get_i64("Ano"), Some(2021));
        assert_eq!(normalized.columns(), &columns[..]);
        assert_eq!(original.records()[0].get_str("Quantidade (L.)"), Some("*"));
    }
}
