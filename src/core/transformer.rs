use crate::domain::model::{Dataset, Record};
use crate::domain::schema::{Schema, TOTAL_SENTINEL};
use crate::utils::error::{EtlError, Result};
use serde_json::Value;

/// Strips the thousands separator and parses an integer. Anything that does
/// not parse (empty, `n/d`, missing) becomes zero.
pub fn coerce_integer(value: Option<&Value>, thousands_separator: char) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(text)) => text
            .replace(thousands_separator, "")
            .trim()
            .parse::<i64>()
            .unwrap_or(0),
        _ => 0,
    }
}

/// Turns a normalized dataset into the canonical shape of one dataset kind.
pub struct DomainTransformer<'a> {
    schema: &'a Schema,
}

impl<'a> DomainTransformer<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    pub fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        let (mut columns, mut records) = dataset.clone().into_parts();

        self.derive_columns(&mut columns, &mut records);
        self.rename_columns(&mut columns, &mut records);
        self.coerce_numeric(&columns, &mut records);
        let (columns, records) = self.select_columns(&columns, records)?;
        let records = self.drop_totals(records);

        Ok(Dataset::from_parts(columns, records))
    }

    fn derive_columns(&self, columns: &mut Vec<String>, records: &mut [Record]) {
        for rule in &self.schema.derived {
            if !contains(columns, &rule.target) && contains(columns, &rule.copy_from) {
                for record in records.iter_mut() {
                    if let Some(value) = record.data.get(&rule.copy_from).cloned() {
                        record.data.insert(rule.target.clone(), value);
                    }
                }
                columns.push(rule.target.clone());
            }

            let Some(fill_from) = &rule.fill_from else {
                continue;
            };
            if !contains(columns, fill_from) {
                continue;
            }
            let target_exists = contains(columns, &rule.target);
            for record in records.iter_mut() {
                let fill = record.data.remove(fill_from);
                let missing = matches!(record.data.get(&rule.target), None | Some(Value::Null));
                if target_exists && missing {
                    if let Some(value) = fill {
                        record.data.insert(rule.target.clone(), value);
                    }
                }
            }
            columns.retain(|c| c != fill_from);
        }
    }

    fn rename_columns(&self, columns: &mut Vec<String>, records: &mut [Record]) {
        for rename in &self.schema.renames {
            if !contains(columns, &rename.from) {
                continue;
            }
            for record in records.iter_mut() {
                if let Some(value) = record.data.remove(&rename.from) {
                    record.data.insert(rename.to.clone(), value);
                }
            }
            if contains(columns, &rename.to) {
                columns.retain(|c| c != &rename.from);
            } else if let Some(slot) = columns.iter_mut().find(|c| **c == rename.from) {
                *slot = rename.to.clone();
            }
        }
    }

    fn coerce_numeric(&self, columns: &[String], records: &mut [Record]) {
        let separator = self.schema.thousands_separator;
        for column in &self.schema.numeric_columns {
            if !contains(columns, column) {
                continue;
            }
            for record in records.iter_mut() {
                let number = coerce_integer(record.data.get(column), separator);
                record.data.insert(column.clone(), Value::from(number));
            }
        }
    }

    fn select_columns(&self, columns: &[String], records: Vec<Record>) -> Result<(Vec<String>, Vec<Record>)> {
        let output = &self.schema.output_columns;
        if !records.is_empty() {
            if let Some(missing) = output.iter().find(|c| !contains(columns, c)) {
                return Err(EtlError::MissingColumn {
                    column: missing.clone(),
                });
            }
        }

        let records = records
            .into_iter()
            .map(|mut record| Record {
                data: output
                    .iter()
                    .map(|column| {
                        let value = record
                            .data
                            .remove(column)
                            .unwrap_or_else(|| Value::String(String::new()));
                        (column.clone(), value)
                    })
                    .collect(),
            })
            .collect();
        Ok((output.clone(), records))
    }

    /// 所有識別欄位皆為 `TOTAL` 才視為總計列
    fn drop_totals(&self, records: Vec<Record>) -> Vec<Record> {
        let total_columns = &self.schema.total_columns;
        if total_columns.is_empty() {
            return records;
        }
        let before = records.len();
        let kept: Vec<Record> = records
            .into_iter()
            .filter(|record| {
                !total_columns
                    .iter()
                    .all(|column| record.get_str(column) == Some(TOTAL_SENTINEL))
            })
            .collect();
        tracing::debug!("Dropped {} total rows", before - kept.len());
        kept
    }
}

fn contains(columns: &[String], column: &str) -> bool {
    columns.iter().any(|c| c == column)
}
