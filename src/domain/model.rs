use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// 萃取時附加的分類欄位
pub const CLASSIFICATION_COLUMN: &str = "Classificação";
/// 附加的按鈕 (category) 標籤欄位
pub const CATEGORY_COLUMN: &str = "Botao";
/// 合併時標記的年份欄位
pub const YEAR_COLUMN: &str = "Ano";
/// 頁尾 (tfoot) 列的分類值
pub const TOTAL_LABEL: &str = "Total";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, Value>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.data.get(column).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.data.get(column).and_then(|v| v.as_i64())
    }
}

/// Row kind inferred from the row's markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Category,
    SubItem,
    Total,
    Plain,
}

/// One `<tr>` as read from the page, before the hierarchy is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub kind: RowKind,
    pub cells: Vec<String>,
}

/// A row with its derived columns (classification and, optionally, category)
/// appended. Cells line up with the column list of the extraction that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub kind: RowKind,
    pub cells: Vec<String>,
}

impl ExtractedRecord {
    /// Value of the appended classification column.
    pub fn classification(&self, columns: &[String]) -> Option<&str> {
        columns
            .iter()
            .position(|c| c == CLASSIFICATION_COLUMN)
            .and_then(|i| self.cells.get(i))
            .map(String::as_str)
    }
}

/// 頁面上的分類按鈕，例如 `subopcao=subopt_01` (VINHOS DE MESA)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    #[serde(default = "default_category_param")]
    pub param: String,
    pub value: String,
}

fn default_category_param() -> String {
    "subopcao".to_string()
}

impl Category {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            param: default_category_param(),
            value: value.to_string(),
        }
    }
}

/// One (year, category) fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTarget {
    pub year: i32,
    pub category: Option<Category>,
}

impl ScrapeTarget {
    pub fn new(year: i32, category: Option<Category>) -> Self {
        Self { year, category }
    }

    pub fn query_params(&self, option: &str) -> Vec<(String, String)> {
        let mut params = vec![
            ("opcao".to_string(), option.to_string()),
            ("ano".to_string(), self.year.to_string()),
        ];
        if let Some(category) = &self.category {
            params.push((category.param.clone(), category.value.clone()));
        }
        params
    }

    pub fn category_label(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.label.as_str())
    }
}

impl fmt::Display for ScrapeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.category {
            Some(category) => write!(f, "year {} / {}", self.year, category.label),
            None => write!(f, "year {}", self.year),
        }
    }
}

/// Ordered records sharing a column list. Columns keep the order in which
/// they were first seen, so datasets merged from tables with different
/// headers still have a stable column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Record>) {
        (self.columns, self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn append(&mut self, columns: &[String], record: Record) {
        for column in columns {
            if !self.has_column(column) {
                self.columns.push(column.clone());
            }
        }
        self.records.push(record);
    }

    /// Records as JSON objects with the year serialized as text. Keys follow
    /// `columns()` order.
    pub fn to_json_records(&self) -> Vec<serde_json::Map<String, Value>> {
        self.records
            .iter()
            .map(|record| {
                self.columns
                    .iter()
                    .filter_map(|column| {
                        let value = record.get(column)?;
                        let value = match (column.as_str(), value) {
                            (YEAR_COLUMN, Value::Number(n)) => Value::String(n.to_string()),
                            _ => value.clone(),
                        };
                        Some((column.clone(), value))
                    })
                    .collect()
            })
            .collect()
    }
}
