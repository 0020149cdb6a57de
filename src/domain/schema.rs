use crate::domain::model::{Category, CATEGORY_COLUMN, CLASSIFICATION_COLUMN, YEAR_COLUMN};
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

pub const QUANTITY_COLUMN: &str = "Quantidade";
pub const TOTAL_SENTINEL: &str = "TOTAL";

/// 五種統計資料集
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum DatasetKind {
    Production,
    Processing,
    Commercialization,
    Import,
    Export,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 5] = [
        DatasetKind::Production,
        DatasetKind::Processing,
        DatasetKind::Commercialization,
        DatasetKind::Import,
        DatasetKind::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Production => "production",
            DatasetKind::Processing => "processing",
            DatasetKind::Commercialization => "commercialization",
            DatasetKind::Import => "import",
            DatasetKind::Export => "export",
        }
    }

    /// Value of the portal's `opcao` query parameter.
    pub fn page_option(&self) -> &'static str {
        match self {
            DatasetKind::Production => "opt_02",
            DatasetKind::Processing => "opt_03",
            DatasetKind::Commercialization => "opt_04",
            DatasetKind::Import => "opt_05",
            DatasetKind::Export => "opt_06",
        }
    }

    pub fn default_years(&self) -> RangeInclusive<i32> {
        match self {
            DatasetKind::Production => 2020..=2022,
            _ => 2020..=2023,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        DatasetKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EtlError::InvalidConfigValueError {
                field: "kind".to_string(),
                value: s.to_string(),
                reason: "Expected one of production, processing, commercialization, import, export"
                    .to_string(),
            })
    }
}

/// Element tag plus the classes it must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMarker {
    pub tag: String,
    pub classes: Vec<String>,
}

impl TableMarker {
    pub fn css(&self) -> String {
        let mut css = self.tag.clone();
        for class in &self.classes {
            css.push('.');
            css.push_str(class);
        }
        css
    }
}

impl Default for TableMarker {
    fn default() -> Self {
        Self {
            tag: "table".to_string(),
            classes: vec!["tb_base".to_string(), "tb_dados".to_string()],
        }
    }
}

/// Class hints carried by the first cell of a row, and the footer section
/// holding the totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyMarkers {
    pub category_class: String,
    pub sub_item_class: String,
    pub footer: String,
}

impl Default for HierarchyMarkers {
    fn default() -> Self {
        Self {
            category_class: "tb_item".to_string(),
            sub_item_class: "tb_subitem".to_string(),
            footer: "tfoot.tb_total".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRename {
    pub from: String,
    pub to: String,
}

/// `target` 欄位不存在時由 `copy_from` 複製；
/// `fill_from` 存在時補齊缺值後整欄移除
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedColumn {
    pub target: String,
    pub copy_from: String,
    pub fill_from: Option<String>,
}

fn default_thousands_separator() -> char {
    '.'
}

/// Per-kind configuration for the extraction and transformation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub kind: DatasetKind,
    pub page_option: String,
    #[serde(default)]
    pub table: TableMarker,
    #[serde(default)]
    pub markers: HierarchyMarkers,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub renames: Vec<ColumnRename>,
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: char,
    #[serde(default)]
    pub derived: Vec<DerivedColumn>,
    pub output_columns: Vec<String>,
    pub total_columns: Vec<String>,
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn rename(from: &str) -> ColumnRename {
    ColumnRename {
        from: from.to_string(),
        to: QUANTITY_COLUMN.to_string(),
    }
}

impl Schema {
    fn base(kind: DatasetKind) -> Self {
        Self {
            kind,
            page_option: kind.page_option().to_string(),
            table: TableMarker::default(),
            markers: HierarchyMarkers::default(),
            categories: Vec::new(),
            renames: Vec::new(),
            numeric_columns: names(&[QUANTITY_COLUMN]),
            thousands_separator: default_thousands_separator(),
            derived: Vec::new(),
            output_columns: Vec::new(),
            total_columns: Vec::new(),
        }
    }

    pub fn for_kind(kind: DatasetKind) -> Self {
        let mut schema = Self::base(kind);
        match kind {
            DatasetKind::Production | DatasetKind::Commercialization => {
                schema.renames = vec![rename("Quantidade (L.)")];
                schema.output_columns =
                    names(&["Produto", CLASSIFICATION_COLUMN, YEAR_COLUMN, QUANTITY_COLUMN]);
                schema.total_columns = names(&["Produto", CLASSIFICATION_COLUMN]);
            }
            DatasetKind::Processing => {
                schema.categories = vec![
                    Category::new("VINIFERAS", "subopt_01"),
                    Category::new("AMERICANAS E HIBRIDAS", "subopt_02"),
                    Category::new("UVAS DE MESA", "subopt_03"),
                    Category::new("SEM CLASSIFICACAO", "subopt_04"),
                ];
                schema.renames = vec![rename("Quantidade (Kg)")];
                schema.derived = vec![DerivedColumn {
                    target: "Cultivar".to_string(),
                    copy_from: CLASSIFICATION_COLUMN.to_string(),
                    fill_from: Some("Sem definição".to_string()),
                }];
                schema.output_columns = names(&[
                    "Cultivar",
                    CLASSIFICATION_COLUMN,
                    YEAR_COLUMN,
                    QUANTITY_COLUMN,
                    CATEGORY_COLUMN,
                ]);
                schema.total_columns = names(&["Cultivar", CLASSIFICATION_COLUMN]);
            }
            DatasetKind::Import | DatasetKind::Export => {
                schema.categories = if kind == DatasetKind::Import {
                    vec![
                        Category::new("VINHOS DE MESA", "subopt_01"),
                        Category::new("ESPUMANTES", "subopt_02"),
                        Category::new("UVAS FRESCAS", "subopt_03"),
                        Category::new("UVAS PASSAS", "subopt_04"),
                        Category::new("SUCO DE UVA", "subopt_05"),
                    ]
                } else {
                    vec![
                        Category::new("VINHOS DE MESA", "subopt_01"),
                        Category::new("ESPUMANTES", "subopt_02"),
                        Category::new("UVAS FRESCAS", "subopt_03"),
                        Category::new("SUCO DE UVA", "subopt_04"),
                    ]
                };
                schema.renames = vec![rename("Quantidade (Kg)")];
                schema.numeric_columns = names(&[QUANTITY_COLUMN, "Valor (US$)"]);
                schema.output_columns = names(&[
                    "Países",
                    YEAR_COLUMN,
                    QUANTITY_COLUMN,
                    "Valor (US$)",
                    CATEGORY_COLUMN,
                ]);
                schema.total_columns = names(&["Países"]);
            }
        }
        schema
    }

    /// Restrict the run to a single category, matched by label or by
    /// query-parameter value.
    pub fn with_category(mut self, selector: &str) -> Result<Self> {
        let wanted = selector.trim();
        let found = self
            .categories
            .iter()
            .find(|c| c.label.eq_ignore_ascii_case(wanted) || c.value == wanted)
            .cloned();
        match found {
            Some(category) => {
                self.categories = vec![category];
                Ok(self)
            }
            None => Err(EtlError::InvalidConfigValueError {
                field: "category".to_string(),
                value: selector.to_string(),
                reason: format!("Dataset kind '{}' has no such category", self.kind),
            }),
        }
    }
}
