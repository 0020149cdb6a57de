use crate::config::{validate_provider, DEFAULT_BASE_URL};
use crate::core::ConfigProvider;
use crate::domain::schema::{DatasetKind, Schema};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub source: SourceConfig,
    pub scrape: ScrapeConfig,
    pub load: LoadConfig,
    /// 覆寫內建的資料集 schema
    pub schema: Option<Schema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: None,
            retry_attempts: None,
            retry_delay_ms: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub kind: DatasetKind,
    /// Explicit list of years; wins over `from_year` / `to_year`.
    pub years: Option<Vec<i32>>,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    pub category: Option<String>,
    pub concurrent_requests: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OUTPUT_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(schema) = &self.schema {
            if schema.kind != self.scrape.kind {
                return Err(EtlError::InvalidConfigValueError {
                    field: "schema.kind".to_string(),
                    value: schema.kind.to_string(),
                    reason: format!("Does not match scrape.kind '{}'", self.scrape.kind),
                });
            }
            validation::validate_non_empty_string("schema.page_option", &schema.page_option)?;
        }
        if let (Some(from), Some(to)) = (self.scrape.from_year, self.scrape.to_year) {
            validation::validate_year_range("scrape.from_year..to_year", from, to)?;
        }
        validate_provider(self)
    }
}

impl ConfigProvider for TomlConfig {
    fn base_url(&self) -> &str {
        &self.source.base_url
    }

    fn kind(&self) -> DatasetKind {
        self.scrape.kind
    }

    fn years(&self) -> Vec<i32> {
        if let Some(years) = &self.scrape.years {
            return years.clone();
        }
        let defaults = self.scrape.kind.default_years();
        let from = self.scrape.from_year.unwrap_or(*defaults.start());
        let to = self.scrape.to_year.unwrap_or(*defaults.end());
        (from..=to).collect()
    }

    fn category(&self) -> Option<&str> {
        self.scrape.category.as_deref()
    }

    fn schema_override(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn concurrent_requests(&self) -> usize {
        self.scrape.concurrent_requests.unwrap_or(1)
    }

    fn retry_attempts(&self) -> u32 {
        self.source.retry_attempts.unwrap_or(3)
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.source.retry_delay_ms.unwrap_or(1000))
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds.unwrap_or(30))
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
