pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::schema::DatasetKind;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://vitibrasil.cnpuv.embrapa.br/index.php";

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "vitibrasil-etl")]
#[command(about = "Scrapes the Vitibrasil grape and wine statistics into CSV / JSON")]
pub struct CliConfig {
    /// Dataset to scrape
    #[arg(long, value_enum, default_value = "production")]
    pub kind: DatasetKind,

    /// First year (defaults to the dataset's usual range)
    #[arg(long)]
    pub from_year: Option<i32>,

    /// Last year, inclusive
    #[arg(long)]
    pub to_year: Option<i32>,

    /// Only scrape one category, by label or subopcao value
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_delimiter = ',', default_value = "csv,json")]
    pub output_formats: Vec<String>,

    #[arg(long, default_value = "1")]
    pub concurrent_requests: usize,

    #[arg(long, default_value = "3")]
    pub retry_attempts: u32,

    #[arg(long, default_value = "1000")]
    pub retry_delay_ms: u64,

    #[arg(long, default_value = "30")]
    pub timeout_seconds: u64,

    /// Load settings from a TOML file instead of the flags above
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, help = "Emit JSON logs")]
    pub json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn kind(&self) -> DatasetKind {
        self.kind
    }

    fn years(&self) -> Vec<i32> {
        let defaults = self.kind.default_years();
        let from = self.from_year.unwrap_or(*defaults.start());
        let to = self.to_year.unwrap_or(*defaults.end());
        (from..=to).collect()
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.output_formats
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }

    fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Checks shared by every [`ConfigProvider`].
pub fn validate_provider<C: ConfigProvider>(config: &C) -> Result<()> {
    validation::validate_url("base_url", config.base_url())?;
    validation::validate_path("output_path", config.output_path())?;
    validation::validate_output_formats("output_formats", config.output_formats())?;
    validation::validate_positive_number("concurrent_requests", config.concurrent_requests(), 1)?;
    validation::validate_range("timeout_seconds", config.timeout().as_secs(), 1, 600)?;

    let years = config.years();
    match (years.first(), years.last()) {
        (Some(&from), Some(&to)) => validation::validate_year_range("years", from, to)?,
        _ => {
            return Err(crate::utils::error::EtlError::MissingConfigError {
                field: "years".to_string(),
            })
        }
    }

    if let Some(category) = config.category() {
        validation::validate_non_empty_string("category", category)?;
    }
    Ok(())
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.from_year, self.to_year) {
            validation::validate_year_range("from_year..to_year", from, to)?;
        }
        validate_provider(self)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_dataset_kind() {
        let config = CliConfig::parse_from(["vitibrasil-etl", "--kind", "production"]);
        assert_eq!(config.years(), vec![2020, 2021, 2022]);
        assert_eq!(config.output_formats, vec!["csv", "json"]);
        assert_eq!(config.concurrent_requests(), 1);
        assert!(config.validate().is_ok());

        let config = CliConfig::parse_from(["vitibrasil-etl", "--kind", "export"]);
        assert_eq!(config.years(), vec![2020, 2021, 2022, 2023]);
    }

    #[test]
    fn test_year_overrides() {
        let config = CliConfig::parse_from([
            "vitibrasil-etl",
            "--kind",
            "import",
            "--from-year",
            "2015",
            "--to-year",
            "2016",
            "--category",
            "ESPUMANTES",
        ]);
        assert_eq!(config.years(), vec![2015, 2016]);
        assert_eq!(config.category(), Some("ESPUMANTES"));
    }

    #[test]
    fn test_inverted_years_fail_validation() {
        let config = CliConfig::parse_from(["vitibrasil-etl", "--from-year", "2023", "--to-year", "2020"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_format_fails_validation() {
        let config = CliConfig::parse_from(["vitibrasil-etl", "--output-formats", "csv,xlsx"]);
        assert!(config.validate().is_err());
    }
}
