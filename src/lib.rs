pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{HttpFetcher, LocalStorage};
pub use config::toml_config::TomlConfig;
pub use crate::core::{controller::ScrapeController, etl::EtlEngine, pipeline::ScrapePipeline};
pub use domain::model::{Dataset, Record};
pub use domain::schema::{DatasetKind, Schema};
pub use utils::error::{EtlError, Result};
