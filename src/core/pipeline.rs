use crate::core::controller::ScrapeController;
use crate::core::{ConfigProvider, Dataset, DocumentFetcher, Pipeline, Storage};
use crate::domain::schema::Schema;
use crate::utils::error::{EtlError, Result};
use serde_json::Value;

/// Schema for the configured kind: the override if one is given, otherwise
/// the built-in one, narrowed to a single category when requested.
pub fn resolve_schema<C: ConfigProvider>(config: &C) -> Result<Schema> {
    let schema = config
        .schema_override()
        .cloned()
        .unwrap_or_else(|| Schema::for_kind(config.kind()));
    match config.category() {
        Some(category) => schema.with_category(category),
        None => Ok(schema),
    }
}

pub struct ScrapePipeline<F: DocumentFetcher, S: Storage, C: ConfigProvider> {
    controller: ScrapeController<F>,
    storage: S,
    config: C,
}

impl<F: DocumentFetcher, S: Storage, C: ConfigProvider> ScrapePipeline<F, S, C> {
    pub fn new(fetcher: F, storage: S, config: C) -> Result<Self> {
        let schema = resolve_schema(&config)?;
        let controller = ScrapeController::new(fetcher, config.base_url(), schema, config.years())?
            .with_concurrency(config.concurrent_requests());
        Ok(Self {
            controller,
            storage,
            config,
        })
    }

    pub fn controller(&self) -> &ScrapeController<F> {
        &self.controller
    }

    fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.controller.schema().kind, extension)
    }
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn to_csv(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(dataset.columns())?;
    for record in dataset.records() {
        writer.write_record(dataset.columns().iter().map(|c| render_cell(record.get(c))))?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

pub fn to_json(dataset: &Dataset) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&dataset.to_json_records())?)
}

#[async_trait::async_trait]
impl<F: DocumentFetcher, S: Storage, C: ConfigProvider> Pipeline for ScrapePipeline<F, S, C> {
    async fn extract(&self) -> Result<Dataset> {
        self.controller.collect().await
    }

    async fn transform(&self, data: Dataset) -> Result<Dataset> {
        self.controller.finish(&data)
    }

    async fn load(&self, result: Dataset) -> Result<String> {
        let mut written = Vec::new();
        for format in self.config.output_formats() {
            let bytes = match format.as_str() {
                "csv" => to_csv(&result)?,
                "json" => to_json(&result)?,
                other => {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "output_formats".to_string(),
                        value: other.to_string(),
                        reason: "Unsupported format".to_string(),
                    })
                }
            };
            let file_name = self.file_name(format);
            tracing::debug!("Writing {} ({} bytes) to storage", file_name, bytes.len());
            self.storage.write_file(&file_name, &bytes).await?;
            written.push(format!("{}/{}", self.config.output_path(), file_name));
        }
        Ok(written.join(", "))
    }
}
