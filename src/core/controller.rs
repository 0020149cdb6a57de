use crate::core::accumulator::DatasetAccumulator;
use crate::core::extractor::TableExtractor;
use crate::core::locator::{parse_document, TableLocator};
use crate::core::normalizer::FieldNormalizer;
use crate::core::transformer::DomainTransformer;
use crate::domain::model::{Dataset, ScrapeTarget};
use crate::domain::ports::DocumentFetcher;
use crate::domain::schema::Schema;
use crate::utils::error::Result;
use futures::stream::{self, StreamExt};

/// Drives fetch → locate → extract → accumulate for every (year, category)
/// target, then normalize → transform on the merged dataset.
pub struct ScrapeController<F: DocumentFetcher> {
    fetcher: F,
    base_url: String,
    schema: Schema,
    years: Vec<i32>,
    concurrent_requests: usize,
    locator: TableLocator,
    extractor: TableExtractor,
}

impl<F: DocumentFetcher> ScrapeController<F> {
    pub fn new(fetcher: F, base_url: &str, schema: Schema, years: impl IntoIterator<Item = i32>) -> Result<Self> {
        Ok(Self {
            locator: TableLocator::new(&schema.table)?,
            extractor: TableExtractor::new(&schema.markers)?,
            fetcher,
            base_url: base_url.to_string(),
            schema,
            years: years.into_iter().collect(),
            concurrent_requests: 1,
        })
    }

    /// 同時進行中的請求上限；結果仍依 (year, category) 順序合併
    pub fn with_concurrency(mut self, concurrent_requests: usize) -> Self {
        self.concurrent_requests = concurrent_requests.max(1);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Years outer, categories inner. A kind without categories gets one
    /// target per year.
    pub fn targets(&self) -> Vec<ScrapeTarget> {
        self.years
            .iter()
            .flat_map(|&year| {
                if self.schema.categories.is_empty() {
                    vec![ScrapeTarget::new(year, None)]
                } else {
                    self.schema
                        .categories
                        .iter()
                        .map(|category| ScrapeTarget::new(year, Some(category.clone())))
                        .collect()
                }
            })
            .collect()
    }

    /// Fetches and extracts every target into one raw dataset. A transport
    /// failure aborts the whole run; a missing table only skips its target.
    pub async fn collect(&self) -> Result<Dataset> {
        let targets = self.targets();
        tracing::info!(
            "Scraping {} ({} targets, up to {} concurrent requests)",
            self.schema.kind,
            targets.len(),
            self.concurrent_requests
        );

        let mut fetches = stream::iter(targets.into_iter().map(|target| {
            let params = target.query_params(&self.schema.page_option);
            async move {
                let body = self.fetcher.fetch(&self.base_url, &params).await;
                (target, body)
            }
        }))
        .buffered(self.concurrent_requests);

        let mut accumulator = DatasetAccumulator::new();
        while let Some((target, body)) = fetches.next().await {
            let body = body?;
            match self.process_document(&body, &target, &mut accumulator)? {
                Some(count) => tracing::debug!("Extracted {} rows for {}", count, target),
                None => tracing::warn!("Table not found for {}, skipping", target),
            }
        }

        tracing::info!("Collected {} raw rows", accumulator.len());
        Ok(accumulator.into_dataset())
    }

    /// Locates and extracts the table in one fetched page. `Ok(None)` means
    /// the page has no data table.
    pub fn process_document(
        &self,
        body: &[u8],
        target: &ScrapeTarget,
        accumulator: &mut DatasetAccumulator,
    ) -> Result<Option<usize>> {
        let document = parse_document(body);
        let Some(table) = self.locator.locate(&document) else {
            return Ok(None);
        };

        let extraction = self.extractor.extract(table, target.category_label());
        let columns = extraction.columns().to_vec();
        accumulator.append(target, &columns, extraction).map(Some)
    }

    /// Normalize, then shape the dataset for this kind.
    pub fn finish(&self, raw: &Dataset) -> Result<Dataset> {
        let normalized = FieldNormalizer.apply(raw);
        let transformed = DomainTransformer::new(&self.schema).transform(&normalized)?;
        tracing::info!(
            "Transformed {} raw rows into {} {} rows",
            raw.len(),
            transformed.len(),
            self.schema.kind
        );
        Ok(transformed)
    }

    pub async fn run(&self) -> Result<Dataset> {
        let raw = self.collect().await?;
        self.finish(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Category;
    use crate::domain::schema::DatasetKind;
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Serves canned pages keyed by `ano` / `subopcao`, optionally after a
    /// delay, and records the order of requests and of completions.
    #[derive(Clone, Default)]
    struct MockFetcher {
        pages: HashMap<String, String>,
        delays: HashMap<String, Duration>,
        requests: Arc<Mutex<Vec<String>>>,
        completed: Arc<Mutex<Vec<String>>>,
    }

    impl MockFetcher {
        fn with_page(mut self, key: &str, html: &str) -> Self {
            self.pages.insert(key.to_string(), html.to_string());
            self
        }

        fn with_delay(mut self, key: &str, delay: Duration) -> Self {
            self.delays.insert(key.to_string(), delay);
            self
        }

        fn key(params: &[(String, String)]) -> String {
            params
                .iter()
                .filter(|(k, _)| k != "opcao")
                .map(|(_, v)| v.as_str())
                .collect::<Vec<_>>()
                .join("/")
        }
    }

    #[async_trait]
    impl DocumentFetcher for MockFetcher {
        async fn fetch(&self, _url: &str, params: &[(String, String)]) -> Result<Vec<u8>> {
            let key = Self::key(params);
            self.requests.lock().unwrap().push(key.clone());
            if let Some(delay) = self.delays.get(&key) {
                tokio::time::sleep(*delay).await;
            }
            self.completed.lock().unwrap().push(key.clone());
            self.pages
                .get(&key)
                .map(|html| html.as_bytes().to_vec())
                .ok_or(EtlError::HttpStatusError {
                    url: key,
                    status: 500,
                })
        }
    }

    fn production_page(product: &str, quantity: &str) -> String {
        format!(
            r#"<table class="tb_base tb_dados">
                <thead><tr><th>Produto</th><th>Quantidade (L.)</th></tr></thead>
                <tbody>
                  <tr><td class="tb_item">{product}</td><td class="tb_item">{quantity}</td></tr>
                  <tr><td class="tb_subitem">tinto</td><td class="tb_subitem">4.000</td></tr>
                </tbody>
                <tfoot class="tb_total"><tr><td>TOTAL</td><td>{quantity}</td></tr></tfoot>
            </table>"#
        )
    }

    fn export_page(country: &str) -> String {
        format!(
            r#"<table class="tb_base tb_dados">
                <tr><th>Países</th><th>Quantidade (Kg)</th><th>Valor (US$)</th></tr>
                <tr><td>{country}</td><td>1.000</td><td>2.500</td></tr>
                <tfoot class="tb_total"><tr><td>Total</td><td>1.000</td><td>2.500</td></tr></tfoot>
            </table>"#
        )
    }

    #[test]
    fn test_targets_years_outer_categories_inner() {
        let schema = Schema::for_kind(DatasetKind::Export);
        let controller =
            ScrapeController::new(MockFetcher::default(), "http://test", schema, 2020..=2021).unwrap();
        let targets = controller.targets();
        assert_eq!(targets.len(), 8);
        assert_eq!(targets[0].year, 2020);
        assert_eq!(targets[3].category_label(), Some("SUCO DE UVA"));
        assert_eq!(targets[4].year, 2021);
        assert_eq!(targets[4].category_label(), Some("VINHOS DE MESA"));
    }

    #[test]
    fn test_targets_without_categories() {
        let schema = Schema::for_kind(DatasetKind::Production);
        let controller =
            ScrapeController::new(MockFetcher::default(), "http://test", schema, 2020..=2022).unwrap();
        let targets = controller.targets();
        assert_eq!(targets.len(), 3);
        assert!(targets.iter().all(|t| t.category.is_none()));
    }

    #[tokio::test]
    async fn test_run_production_end_to_end() {
        let fetcher = MockFetcher::default().with_page("2022", &production_page("VINHO DE MESA", "10.000"));
        let schema = Schema::for_kind(DatasetKind::Production);
        let controller = ScrapeController::new(fetcher, "http://test", schema, [2022]).unwrap();

        let dataset = controller.run().await.unwrap();

        assert_eq!(dataset.len(), 2);
        let first = &dataset.records()[0];
        assert_eq!(first.get_str("Produto"), Some("VINHO DE MESA"));
        assert_eq!(first.get_str("Classificação"), Some("VINHO DE MESA"));
        assert_eq!(first.get_i64("Ano"), Some(2022));
        assert_eq!(first.get_i64("Quantidade"), Some(10000));
        let second = &dataset.records()[1];
        assert_eq!(second.get_str("Produto"), Some("TINTO"));
        assert_eq!(second.get_str("Classificação"), Some("VINHO DE MESA"));
        assert_eq!(second.get_i64("Quantidade"), Some(4000));
    }

    #[tokio::test]
    async fn test_merge_keeps_year_order() {
        let fetcher = MockFetcher::default()
            .with_page("2020", &production_page("VINHO DE MESA", "1"))
            .with_page("2021", &production_page("SUCO", "2"))
            .with_delay("2020", Duration::from_millis(100));
        let schema = Schema::for_kind(DatasetKind::Production);
        let controller = ScrapeController::new(fetcher.clone(), "http://test", schema, 2020..=2021)
            .unwrap()
            .with_concurrency(2);

        let raw = controller.collect().await.unwrap();

        // 2021 finishes first, the merge still follows target order
        assert_eq!(
            *fetcher.completed.lock().unwrap(),
            vec!["2021".to_string(), "2020".to_string()]
        );
        let years: Vec<i64> = raw.records().iter().filter_map(|r| r.get_i64("Ano")).collect();
        assert_eq!(years, vec![2020, 2020, 2020, 2021, 2021, 2021]);
        assert_eq!(raw.records()[3].get_str("Produto"), Some("SUCO"));
    }

    #[tokio::test]
    async fn test_missing_table_skips_target() {
        let schema = Schema::for_kind(DatasetKind::Export)
            .with_category("ESPUMANTES")
            .unwrap();
        let fetcher = MockFetcher::default()
            .with_page("2020/subopt_02", "<html><body>Sem dados</body></html>")
            .with_page("2021/subopt_02", &export_page("Chile"));
        let controller = ScrapeController::new(fetcher.clone(), "http://test", schema, 2020..=2021).unwrap();

        let dataset = controller.run().await.unwrap();

        assert_eq!(dataset.len(), 1);
        let row = &dataset.records()[0];
        assert_eq!(row.get_str("Países"), Some("CHILE"));
        assert_eq!(row.get_str("Botao"), Some("ESPUMANTES"));
        assert_eq!(row.get_i64("Valor (US$)"), Some(2500));
        assert_eq!(
            *fetcher.requests.lock().unwrap(),
            vec!["2020/subopt_02".to_string(), "2021/subopt_02".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_run() {
        let schema = Schema {
            categories: vec![Category::new("VINHOS DE MESA", "subopt_01")],
            ..Schema::for_kind(DatasetKind::Import)
        };
        let fetcher = MockFetcher::default().with_page("2020/subopt_01", &export_page("Chile"));
        let controller = ScrapeController::new(fetcher, "http://test", schema, 2020..=2021).unwrap();

        let err = controller.run().await.unwrap_err();
        assert!(matches!(err, EtlError::HttpStatusError { status: 500, .. }));
    }
}
