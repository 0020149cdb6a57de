use crate::domain::model::Dataset;
use crate::domain::schema::{DatasetKind, Schema};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 取得原始頁面內容；傳輸錯誤直接往上拋
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<Vec<u8>>;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn kind(&self) -> DatasetKind;
    fn years(&self) -> Vec<i32>;
    fn category(&self) -> Option<&str>;
    fn schema_override(&self) -> Option<&Schema> {
        None
    }
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn concurrent_requests(&self) -> usize;
    fn retry_attempts(&self) -> u32;
    fn retry_delay(&self) -> Duration;
    fn timeout(&self) -> Duration;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Dataset>;
    async fn transform(&self, data: Dataset) -> Result<Dataset>;
    async fn load(&self, result: Dataset) -> Result<String>;
}
