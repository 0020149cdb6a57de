use crate::core::locator::charset_from;
use crate::core::{ConfigProvider, DocumentFetcher};
use encoding_rs::UTF_8;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;

const USER_AGENT: &str = concat!("vitibrasil-etl/", env!("CARGO_PKG_VERSION"));

/// Fetches portal pages over HTTP, retrying failed attempts a fixed number
/// of times.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            retry_attempts: 1,
            retry_delay: Duration::ZERO,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Ok(Self::new(config.timeout())?.with_retry(config.retry_attempts(), config.retry_delay()))
    }

    /// `attempts` 為總嘗試次數 (至少一次)
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    async fn fetch_once(&self, url: &str, params: &[(String, String)]) -> Result<Vec<u8>> {
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();
        tracing::debug!("GET {} -> {}", response.url(), status);

        if !status.is_success() {
            return Err(EtlError::HttpStatusError {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_from);
        let body = response.bytes().await?;

        // 轉成 UTF-8，頁面內的 <meta charset> 不再適用
        Ok(match charset {
            Some(encoding) if encoding != UTF_8 => {
                tracing::debug!("Transcoding {} response to UTF-8", encoding.name());
                encoding.decode_without_bom_handling(&body).0.into_owned().into_bytes()
            }
            _ => body.to_vec(),
        })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, params: &[(String, String)]) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url, params).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.retry_attempts => {
                    tracing::warn!(
                        "Attempt {}/{} failed: {}, retrying in {:?}",
                        attempt,
                        self.retry_attempts,
                        e,
                        self.retry_delay
                    );
                    sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
