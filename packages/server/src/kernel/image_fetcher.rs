//! HTTP image downloader used by the rehosting pipeline
//!
//! - reqwest client with a per-request timeout and a redirect limit
//! - body read chunk by chunk and abandoned as soon as it passes the size cap
//! - non-2xx responses are errors

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{BaseImageFetcher, FetchedImage};
use crate::config::Config;

pub struct HttpImageFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("press-server/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, max_bytes })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.image_download_timeout, config.image_max_bytes)
    }
}

#[async_trait]
impl BaseImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {}", status);
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                anyhow::bail!("image is {} bytes, limit is {}", length, self.max_bytes);
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .context("failed to read response body")?
        {
            if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                anyhow::bail!("image exceeds {} bytes", self.max_bytes);
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(url = %url, size = bytes.len(), "downloaded image");

        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}
