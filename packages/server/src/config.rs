use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Pending tasks fetched per batch by the runner
    pub task_batch_size: usize,
    /// Timeout for a single text-generation request
    pub ai_timeout: Duration,
    /// Timeout for a single image download
    pub image_download_timeout: Duration,
    /// Downloads larger than this are abandoned
    pub image_max_bytes: u64,
    /// Channel metadata written on export
    pub site_title: String,
    pub site_url: String,
    pub site_language: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            task_batch_size: 10,
            ai_timeout: Duration::from_secs(30),
            image_download_timeout: Duration::from_secs(30),
            image_max_bytes: 20 * 1024 * 1024,
            site_title: "Blog".to_string(),
            site_url: "http://localhost:8080".to_string(),
            site_language: "en".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = Self::default();

        Ok(Self {
            task_batch_size: parse_var("TASK_BATCH_SIZE", defaults.task_batch_size)?,
            ai_timeout: Duration::from_secs(parse_var(
                "AI_TIMEOUT_SECS",
                defaults.ai_timeout.as_secs(),
            )?),
            image_download_timeout: Duration::from_secs(parse_var(
                "IMAGE_DOWNLOAD_TIMEOUT_SECS",
                defaults.image_download_timeout.as_secs(),
            )?),
            image_max_bytes: parse_var("IMAGE_MAX_BYTES", defaults.image_max_bytes)?,
            site_title: env::var("SITE_TITLE").unwrap_or(defaults.site_title),
            site_url: env::var("SITE_URL").unwrap_or(defaults.site_url),
            site_language: env::var("SITE_LANGUAGE").unwrap_or(defaults.site_language),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}
