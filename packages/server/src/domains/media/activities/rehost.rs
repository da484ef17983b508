//! Image rehosting - the `import_images` task
//!
//! Copies origin-hosted images referenced by imported posts into the local image
//! store and points the posts at the new copies. The task is resumable: its result
//! doubles as a checkpoint that is persisted after every single download, and URLs
//! already in the checkpoint's map are never fetched again.
//!
//! ```text
//! scan posts ──► group by resolved URL ──► download missing (checkpoint each)
//!                                                   │
//!                      rewrite HTML + markdown ◄────┘
//! ```

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::{Captures, Regex};
use tracing::{debug, info, warn};
use url::Url;

use super::extract::ImageReferences;
use crate::common::utils::image_id_for_url;
use crate::kernel::jobs::{ImportImagesPayload, ImportImagesResult, TaskError};
use crate::kernel::{BaseImageStore, FetchedImage, ServerDeps};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Destination for intermediate image-import progress.
#[async_trait]
pub trait CheckpointSink: Send + Sync {
    async fn save(&self, checkpoint: &ImportImagesResult) -> Result<()>;
}

/// Run (or resume) an image import, returning the final checkpoint.
pub async fn import_images(
    payload: &ImportImagesPayload,
    mut checkpoint: ImportImagesResult,
    sink: &dyn CheckpointSink,
    deps: &ServerDeps,
) -> Result<ImportImagesResult, TaskError> {
    let store = deps
        .image_store
        .as_deref()
        .ok_or_else(|| TaskError::Storage(anyhow::anyhow!("image store is not configured")))?;

    let origin = Url::parse(&payload.origin_url).map_err(|e| {
        TaskError::Payload(format!("invalid origin_url {:?}: {}", payload.origin_url, e))
    })?;
    if origin.host_str().is_none() {
        return Err(TaskError::Payload(format!(
            "origin_url {:?} has no host",
            payload.origin_url
        )));
    }

    // Scan
    let mut references = ImageReferences::new();
    for post_id in &payload.post_ids {
        match deps.content.get_post(*post_id).await? {
            Some(post) => {
                references.scan(&post.content_html, &origin);
                references.scan(&post.content_markdown, &origin);
            }
            None => debug!(post_id = %post_id, "post vanished before image scan"),
        }
    }

    checkpoint.total = references.len();
    checkpoint.processed = 0;
    checkpoint.errors.clear();

    info!(
        origin = %origin,
        posts = payload.post_ids.len(),
        images = checkpoint.total,
        already_mapped = checkpoint.url_map.len(),
        "Importing images"
    );

    // Download
    for (url, aliases) in references.iter() {
        if let Some(hosted) = checkpoint.url_map.get(url).cloned() {
            // Resumed run: make sure aliases found this time are mapped too.
            for alias in aliases {
                checkpoint
                    .url_map
                    .entry(alias.clone())
                    .or_insert_with(|| hosted.clone());
            }
            checkpoint.processed += 1;
            continue;
        }

        match rehost_one(url, store, deps).await {
            Ok(hosted) => {
                debug!(url = %url, hosted = %hosted, aliases = aliases.len(), "image rehosted");
                checkpoint.url_map.insert(url.clone(), hosted.clone());
                for alias in aliases {
                    checkpoint.url_map.insert(alias.clone(), hosted.clone());
                }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "image download failed");
                checkpoint.errors.push(format!("{}: {:#}", url, e));
            }
        }
        checkpoint.processed += 1;

        sink.save(&checkpoint).await?;
    }

    // Rewrite
    if let Some(rewriter) = UrlRewriter::new(&checkpoint.url_map)? {
        for post_id in &payload.post_ids {
            let Some(mut post) = deps.content.get_post(*post_id).await? else {
                continue;
            };
            let html = rewriter.rewrite(&post.content_html);
            let markdown = rewriter.rewrite(&post.content_markdown);
            if html == post.content_html && markdown == post.content_markdown {
                continue;
            }
            post.content_html = html;
            post.content_markdown = markdown;
            post.touch();
            deps.content.update_post(&post).await?;
            checkpoint.replaced_posts += 1;
        }
    }

    sink.save(&checkpoint).await?;

    info!(
        processed = checkpoint.processed,
        total = checkpoint.total,
        failed = checkpoint.errors.len(),
        replaced_posts = checkpoint.replaced_posts,
        "Image import completed"
    );

    Ok(checkpoint)
}

/// Download one image and store it, returning its hosted URL.
async fn rehost_one(url: &str, store: &dyn BaseImageStore, deps: &ServerDeps) -> Result<String> {
    let id = image_id_for_url(url);

    // Ids are derived from the URL, so an earlier task may already hold this image.
    if store
        .get(&id)
        .await
        .with_context(|| format!("failed to look up image {}", id))?
        .is_some()
    {
        debug!(url = %url, id = %id, "image already stored, skipping download");
        return Ok(store.url_for(&id));
    }

    let timeout = deps.config.image_download_timeout;
    let fetched = tokio::time::timeout(timeout, deps.image_fetcher.fetch(url))
        .await
        .map_err(|_| anyhow::anyhow!("download timed out after {}s", timeout.as_secs()))??;

    let max = deps.config.image_max_bytes;
    if fetched.bytes.len() as u64 > max {
        anyhow::bail!("image exceeds {} bytes", max);
    }

    let content_type = content_type_for(url, &fetched);
    let filename = filename_for(url).unwrap_or_else(|| id.clone());

    store
        .save(&id, &filename, &content_type, fetched.bytes)
        .await
        .with_context(|| format!("failed to store image {}", id))
}

/// Content type from an `image/*` response header, else guessed from the URL path.
fn content_type_for(url: &str, fetched: &FetchedImage) -> String {
    let from_header = fetched
        .content_type
        .as_deref()
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| v.starts_with("image/"));
    if let Some(content_type) = from_header {
        return content_type;
    }

    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
        .to_string()
}

fn filename_for(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

/// Single-pass replacement of every mapped URL in a piece of content.
struct UrlRewriter<'a> {
    pattern: Regex,
    url_map: &'a BTreeMap<String, String>,
}

impl<'a> UrlRewriter<'a> {
    fn new(url_map: &'a BTreeMap<String, String>) -> Result<Option<Self>> {
        if url_map.is_empty() {
            return Ok(None);
        }
        let mut keys: Vec<&String> = url_map.keys().collect();
        // Longest first so an absolute URL wins over a relative alias it contains.
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = keys
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&alternation).context("failed to build URL rewrite pattern")?;
        Ok(Some(Self { pattern, url_map }))
    }

    fn rewrite(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &Captures| {
                let Some(m) = caps.get(0) else {
                    return String::new();
                };
                let matched = m.as_str();
                // A relative alias glued to a longer path belongs to some other URL.
                if !is_absolute(matched) && continues_path(text[..m.start()].chars().last()) {
                    return matched.to_string();
                }
                self.url_map
                    .get(matched)
                    .cloned()
                    .unwrap_or_else(|| matched.to_string())
            })
            .into_owned()
    }
}

fn is_absolute(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://") || reference.starts_with("//")
}

fn continues_path(prev: Option<char>) -> bool {
    matches!(prev, Some(c) if c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_' | ':' | '%'))
}
