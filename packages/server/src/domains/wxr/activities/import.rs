//! WXR import - create posts and comments from an interchange document
//!
//! Import is idempotent per item rather than transactional: posts are gated on their
//! slug and comments on (author, content, timestamp), so re-running a document after
//! a crash picks up where it stopped without duplicating anything.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::common::utils::{html_to_markdown_or_raw, slug_from_permalink, slugify};
use crate::common::{CommentId, PostId};
use crate::domains::posts::models::{Comment, CommentKey, CommentStatus, Post, PostStatus};
use crate::domains::tag::normalize_tag_names;
use crate::domains::wxr::document::{first_wxr_date, WxrComment, WxrItem};
use crate::domains::wxr::parser::parse_wxr;
use crate::kernel::ServerDeps;

/// Outcome of one import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WxrImportResult {
    pub posts_added: usize,
    pub posts_skipped: usize,
    pub comments_added: usize,
    pub comments_skipped: usize,

    /// Posts created by this run, in document order.
    #[serde(skip)]
    pub new_post_ids: Vec<PostId>,
    /// New posts that arrived without tags.
    #[serde(skip)]
    pub needs_tags: Vec<PostId>,
    /// New posts that arrived without a summary.
    #[serde(skip)]
    pub needs_description: Vec<PostId>,
}

/// Import a WXR document and queue the follow-up tasks it calls for.
pub async fn import_wxr(bytes: &[u8], deps: &ServerDeps) -> Result<WxrImportResult> {
    let document = parse_wxr(bytes)?;

    info!(
        items = document.items.len(),
        comments = document.comment_count(),
        "Importing WXR document"
    );

    // Lower-cased slug -> (post, its creation time). The creation time dates
    // comments that carry no date of their own.
    let mut posts_by_slug: HashMap<String, (PostId, DateTime<Utc>)> = deps
        .content
        .list_posts()
        .await
        .context("failed to load existing posts")?
        .into_iter()
        .map(|p| (p.slug.to_lowercase(), (p.id, p.created_at)))
        .collect();

    let mut result = WxrImportResult::default();

    for item in &document.items {
        if item.is_attachment() {
            continue;
        }

        let Some(slug) = derive_slug(item) else {
            debug!(title = %item.title, "item has no derivable slug, skipping");
            result.posts_skipped += 1;
            continue;
        };

        let (post_id, post_created_at) = match posts_by_slug.get(&slug.to_lowercase()) {
            Some(existing) => {
                result.posts_skipped += 1;
                *existing
            }
            None => {
                let post = create_post(item, &slug, deps, &mut result).await?;
                posts_by_slug.insert(slug.to_lowercase(), post);
                post
            }
        };

        import_comments(post_id, post_created_at, &item.comments, deps, &mut result).await?;
    }

    queue_follow_ups(document.origin_url(), deps, &result).await;

    info!(
        posts_added = result.posts_added,
        posts_skipped = result.posts_skipped,
        comments_added = result.comments_added,
        comments_skipped = result.comments_skipped,
        "WXR import completed"
    );

    Ok(result)
}

/// Explicit slug, else the permalink's last segment, else the slugified title.
fn derive_slug(item: &WxrItem) -> Option<String> {
    let explicit = item.post_name.trim();
    if !explicit.is_empty() {
        return Some(explicit.to_string());
    }
    if let Some(slug) = slug_from_permalink(&item.link) {
        return Some(slug);
    }
    let slug = slugify(&item.title);
    (!slug.is_empty()).then_some(slug)
}

fn item_date(item: &WxrItem) -> Option<DateTime<Utc>> {
    first_wxr_date(&[&item.post_date_gmt, &item.post_date]).or_else(|| {
        DateTime::parse_from_rfc2822(item.pub_date.trim())
            .ok()
            .map(|d| d.with_timezone(&Utc))
    })
}

async fn create_post(
    item: &WxrItem,
    slug: &str,
    deps: &ServerDeps,
    result: &mut WxrImportResult,
) -> Result<(PostId, DateTime<Utc>)> {
    let date = item_date(item);
    let created_at = date.unwrap_or_else(Utc::now);

    let summary = [&item.excerpt, &item.description]
        .into_iter()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .unwrap_or_default();

    let title = match item.title.trim() {
        "" => slug,
        title => title,
    };

    let tags = item.tag_names();

    let mut post = Post::builder()
        .slug(slug)
        .title(title)
        .content_html(item.content.as_str())
        .content_markdown(html_to_markdown_or_raw(&item.content))
        .summary(summary)
        .tags(tags.clone())
        .created_at(created_at)
        .updated_at(Utc::now())
        .build();

    if item.status.trim().eq_ignore_ascii_case("publish") {
        post.status = PostStatus::Published;
        post.published_at = Some(created_at);
    }

    if !tags.is_empty() {
        deps.content
            .ensure_tags(&normalize_tag_names(&tags))
            .await
            .context("failed to create tags")?;
    }

    deps.content
        .create_post(&post)
        .await
        .with_context(|| format!("failed to create post {}", slug))?;

    debug!(post_id = %post.id, slug = %slug, status = %post.status, "imported post");

    result.posts_added += 1;
    result.new_post_ids.push(post.id);
    if !post.has_tags() {
        result.needs_tags.push(post.id);
    }
    if !post.has_summary() {
        result.needs_description.push(post.id);
    }

    Ok((post.id, post.created_at))
}

/// Import one item's comments: top-level first, then replies to known parents.
///
/// Undated comments take `fallback_date`, which must be the same on every run
/// for the dedup key to stay stable.
async fn import_comments(
    post_id: PostId,
    fallback_date: DateTime<Utc>,
    comments: &[WxrComment],
    deps: &ServerDeps,
    result: &mut WxrImportResult,
) -> Result<()> {
    if comments.is_empty() {
        return Ok(());
    }

    let mut existing: HashMap<CommentKey, CommentId> = deps
        .content
        .list_comments(post_id)
        .await
        .context("failed to load existing comments")?
        .into_iter()
        .map(|c| (c.dedup_key(), c.id))
        .collect();

    // Source comment id -> stored id, for top-level comments only.
    let mut parents: HashMap<&str, CommentId> = HashMap::new();

    let (top_level, replies): (Vec<&WxrComment>, Vec<&WxrComment>) =
        comments.iter().partition(|c| c.is_top_level());

    for source in top_level {
        let comment = build_comment(post_id, source, None, fallback_date);
        let id = store_comment(comment, &mut existing, deps, result).await?;
        if !source.id.trim().is_empty() {
            parents.insert(source.id.trim(), id);
        }
    }

    for source in replies {
        let Some(parent_id) = parents.get(source.parent.trim()).copied() else {
            debug!(
                comment_id = %source.id,
                parent = %source.parent,
                "dropping reply to unknown parent"
            );
            result.comments_skipped += 1;
            continue;
        };
        let comment = build_comment(post_id, source, Some(parent_id), fallback_date);
        store_comment(comment, &mut existing, deps, result).await?;
    }

    Ok(())
}

fn build_comment(
    post_id: PostId,
    source: &WxrComment,
    parent_id: Option<CommentId>,
    fallback_date: DateTime<Utc>,
) -> Comment {
    let created_at = first_wxr_date(&[&source.date_gmt, &source.date]).unwrap_or(fallback_date);
    let mut comment = Comment::builder()
        .post_id(post_id)
        .author_name(source.author.trim())
        .author_email(source.author_email.trim())
        .author_url(source.author_url.trim())
        .content(html_to_markdown_or_raw(&source.content).trim())
        .status(CommentStatus::from_interchange(&source.approved))
        .created_at(created_at)
        .build();
    comment.parent_id = parent_id;
    comment
}

/// Create `comment` unless an equivalent one exists; returns the id either way.
async fn store_comment(
    comment: Comment,
    existing: &mut HashMap<CommentKey, CommentId>,
    deps: &ServerDeps,
    result: &mut WxrImportResult,
) -> Result<CommentId> {
    let key = comment.dedup_key();
    if let Some(id) = existing.get(&key) {
        result.comments_skipped += 1;
        return Ok(*id);
    }

    deps.content
        .create_comment(&comment)
        .await
        .context("failed to create comment")?;
    existing.insert(key, comment.id);
    result.comments_added += 1;
    Ok(comment.id)
}

/// Backfill for any new posts; image import when there is somewhere to put them.
async fn queue_follow_ups(origin: Option<&str>, deps: &ServerDeps, result: &WxrImportResult) {
    if result.new_post_ids.is_empty() {
        return;
    }

    if let Err(e) = deps.tasks.enqueue_backfill().await {
        warn!(error = %e, "failed to queue backfill after import");
    }

    let Some(origin) = origin else {
        return;
    };
    if deps.image_store.is_none() {
        debug!("no image store configured, skipping image import");
        return;
    }
    if let Err(e) = deps
        .tasks
        .enqueue_image_import(origin, result.new_post_ids.clone())
        .await
    {
        warn!(error = %e, "failed to queue image import after import");
    }
}
