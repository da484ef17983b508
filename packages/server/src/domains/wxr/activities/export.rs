//! WXR export - serialize every post, its tags and its comments
//!
//! Comment ids are renumbered per export starting at 1, and reply parents point at
//! those export ids, so the output is self-consistent and re-imports cleanly.

use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::info;

use crate::common::utils::{markdown_to_html, slugify};
use crate::common::CommentId;
use crate::config::Config;
use crate::domains::posts::models::{Comment, Post, PostStatus};
use crate::domains::wxr::document::{
    format_wxr_date, WxrCategory, WxrChannel, WxrComment, WxrDocument, WxrItem, WXR_VERSION,
};
use crate::domains::wxr::writer::write_wxr;
use crate::kernel::ServerDeps;

/// Export the whole site as a WXR document.
pub async fn export_wxr(deps: &ServerDeps) -> Result<Vec<u8>> {
    let document = build_export_document(deps).await?;
    let bytes = write_wxr(&document)?;

    info!(
        posts = document.items.len(),
        comments = document.comment_count(),
        bytes = bytes.len(),
        "WXR export completed"
    );

    Ok(bytes)
}

/// Collect posts and comments into a document, oldest post first.
pub async fn build_export_document(deps: &ServerDeps) -> Result<WxrDocument> {
    let mut posts = deps
        .content
        .list_posts()
        .await
        .context("failed to load posts for export")?;
    posts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.slug.cmp(&b.slug)));

    let config = &deps.config;
    let mut items = Vec::with_capacity(posts.len());
    let mut next_comment_id = 1u64;

    for (index, post) in posts.iter().enumerate() {
        let comments = deps
            .content
            .list_comments(post.id)
            .await
            .with_context(|| format!("failed to load comments for post {}", post.slug))?;

        let mut item = post_item(post, index + 1, config);
        item.comments = export_comments(&comments, &mut next_comment_id);
        items.push(item);
    }

    Ok(WxrDocument {
        channel: channel(config),
        items,
    })
}

fn site_url(config: &Config) -> &str {
    config.site_url.trim_end_matches('/')
}

fn channel(config: &Config) -> WxrChannel {
    WxrChannel {
        title: config.site_title.clone(),
        link: site_url(config).to_string(),
        description: String::new(),
        language: config.site_language.clone(),
        wxr_version: WXR_VERSION.to_string(),
        base_site_url: site_url(config).to_string(),
        base_blog_url: site_url(config).to_string(),
    }
}

fn post_item(post: &Post, export_id: usize, config: &Config) -> WxrItem {
    let permalink = format!("{}/{}/", site_url(config), post.slug);
    let date = post.published_at.unwrap_or(post.created_at);

    let content = if post.content_html.trim().is_empty() {
        markdown_to_html(&post.content_markdown)
    } else {
        post.content_html.clone()
    };

    let status = match post.status {
        PostStatus::Published => "publish",
        PostStatus::Draft => "draft",
    };

    let categories = post
        .tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|name| WxrCategory {
            domain: "post_tag".to_string(),
            nicename: slugify(name),
            name: name.to_string(),
        })
        .collect();

    WxrItem {
        title: post.title.clone(),
        link: permalink.clone(),
        pub_date: date.to_rfc2822(),
        guid: permalink,
        description: String::new(),
        content,
        excerpt: post.summary.clone(),
        post_id: export_id.to_string(),
        post_date: format_wxr_date(date),
        post_date_gmt: format_wxr_date(date),
        post_name: post.slug.clone(),
        status: status.to_string(),
        post_type: "post".to_string(),
        categories,
        comments: Vec::new(),
    }
}

/// Renumber one post's comments, continuing from `next_id`.
fn export_comments(comments: &[Comment], next_id: &mut u64) -> Vec<WxrComment> {
    let mut ids: HashMap<CommentId, u64> = HashMap::with_capacity(comments.len());
    for comment in comments {
        ids.insert(comment.id, *next_id);
        *next_id += 1;
    }

    comments
        .iter()
        .map(|comment| {
            let parent = comment
                .parent_id
                .and_then(|p| ids.get(&p))
                .map(|id| id.to_string())
                .unwrap_or_else(|| "0".to_string());
            let date = format_wxr_date(comment.created_at);

            WxrComment {
                id: ids
                    .get(&comment.id)
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                author: comment.author_name.clone(),
                author_email: comment.author_email.clone(),
                author_url: comment.author_url.clone(),
                date: date.clone(),
                date_gmt: date,
                content: markdown_to_html(&comment.content).trim().to_string(),
                approved: comment.status.as_interchange().to_string(),
                parent,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PostId;

    #[test]
    fn test_export_comments_renumbers_parents() {
        let post_id = PostId::new();
        let parent = Comment::builder()
            .post_id(post_id)
            .author_name("Ann")
            .content("first")
            .build();
        let mut reply = Comment::builder()
            .post_id(post_id)
            .author_name("Bob")
            .content("second")
            .build();
        reply.parent_id = Some(parent.id);

        let mut next_id = 5;
        let exported = export_comments(&[parent, reply], &mut next_id);

        assert_eq!(next_id, 7);
        assert_eq!(exported[0].id, "5");
        assert_eq!(exported[0].parent, "0");
        assert_eq!(exported[1].id, "6");
        assert_eq!(exported[1].parent, "5");
        assert_eq!(exported[1].content, "<p>second</p>");
    }

    #[test]
    fn test_post_item_fields() {
        let post = Post::builder()
            .slug("hello")
            .title("Hello")
            .content_markdown("Some *text*")
            .tags(vec!["Rust Lang".to_string()])
            .build();
        let config = Config {
            site_url: "https://blog.example.com/".to_string(),
            ..Config::default()
        };

        let item = post_item(&post, 1, &config);

        assert_eq!(item.link, "https://blog.example.com/hello/");
        assert_eq!(item.status, "draft");
        assert_eq!(item.content.trim(), "<p>Some <em>text</em></p>");
        assert_eq!(item.categories[0].nicename, "rust-lang");
        assert_eq!(item.categories[0].name, "Rust Lang");
        assert_eq!(item.post_date.len(), "YYYY-MM-DD HH:MM:SS".len());
    }
}
