//! Test fixtures: WXR documents and stored posts.

use anyhow::Result;
use press_core::common::PostId;
use press_core::domains::posts::models::Post;
use press_core::kernel::BaseContentStore;

pub const ORIGIN: &str = "https://old.example.com";

/// Wrap `items` in a channel exported from [`ORIGIN`].
pub fn wxr_document(items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
    xmlns:excerpt="http://wordpress.org/export/1.2/excerpt/"
    xmlns:content="http://purl.org/rss/1.0/modules/content/"
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:wp="http://wordpress.org/export/1.2/">
<channel>
    <title>Old Blog</title>
    <link>{origin}</link>
    <language>en-US</language>
    <wp:wxr_version>1.2</wp:wxr_version>
    <wp:base_site_url>{origin}</wp:base_site_url>
    <wp:base_blog_url>{origin}</wp:base_blog_url>
{items}
</channel>
</rss>"#,
        origin = ORIGIN,
        items = items.join("\n"),
    )
}

/// A published post item with the given slug and HTML body.
pub fn wxr_post(slug: &str, title: &str, html: &str, extra: &str) -> String {
    format!(
        r#"    <item>
        <title>{title}</title>
        <link>{origin}/2020/01/{slug}/</link>
        <content:encoded><![CDATA[{html}]]></content:encoded>
        <excerpt:encoded><![CDATA[]]></excerpt:encoded>
        <wp:post_date><![CDATA[2020-01-02 03:04:05]]></wp:post_date>
        <wp:post_date_gmt><![CDATA[2020-01-02 03:04:05]]></wp:post_date_gmt>
        <wp:post_name><![CDATA[{slug}]]></wp:post_name>
        <wp:status><![CDATA[publish]]></wp:status>
        <wp:post_type><![CDATA[post]]></wp:post_type>
{extra}
    </item>"#,
        title = title,
        origin = ORIGIN,
        slug = slug,
        html = html,
        extra = extra,
    )
}

/// A `<wp:comment>` element.
pub fn wxr_comment(id: u32, parent: u32, author: &str, content: &str, approved: &str) -> String {
    format!(
        r#"        <wp:comment>
            <wp:comment_id>{id}</wp:comment_id>
            <wp:comment_author><![CDATA[{author}]]></wp:comment_author>
            <wp:comment_author_email><![CDATA[{author}@example.com]]></wp:comment_author_email>
            <wp:comment_date>2020-01-03 10:00:{second:02}</wp:comment_date>
            <wp:comment_date_gmt>2020-01-03 10:00:{second:02}</wp:comment_date_gmt>
            <wp:comment_content><![CDATA[{content}]]></wp:comment_content>
            <wp:comment_approved><![CDATA[{approved}]]></wp:comment_approved>
            <wp:comment_parent>{parent}</wp:comment_parent>
        </wp:comment>"#,
        id = id,
        author = author,
        second = id % 60,
        content = content,
        approved = approved,
        parent = parent,
    )
}

/// A post tag category element.
pub fn wxr_tag(name: &str, nicename: &str) -> String {
    format!(
        r#"        <category domain="post_tag" nicename="{nicename}"><![CDATA[{name}]]></category>"#,
        nicename = nicename,
        name = name,
    )
}

/// Store a post directly, bypassing import.
pub async fn create_test_post(
    store: &dyn BaseContentStore,
    slug: &str,
    markdown: &str,
    summary: &str,
    tags: &[&str],
) -> Result<PostId> {
    let post = Post::builder()
        .slug(slug)
        .title(format!("Post {}", slug))
        .content_markdown(markdown)
        .summary(summary)
        .tags(tags.iter().map(|t| t.to_string()).collect::<Vec<_>>())
        .build();
    store.create_post(&post).await?;
    Ok(post.id)
}

pub async fn get_post(store: &dyn BaseContentStore, id: PostId) -> Post {
    store
        .get_post(id)
        .await
        .expect("Failed to load post")
        .expect("Post not found")
}
