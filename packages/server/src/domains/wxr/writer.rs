//! WXR serializer built on quick-xml.
//!
//! Free-form bodies (post content, excerpts, comment content, names) are written as
//! CDATA; identifiers and dates as escaped text.

use anyhow::{Context, Result};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::document::{WxrCategory, WxrChannel, WxrComment, WxrDocument, WxrItem};

const RSS_NAMESPACES: &[(&str, &str)] = &[
    ("xmlns:excerpt", "http://wordpress.org/export/1.2/excerpt/"),
    ("xmlns:content", "http://purl.org/rss/1.0/modules/content/"),
    ("xmlns:wfw", "http://wellformedweb.org/CommentAPI/"),
    ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
    ("xmlns:wp", "http://wordpress.org/export/1.2/"),
];

/// Serialize `document` as a UTF-8 WXR file.
pub fn write_wxr(document: &WxrDocument) -> Result<Vec<u8>> {
    let mut out = WxrWriter {
        inner: Writer::new_with_indent(Vec::new(), b' ', 2),
    };

    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    for attr in RSS_NAMESPACES {
        rss.push_attribute(*attr);
    }
    out.event(Event::Start(rss))?;
    out.start("channel")?;

    write_channel(&mut out, &document.channel)?;
    for item in &document.items {
        write_item(&mut out, item)?;
    }

    out.end("channel")?;
    out.end("rss")?;

    Ok(out.inner.into_inner())
}

fn write_channel(out: &mut WxrWriter, channel: &WxrChannel) -> Result<()> {
    out.text_element("title", &channel.title)?;
    out.text_element("link", &channel.link)?;
    out.text_element("description", &channel.description)?;
    out.text_element("language", &channel.language)?;
    out.text_element("wp:wxr_version", &channel.wxr_version)?;
    out.text_element("wp:base_site_url", &channel.base_site_url)?;
    out.text_element("wp:base_blog_url", &channel.base_blog_url)?;
    Ok(())
}

fn write_item(out: &mut WxrWriter, item: &WxrItem) -> Result<()> {
    out.start("item")?;
    out.text_element("title", &item.title)?;
    out.text_element("link", &item.link)?;
    out.text_element("pubDate", &item.pub_date)?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "false"));
    out.event(Event::Start(guid))?;
    out.event(Event::Text(BytesText::new(&item.guid)))?;
    out.end("guid")?;

    out.cdata_element("description", &item.description)?;
    out.cdata_element("content:encoded", &item.content)?;
    out.cdata_element("excerpt:encoded", &item.excerpt)?;
    out.text_element("wp:post_id", &item.post_id)?;
    out.cdata_element("wp:post_date", &item.post_date)?;
    out.cdata_element("wp:post_date_gmt", &item.post_date_gmt)?;
    out.cdata_element("wp:post_name", &item.post_name)?;
    out.cdata_element("wp:status", &item.status)?;
    out.cdata_element("wp:post_type", &item.post_type)?;

    for category in &item.categories {
        write_category(out, category)?;
    }
    for comment in &item.comments {
        write_comment(out, comment)?;
    }

    out.end("item")
}

fn write_category(out: &mut WxrWriter, category: &WxrCategory) -> Result<()> {
    let mut start = BytesStart::new("category");
    start.push_attribute(("domain", category.domain.as_str()));
    start.push_attribute(("nicename", category.nicename.as_str()));
    out.event(Event::Start(start))?;
    out.cdata(&category.name)?;
    out.end("category")
}

fn write_comment(out: &mut WxrWriter, comment: &WxrComment) -> Result<()> {
    out.start("wp:comment")?;
    out.text_element("wp:comment_id", &comment.id)?;
    out.cdata_element("wp:comment_author", &comment.author)?;
    out.cdata_element("wp:comment_author_email", &comment.author_email)?;
    out.text_element("wp:comment_author_url", &comment.author_url)?;
    out.text_element("wp:comment_date", &comment.date)?;
    out.text_element("wp:comment_date_gmt", &comment.date_gmt)?;
    out.cdata_element("wp:comment_content", &comment.content)?;
    out.text_element("wp:comment_approved", &comment.approved)?;
    out.text_element("wp:comment_parent", &comment.parent)?;
    out.end("wp:comment")
}

/// Thin helpers over quick-xml's event writer.
struct WxrWriter {
    inner: Writer<Vec<u8>>,
}

impl WxrWriter {
    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.inner
            .write_event(event)
            .context("failed to write WXR event")
    }

    fn start(&mut self, name: &str) -> Result<()> {
        self.event(Event::Start(BytesStart::new(name)))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, value: &str) -> Result<()> {
        self.start(name)?;
        // Always emit the text event so the indenter keeps the end tag inline.
        self.event(Event::Text(BytesText::new(value)))?;
        self.end(name)
    }

    fn cdata_element(&mut self, name: &str, value: &str) -> Result<()> {
        self.start(name)?;
        self.cdata(value)?;
        self.end(name)
    }

    /// Write `value` as CDATA, splitting around any `]]>` it contains.
    fn cdata(&mut self, value: &str) -> Result<()> {
        for section in cdata_sections(value) {
            self.event(Event::CData(BytesCData::new(section)))?;
        }
        Ok(())
    }
}

/// Split text into CDATA-safe sections: `a]]>b` becomes `a]]` and `>b`.
fn cdata_sections(value: &str) -> Vec<String> {
    let parts: Vec<&str> = value.split("]]>").collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let mut section = String::with_capacity(part.len() + 3);
            if i > 0 {
                section.push('>');
            }
            section.push_str(part);
            if i < last {
                section.push_str("]]");
            }
            section
        })
        .collect()
}
