//! Streaming WXR reader built on quick-xml.
//!
//! Elements are matched by their qualified name as written (`wp:post_name`,
//! `content:encoded`); exporters in the wild always use these prefixes. Text and
//! CDATA inside one element are concatenated, so split CDATA sections read back
//! as a single value.

use std::borrow::Cow;

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::document::{WxrCategory, WxrChannel, WxrComment, WxrDocument, WxrItem};

/// Parse a WXR document from raw bytes.
pub fn parse_wxr(bytes: &[u8]) -> Result<WxrDocument> {
    let mut reader = Reader::from_reader(bytes);
    let mut state = ParseState::default();
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).with_context(|| {
            format!(
                "malformed WXR document at byte {}",
                reader.buffer_position()
            )
        })?;

        match event {
            Event::Start(start) => state.open(&start),
            Event::Empty(start) => state.empty(&start),
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                state.close(&name);
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .unwrap_or_else(|_| Cow::Owned(String::from_utf8_lossy(&text).into_owned()));
                state.text.push_str(&value);
            }
            Event::CData(cdata) => {
                state.text.push_str(&String::from_utf8_lossy(&cdata));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !state.seen_channel {
        anyhow::bail!("not a WXR document: no <channel> element");
    }

    Ok(state.document)
}

#[derive(Default)]
struct ParseState {
    document: WxrDocument,
    seen_channel: bool,
    /// Names of currently open elements, outermost first.
    stack: Vec<String>,
    text: String,
    item: Option<WxrItem>,
    comment: Option<WxrComment>,
    category: Option<WxrCategory>,
}

impl ParseState {
    fn open(&mut self, start: &BytesStart) {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        self.text.clear();

        match name.as_str() {
            "channel" => self.seen_channel = true,
            "item" if self.parent_is("channel") => self.item = Some(WxrItem::default()),
            "wp:comment" if self.item.is_some() => self.comment = Some(WxrComment::default()),
            "category" if self.item.is_some() && self.comment.is_none() => {
                self.category = Some(category_from_attributes(start));
            }
            _ => {}
        }

        self.stack.push(name);
    }

    /// Self-closing elements carry no text; only `<channel/>` matters.
    fn empty(&mut self, start: &BytesStart) {
        if start.name().as_ref() == b"channel" {
            self.seen_channel = true;
        }
    }

    fn close(&mut self, name: &str) {
        self.stack.pop();
        let value = std::mem::take(&mut self.text);

        if name == "category" {
            if let (Some(mut category), Some(item)) = (self.category.take(), self.item.as_mut()) {
                category.name = value.trim().to_string();
                item.categories.push(category);
            }
            return;
        }

        if self.comment.is_some() {
            if name == "wp:comment" {
                if let (Some(comment), Some(item)) = (self.comment.take(), self.item.as_mut()) {
                    item.comments.push(comment);
                }
            } else if self.parent_is("wp:comment") {
                if let Some(comment) = self.comment.as_mut() {
                    set_comment_field(comment, name, value);
                }
            }
            return;
        }

        if self.item.is_some() {
            if name == "item" {
                if let Some(item) = self.item.take() {
                    self.document.items.push(item);
                }
            } else if self.parent_is("item") {
                if let Some(item) = self.item.as_mut() {
                    set_item_field(item, name, value);
                }
            }
            return;
        }

        if self.parent_is("channel") {
            set_channel_field(&mut self.document.channel, name, value);
        }
    }

    fn parent_is(&self, name: &str) -> bool {
        self.stack.last().map(String::as_str) == Some(name)
    }
}

fn category_from_attributes(start: &BytesStart) -> WxrCategory {
    let mut category = WxrCategory::default();
    for attr in start.attributes().flatten() {
        let value = attr
            .unescape_value()
            .map(Cow::into_owned)
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        match attr.key.as_ref() {
            b"domain" => category.domain = value,
            b"nicename" => category.nicename = value,
            _ => {}
        }
    }
    category
}

fn set_channel_field(channel: &mut WxrChannel, name: &str, value: String) {
    let value = value.trim().to_string();
    match name {
        "title" => channel.title = value,
        "link" => channel.link = value,
        "description" => channel.description = value,
        "language" => channel.language = value,
        "wp:wxr_version" => channel.wxr_version = value,
        "wp:base_site_url" => channel.base_site_url = value,
        "wp:base_blog_url" => channel.base_blog_url = value,
        _ => {}
    }
}

fn set_item_field(item: &mut WxrItem, name: &str, value: String) {
    match name {
        // Bodies keep their whitespace.
        "content:encoded" => item.content = value,
        "excerpt:encoded" => item.excerpt = value,
        "description" => item.description = value,
        _ => {
            let value = value.trim().to_string();
            match name {
                "title" => item.title = value,
                "link" => item.link = value,
                "pubDate" => item.pub_date = value,
                "guid" => item.guid = value,
                "wp:post_id" => item.post_id = value,
                "wp:post_date" => item.post_date = value,
                "wp:post_date_gmt" => item.post_date_gmt = value,
                "wp:post_name" => item.post_name = value,
                "wp:status" => item.status = value,
                "wp:post_type" => item.post_type = value,
                _ => {}
            }
        }
    }
}

fn set_comment_field(comment: &mut WxrComment, name: &str, value: String) {
    if name == "wp:comment_content" {
        comment.content = value;
        return;
    }
    let value = value.trim().to_string();
    match name {
        "wp:comment_id" => comment.id = value,
        "wp:comment_author" => comment.author = value,
        "wp:comment_author_email" => comment.author_email = value,
        "wp:comment_author_url" => comment.author_url = value,
        "wp:comment_date" => comment.date = value,
        "wp:comment_date_gmt" => comment.date_gmt = value,
        "wp:comment_approved" => comment.approved = value,
        "wp:comment_parent" => comment.parent = value,
        _ => {}
    }
}
