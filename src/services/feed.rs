// src/services/feed.rs

//! Atom serialization.
//!
//! Titles and content are HTML fragments, so both are emitted with
//! `type="html"` and XML-escaped by the writer.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{AppError, Result};
use crate::models::{Feed, FeedItem, Person};

pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml";

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const GENERATOR: &str = concat!("anifeed ", env!("CARGO_PKG_VERSION"));

/// Serialize the feed as an Atom document.
///
/// Output depends only on `feed`; item order is preserved.
pub fn build(feed: &Feed) -> Result<Vec<u8>> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_feed(&mut w, feed).map_err(AppError::feed)?;
    Ok(w.into_inner())
}

fn write_feed<W: Write>(w: &mut Writer<W>, feed: &Feed) -> quick_xml::Result<()> {
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("feed");
    root.push_attribute(("xmlns", ATOM_NS));
    w.write_event(Event::Start(root))?;

    text_element(w, "title", &feed.title)?;
    text_element(w, "updated", &timestamp(&feed.updated))?;
    text_element(w, "id", &feed.self_link)?;
    link(w, "self", &feed.self_link)?;
    text_element(w, "generator", GENERATOR)?;
    write_author(w, &feed.author)?;

    for item in &feed.items {
        write_entry(w, item)?;
    }

    w.write_event(Event::End(BytesEnd::new("feed")))?;
    Ok(())
}

fn write_author<W: Write>(w: &mut Writer<W>, author: &Person) -> quick_xml::Result<()> {
    w.write_event(Event::Start(BytesStart::new("author")))?;
    text_element(w, "name", &author.name)?;
    if !author.uri.is_empty() {
        text_element(w, "uri", &author.uri)?;
    }
    if !author.email.is_empty() {
        text_element(w, "email", &author.email)?;
    }
    w.write_event(Event::End(BytesEnd::new("author")))?;
    Ok(())
}

fn write_entry<W: Write>(w: &mut Writer<W>, item: &FeedItem) -> quick_xml::Result<()> {
    w.write_event(Event::Start(BytesStart::new("entry")))?;

    html_element(w, "title", &item.title)?;
    link(w, "alternate", &item.link)?;
    text_element(w, "id", &item.link)?;
    text_element(w, "updated", &timestamp(&item.updated))?;

    let mut category = BytesStart::new("category");
    category.push_attribute(("term", item.category.as_str()));
    w.write_event(Event::Empty(category))?;

    html_element(w, "content", &item.content)?;

    w.write_event(Event::End(BytesEnd::new("entry")))?;
    Ok(())
}

fn text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> quick_xml::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn html_element<W: Write>(w: &mut Writer<W>, name: &str, html: &str) -> quick_xml::Result<()> {
    let mut start = BytesStart::new(name);
    start.push_attribute(("type", "html"));
    w.write_event(Event::Start(start))?;
    w.write_event(Event::Text(BytesText::new(html)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn link<W: Write>(w: &mut Writer<W>, rel: &str, href: &str) -> quick_xml::Result<()> {
    let mut el = BytesStart::new("link");
    el.push_attribute(("rel", rel));
    el.push_attribute(("href", href));
    w.write_event(Event::Empty(el))?;
    Ok(())
}

/// RFC3339, UTC, second precision.
pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedConfig;
    use chrono::TimeZone;

    fn sample_feed() -> Feed {
        let config = FeedConfig {
            title: "Tracker & friends".into(),
            author_name: "Feed Bot".into(),
            author_email: "bot@example.test".into(),
            ..FeedConfig::default()
        };
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let mut feed = Feed::new(&config, "https://cdn.test/feed.xml", now);

        feed.push(FeedItem {
            title: "Frieren &amp; Friends".into(),
            link: "https://tracker.test/torrent-details.php?torid=1&amp=2".into(),
            category: "Anime \"Series\"".into(),
            updated: Utc.with_ymd_and_hms(2020, 1, 5, 15, 4, 0).unwrap(),
            content: "<div>[Anime Series]</div>".into(),
        });
        feed.push(FeedItem {
            title: "Second".into(),
            link: "https://tracker.test/torrent-details.php?torid=2".into(),
            category: "Anime Movie".into(),
            updated: now,
            content: String::new(),
        });
        feed
    }

    #[test]
    fn test_build_is_deterministic() {
        let feed = sample_feed();
        assert_eq!(build(&feed).unwrap(), build(&feed).unwrap());
    }

    #[test]
    fn test_build_structure() {
        let xml = String::from_utf8(build(&sample_feed()).unwrap()).unwrap();

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(xml.contains(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#));
        assert!(xml.contains("<title>Tracker &amp; friends</title>"));
        assert!(xml.contains("<updated>2026-10-18T09:30:00Z</updated>"));
        assert!(xml.contains(r#"<link rel="self" href="https://cdn.test/feed.xml"/>"#));
        assert!(xml.contains("<email>bot@example.test</email>"));
        assert!(!xml.contains("<uri>"));
        assert!(xml.contains("<updated>2020-01-05T15:04:00Z</updated>"));
    }

    #[test]
    fn test_build_escapes_user_text() {
        let xml = String::from_utf8(build(&sample_feed()).unwrap()).unwrap();

        assert!(xml.contains(r#"<title type="html">Frieren &amp;amp; Friends</title>"#));
        assert!(xml.contains("torid=1&amp;amp=2"));
        assert!(xml.contains(r#"<category term="Anime &quot;Series&quot;"/>"#));
        assert!(xml.contains("&lt;div&gt;[Anime Series]&lt;/div&gt;"));
    }

    #[test]
    fn test_build_preserves_item_order() {
        let xml = String::from_utf8(build(&sample_feed()).unwrap()).unwrap();
        let first = xml.find("torid=1").unwrap();
        let second = xml.find("torid=2").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2020, 1, 5, 15, 4, 0).unwrap();
        assert_eq!(timestamp(&at), "2020-01-05T15:04:00Z");
    }
}
