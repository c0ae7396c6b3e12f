// src/services/profile.rs

//! Listing row and torrent profile extraction.
//!
//! Field selection follows the tracker's markup:
//! - rows are `tr.dataOdd` / `tr.dataEven`
//! - the category is the first `title` attribute on or inside an anchor
//! - the detail link is the first anchor wrapping a `<strong>` title
//! - the profile keeps its description in `div#torDescription`, artwork under
//!   the image host, and the upload time in `span.blogDate`

use chrono::{DateTime, NaiveDateTime, Utc};
use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_quoted_attribute, encode_text};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{DetailFields, ListingRow, SiteConfig, UpdatedAt};
use crate::utils::resolve_url;

/// Layout of the profile's blog date, e.g. `5 Jan, 2020 [3:04 pm]`.
pub const BLOG_DATE_LAYOUT: &str = "%d %b, %Y [%I:%M %P]";

/// Extracts rows from listing pages and fields from profile pages.
pub struct ProfileExtractor {
    base_url: Url,
    excluded: Vec<String>,
    img_tag: Regex,
    row_sel: Selector,
    category_sel: Selector,
    link_sel: Selector,
    strong_sel: Selector,
    plot_sel: Selector,
    cover_sel: Selector,
    screenshot_sel: Selector,
    date_sel: Selector,
}

impl ProfileExtractor {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let prefix = config.asset_prefix.replace('"', "\\\"");
        Ok(Self {
            base_url: Url::parse(&config.base_url)?,
            excluded: config.excluded_categories.clone(),
            img_tag: Regex::new(r"(?i)<img\b[^>]*>")
                .map_err(|e| AppError::config(format!("image tag pattern: {e}")))?,
            row_sel: parse_selector("tr.dataOdd, tr.dataEven")?,
            category_sel: parse_selector("a[title], a [title]")?,
            link_sel: parse_selector("a[href]")?,
            strong_sel: parse_selector("strong")?,
            plot_sel: parse_selector("div#torDescription")?,
            cover_sel: parse_selector(&format!(r#"img[src^="{prefix}covers/"]"#))?,
            screenshot_sel: parse_selector(&format!(r#"img[src^="{prefix}screenthumb/"]"#))?,
            date_sel: parse_selector("span.blogDate")?,
        })
    }

    /// Rows of a listing page in match order, excluded categories dropped.
    pub fn extract_rows(&self, body: &str) -> Vec<ListingRow> {
        self.scan_rows(body).0
    }

    /// Like [`Self::extract_rows`], also returning how many rows were excluded.
    pub fn scan_rows(&self, body: &str) -> (Vec<ListingRow>, usize) {
        let (kept, excluded): (Vec<_>, Vec<_>) = self
            .parse_rows(body)
            .into_iter()
            .partition(|row| !row.is_excluded(&self.excluded));

        for row in &excluded {
            log::debug!("Skipping [{}] {}", row.category, row.detail_url);
        }
        log::debug!("Matched {} rows, kept {}", kept.len() + excluded.len(), kept.len());
        (kept, excluded.len())
    }

    fn parse_rows(&self, body: &str) -> Vec<ListingRow> {
        // The AJAX fragment is bare rows; table parsing rules drop them otherwise.
        let document = if body.contains("<table") {
            Html::parse_document(body)
        } else {
            Html::parse_document(&format!("<table>{body}</table>"))
        };

        document
            .select(&self.row_sel)
            .filter_map(|row| self.parse_row(&row))
            .collect()
    }

    fn parse_row(&self, row: &ElementRef) -> Option<ListingRow> {
        let category = row
            .select(&self.category_sel)
            .find_map(|el| el.value().attr("title"))?
            .trim()
            .to_string();

        let (href, anchor) = row.select(&self.link_sel).find_map(|a| {
            a.select(&self.strong_sel).next()?;
            Some((a.value().attr("href")?, a))
        })?;

        // Keep what follows the opening <strong>, as the site renders it.
        let inner = anchor.inner_html();
        let raw_title = match inner.find("<strong>") {
            Some(idx) => inner[idx + "<strong>".len()..].to_string(),
            None => inner,
        };

        Some(ListingRow {
            category,
            detail_url: resolve_url(&self.base_url, href.trim()),
            raw_title,
        })
    }

    /// Clean a raw row title for display.
    ///
    /// Strips `</strong>` and inline images, then escapes exactly once.
    /// Entities are decoded first, so running it again changes nothing.
    pub fn sanitize_title(&self, raw: &str) -> String {
        let without_close = raw.replace("</strong>", "");
        let without_images = self.img_tag.replace_all(&without_close, "");
        let decoded = decode_html_entities(&without_images);
        encode_quoted_attribute(decoded.trim()).into_owned()
    }

    /// Pull the profile fields out of a detail page.
    pub fn extract_detail(&self, body: &str) -> DetailFields {
        let document = Html::parse_document(body);

        let plot = document.select(&self.plot_sel).next().map(|el| el.html());
        let cover = document
            .select(&self.cover_sel)
            .find_map(|el| el.value().attr("src"))
            .map(str::to_string);
        let screenshots = document
            .select(&self.screenshot_sel)
            .filter_map(|el| el.value().attr("src"))
            .map(str::to_string)
            .collect();

        let raw_date = document
            .select(&self.date_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty());

        let updated = match raw_date {
            None => UpdatedAt::Missing,
            Some(raw) => match parse_blog_date(&raw) {
                Some(at) => UpdatedAt::Parsed(at),
                None => UpdatedAt::Unparsable(raw),
            },
        };

        DetailFields {
            plot,
            cover,
            screenshots,
            updated,
        }
    }
}

/// Parse a blog date such as `5 Jan, 2020 [3:04 pm]` as UTC.
pub fn parse_blog_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), BLOG_DATE_LAYOUT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render the entry body: cover, category, link, plot and screenshots.
///
/// `cover` and `screenshots` are the URLs to embed, mirrored or not; the
/// plot markup is taken from `detail` as is.
pub fn render_content(
    row: &ListingRow,
    detail: &DetailFields,
    cover: Option<&str>,
    screenshots: &[String],
) -> String {
    let mut html = String::new();

    if let Some(cover) = cover {
        html.push_str(&format!(
            r#"<div><img src="{}" /></div>"#,
            encode_double_quoted_attribute(cover)
        ));
    }
    html.push_str(&format!("<div>[{}]</div>", encode_text(&row.category)));
    html.push_str(&format!(
        r#"<div><a href="{}">{}</a></div>"#,
        encode_double_quoted_attribute(&row.detail_url),
        encode_text(&row.detail_url)
    ));
    if let Some(plot) = &detail.plot {
        html.push_str(plot);
    }
    if !screenshots.is_empty() {
        html.push_str("<div>");
        for shot in screenshots {
            html.push_str(&format!(
                r#"<img src="{}" />"#,
                encode_double_quoted_attribute(shot)
            ));
        }
        html.push_str("</div>");
    }

    html
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
