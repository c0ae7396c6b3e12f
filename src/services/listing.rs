// src/services/listing.rs

//! Listing scanner.
//!
//! Mines the pagination total from the landing page once, then fetches the
//! AJAX listing fragments page by page. Pacing between pages is the caller's
//! job.

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{ListingPage, SiteConfig};
use crate::services::session::SiteClient;

/// Body text of the page served when the site blocks the listing.
pub const ACCESS_DENIED_MARKER: &str = "Access Denied!";

/// Service for walking the paginated listing.
pub struct ListingScanner<'a> {
    site: &'a dyn SiteClient,
    config: &'a SiteConfig,
    total_pattern: Regex,
}

impl<'a> ListingScanner<'a> {
    pub fn new(site: &'a dyn SiteClient, config: &'a SiteConfig) -> Result<Self> {
        Ok(Self {
            site,
            config,
            total_pattern: page_total_pattern(&config.listing_path)?,
        })
    }

    /// Read the pagination total embedded in the landing page.
    ///
    /// `Ok(None)` means the page loaded but carried no total; whether that is
    /// fatal is decided by the caller.
    pub async fn discover_page_count(&self) -> Result<Option<u32>> {
        log::info!("Finding out the listing page total.");
        let body = self.site.get_text(&self.config.landing_url()).await?;

        let total = parse_page_total(&self.total_pattern, &body);
        match total {
            Some(total) => log::info!("Listing page total: {}.", total),
            None => log::warn!("No listing page total found on the landing page."),
        }
        Ok(total)
    }

    /// Fetch one listing page. An access-denied body is a hard failure.
    pub async fn fetch_page(&self, total: u32, page: u32) -> Result<ListingPage> {
        log::info!("Getting listing page no. {}", page);
        let url = self.config.listing_url(total, page);
        let body = self.site.get_xhr_text(&url).await?;
        log::debug!("Listing page {} body length: {}", page, body.len());

        if body.contains(ACCESS_DENIED_MARKER) {
            return Err(AppError::AccessDenied { page });
        }

        Ok(ListingPage { index: page, body })
    }
}

/// Pattern matching the first-page link on the landing page.
pub fn page_total_pattern(listing_path: &str) -> Result<Regex> {
    let pattern = format!(
        r"ajax/{}\?total=(\d+)&(?:amp;)?page=1\b",
        regex::escape(listing_path)
    );
    Regex::new(&pattern).map_err(|e| AppError::config(format!("bad listing path pattern: {e}")))
}

/// Extract the pagination total from a landing page body.
pub fn parse_page_total(pattern: &Regex, body: &str) -> Option<u32> {
    pattern
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
