//! Listing page data structures.

/// One fetched page of the catalog listing.
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// 1-based page index
    pub index: u32,

    /// Raw HTML fragment returned by the listing endpoint
    pub body: String,
}

/// A single row of a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    /// Category label (e.g. "Anime Series")
    pub category: String,

    /// Absolute URL of the detail page; doubles as the feed item id
    pub detail_url: String,

    /// Title markup as found in the row, before sanitizing
    pub raw_title: String,
}

impl ListingRow {
    /// Whether the row's category hits any entry of the exclusion list.
    pub fn is_excluded(&self, excluded: &[String]) -> bool {
        excluded
            .iter()
            .filter(|c| !c.is_empty())
            .any(|c| self.category.contains(c.as_str()))
    }
}
