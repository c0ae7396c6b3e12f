// src/error.rs

//! Unified error handling for the feed crawler.

use std::fmt;

use thiserror::Error;

use crate::storage::StoreError;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The site rejected our credentials
    #[error("Login failed: {0}")]
    Auth(String),

    /// The listing endpoint answered with its access-denied page
    #[error("Access denied while fetching listing page {page}")]
    AccessDenied { page: u32 },

    /// The landing page carried no pagination total
    #[error("No pagination total found for listing path '{listing_path}'")]
    PaginationNotFound { listing_path: String },

    /// A media URL cannot be mapped onto a storage key
    #[error("Cannot derive a storage key from '{url}': {reason}")]
    MediaKey { url: String, reason: String },

    /// Object storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Uploads kept hitting the storage rate limit
    #[error("Storage rate limit persisted for '{key}' after {attempts} attempts")]
    RateLimitExhausted { key: String, attempts: u32 },

    /// Feed serialization failed
    #[error("Feed error: {0}")]
    Feed(String),

    /// Crawling error
    #[error("Crawl error for {context}: {message}")]
    Crawl { context: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Create a media key derivation error.
    pub fn media_key(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MediaKey {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a feed serialization error.
    pub fn feed(message: impl fmt::Display) -> Self {
        Self::Feed(message.to_string())
    }

    /// Create a crawl error with context.
    pub fn crawl(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Crawl {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
