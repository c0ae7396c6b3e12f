// src/services/session.rs

//! Authenticated session against the tracker.
//!
//! The session owns a cookie-keeping `reqwest` client. Everything downstream
//! talks to the site through the [`SiteClient`] trait so it can be exercised
//! without a network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, Credentials, SiteConfig};
use crate::utils::http::create_session_client;

/// Text the login form shows when the credentials are wrong.
pub const INVALID_CREDENTIALS_MARKER: &str = "Error: Invalid username or password.";

/// Downloaded binary asset.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Read access to the site used by the scanner, the crawl loop and the mirror.
#[async_trait]
pub trait SiteClient: Send + Sync {
    /// GET a page and return its body.
    async fn get_text(&self, url: &str) -> Result<String>;

    /// GET a page the way the site's own AJAX code does.
    async fn get_xhr_text(&self, url: &str) -> Result<String>;

    /// GET a binary asset; non-success statuses are errors.
    async fn get_asset(&self, url: &str) -> Result<FetchedAsset>;
}

/// Cookie-backed HTTP session for one run.
pub struct Session {
    client: Client,
    login_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl Session {
    /// Build the client. No request is made until [`Session::login`].
    pub fn create(site: &SiteConfig, crawler: &CrawlerConfig) -> Result<Self> {
        log::info!("Creating http client.");
        Ok(Self {
            client: create_session_client(crawler)?,
            login_url: site.login_url(),
            max_retries: crawler.max_retries,
            retry_delay: Duration::from_millis(crawler.retry_delay_ms),
        })
    }

    /// Log in, leaving the session cookies in the jar.
    ///
    /// Rejected credentials are never retried.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        if credentials.username.trim().is_empty() {
            return Err(AppError::auth("no username configured"));
        }

        log::info!("Logging in as {}.", credentials.username);

        // Prime the session cookie before posting the form.
        self.get_text(&self.login_url).await?;

        let params = [
            ("form", "login"),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let body = self
            .client
            .post(&self.login_url)
            .form(&params)
            .send()
            .await?
            .text()
            .await?;

        check_login_response(&body, &credentials.username)?;
        log::info!("Logged in.");
        Ok(())
    }

    /// Send an idempotent request, retrying transport failures and 5xx/429.
    async fn send_idempotent<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            let failure = match build().send().await {
                Ok(response) if is_retryable_status(response.status()) => {
                    if attempt >= self.max_retries {
                        return Ok(response.error_for_status()?);
                    }
                    format!("HTTP {}", response.status())
                }
                Ok(response) => return Ok(response),
                Err(err) if is_retryable_error(&err) && attempt < self.max_retries => {
                    err.to_string()
                }
                Err(err) => return Err(err.into()),
            };

            attempt += 1;
            let delay = self.retry_delay.saturating_mul(attempt);
            log::warn!(
                "GET {} failed ({}), retry {}/{} in {:?}",
                url,
                failure,
                attempt,
                self.max_retries,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SiteClient for Session {
    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.send_idempotent(url, || self.client.get(url)).await?;
        log::debug!("GET {} -> {}", url, response.status());
        Ok(response.text().await?)
    }

    async fn get_xhr_text(&self, url: &str) -> Result<String> {
        let response = self
            .send_idempotent(url, || {
                self.client
                    .get(url)
                    .header("X-Requested-With", "XMLHttpRequest")
            })
            .await?;
        log::debug!("XHR {} -> {}", url, response.status());
        Ok(response.text().await?)
    }

    async fn get_asset(&self, url: &str) -> Result<FetchedAsset> {
        let response = self
            .send_idempotent(url, || self.client.get(url))
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        Ok(FetchedAsset {
            bytes,
            content_type,
        })
    }
}

/// Decide whether a login response body proves we are signed in.
pub fn check_login_response(body: &str, username: &str) -> Result<()> {
    if body.contains(INVALID_CREDENTIALS_MARKER) {
        return Err(AppError::auth("invalid username or password"));
    }
    // Signed-in pages greet the user by name.
    if !body.contains(username) {
        return Err(AppError::auth("can't find username in response body"));
    }
    Ok(())
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
