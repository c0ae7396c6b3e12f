// src/utils/http.rs

//! HTTP client utilities.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use cookie_store::{CookieStore, RawCookie};
use publicsuffix::List;
use reqwest::header::HeaderValue;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Public suffix list used to reject cookies scoped to a registry suffix.
const PUBLIC_SUFFIX_LIST: &str = include_str!("../../data/public_suffix_list.dat");

/// Cookie jar that honors the public suffix list.
///
/// A `Set-Cookie` whose `Domain` is a public suffix (`co.uk`, `github.io`)
/// is dropped unless it names the request host itself.
#[derive(Debug)]
pub struct SessionJar(RwLock<CookieStore>);

impl SessionJar {
    /// Jar loaded with the bundled public suffix list.
    pub fn new() -> Result<Self> {
        let list: List = PUBLIC_SUFFIX_LIST
            .parse()
            .map_err(|e| AppError::config(format!("Invalid public suffix list: {e}")))?;
        let store = CookieStore::new_with_public_suffix(Some(list));
        Ok(Self(RwLock::new(store)))
    }

    /// Whether a cookie named `name` would be sent to `url`.
    pub fn has_cookie(&self, url: &Url, name: &str) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_request_values(url)
            .any(|(n, _)| n == name)
    }
}

impl reqwest::cookie::CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies = cookie_headers.filter_map(|value| {
            let text = value.to_str().ok()?;
            RawCookie::parse(text).ok().map(RawCookie::into_owned)
        });
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .store_response_cookies(cookies, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

/// Create the cookie-keeping client used for the authenticated session.
pub fn create_session_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let jar = Arc::new(SessionJar::new()?);
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .cookie_provider(jar)
        .build()?;
    Ok(client)
}

/// Create a plain client for outbound webhooks.
pub fn create_async_client(timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore as _;

    fn store(jar: &SessionJar, url: &Url, set_cookie: &str) {
        let value = HeaderValue::from_str(set_cookie).unwrap();
        jar.set_cookies(&mut std::iter::once(&value), url);
    }

    #[test]
    fn test_cookie_on_public_suffix_is_rejected() {
        let jar = SessionJar::new().unwrap();
        let origin = Url::parse("https://tracker.example.co.uk/login.php").unwrap();

        store(&jar, &origin, "sid=abc; Domain=co.uk; Path=/");

        assert!(!jar.has_cookie(&origin, "sid"));
        let other = Url::parse("https://unrelated.co.uk/").unwrap();
        assert!(jar.cookies(&other).is_none());
    }

    #[test]
    fn test_cookie_on_registrable_domain_spans_subdomains() {
        let jar = SessionJar::new().unwrap();
        let origin = Url::parse("https://www.example.co.uk/login.php").unwrap();

        store(&jar, &origin, "sid=abc; Domain=example.co.uk; Path=/");

        let sibling = Url::parse("https://img.example.co.uk/covers/a.jpg").unwrap();
        assert!(jar.has_cookie(&sibling, "sid"));
        assert_eq!(
            jar.cookies(&sibling).unwrap().to_str().unwrap(),
            "sid=abc"
        );
    }

    #[test]
    fn test_host_only_cookie_stays_on_host() {
        let jar = SessionJar::new().unwrap();
        let origin = Url::parse("https://tracker.test/login.php").unwrap();

        store(&jar, &origin, "sid=abc; Path=/");

        assert!(jar.has_cookie(&origin, "sid"));
        let sub = Url::parse("https://img.tracker.test/").unwrap();
        assert!(!jar.has_cookie(&sub, "sid"));
    }

    #[test]
    fn test_session_client_builds() {
        assert!(create_session_client(&CrawlerConfig::default()).is_ok());
    }
}
