//! HTTP fetcher for the source page
//!
//! This module handles:
//! - Building the HTTP client shared by page fetch and image downloads
//! - Fetching the source page in a single, non-retried request

use crate::config::UserAgentConfig;
use crate::page::parser::parse_html;
use crate::RippleError;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// No client-wide request timeout is set: download attempts carry their own
/// deadlines, and a global one would blur the timeout/other-failure split.
///
/// # Example
///
/// ```no_run
/// use ripple_fetch::config::UserAgentConfig;
/// use ripple_fetch::page::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: Name/Version
    let user_agent = format!("{}/{}", config.name, config.version);

    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page and returns its image references in document order
///
/// The page is fetched exactly once; any failure is returned to the caller
/// without retrying.
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Raw `<img src>` values (possibly empty)
/// * `Err(RippleError::Http)` - Network failure
/// * `Err(RippleError::PageStatus)` - Non-2xx response
/// * `Err(RippleError::HtmlParse)` - Markup could not be scanned
pub async fn fetch_references(client: &Client, page_url: &Url) -> Result<Vec<String>, RippleError> {
    let url_str = page_url.as_str();
    tracing::debug!(url = url_str, "Fetching source page");

    let response = client
        .get(page_url.clone())
        .send()
        .await
        .map_err(|source| RippleError::Http {
            url: url_str.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(RippleError::PageStatus {
            url: url_str.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| RippleError::Http {
        url: url_str.to_string(),
        source,
    })?;

    let parsed = parse_html(&body).map_err(|message| RippleError::HtmlParse {
        url: url_str.to_string(),
        message,
    })?;

    tracing::info!(
        url = url_str,
        title = parsed.title.as_deref().unwrap_or(""),
        images = parsed.image_sources.len(),
        "Extracted image references"
    );

    Ok(parsed.image_sources)
}
