//! Fetching a page whose text feeds the classifier.
//!
//! The engine only needs the body text, so this is a deliberately small
//! fetch: normalize the URL, one GET with a desktop UA, capped redirects,
//! 15 s timeout.

use std::time::Duration;

use url::Url;

/// A fetched page ready for text extraction.
#[derive(Clone)]
pub struct PageFetch {
    pub html: String,
    pub url: String,
    pub status: u16,
    pub content_type: String,
}

/// Error during a page fetch.
pub struct PageFetchError {
    pub message: String,
}

impl std::fmt::Display for PageFetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Fetch a URL and return its HTML (blocking). Bare hostnames get an
/// https:// prefix.
pub fn fetch_page(url_str: &str) -> Result<PageFetch, PageFetchError> {
    let url = if !url_str.starts_with("http://") && !url_str.starts_with("https://") {
        format!("https://{}", url_str)
    } else {
        url_str.to_string()
    };

    let parsed = Url::parse(&url).map_err(|e| PageFetchError {
        message: format!("Invalid URL: {}", e),
    })?;

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!(
            "Mozilla/5.0 (compatible; privad/",
            env!("CARGO_PKG_VERSION"),
            ")"
        ))
        .timeout(Duration::from_secs(15))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| PageFetchError {
            message: format!("Client error: {}", e),
        })?;

    let response = client
        .get(parsed.as_str())
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .send()
        .map_err(|e| PageFetchError {
            message: format!("Request failed: {}", e),
        })?;

    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/html")
        .to_string();
    let final_url = response.url().to_string();

    let html = response.text().map_err(|e| PageFetchError {
        message: format!("Failed to read body: {}", e),
    })?;

    log::debug!("Fetched {} ({}, {})", final_url, status, content_type);

    Ok(PageFetch {
        html,
        url: final_url,
        status,
        content_type,
    })
}
