//! Ad source HTTP client.
//!
//! One ad is two requests against `GET {base}/get_ad?category=…`: the first
//! negotiates `application/json` for the tagline and generation prompt, the
//! second `image/png` for the creative. The image is decoded to prove it is
//! real, then re-encoded as a `data:` URL so any surface can embed it
//! without touching the filesystem.
//!
//! Failures map onto a small taxonomy the engine turns into user-facing
//! placeholder text. A 429 with `Retry-After` is advisory only — nothing
//! here sleeps or retries.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use url::Url;

use crate::history::AdContent;

/// JSON body of a text-ad response.
#[derive(Debug, Deserialize)]
pub struct AdText {
    pub ad: String,
    pub prompt: String,
}

/// Why an ad fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdSourceError {
    /// HTTP 429; the wait hint comes from the `Retry-After` header.
    RateLimited { retry_after_secs: u64 },
    /// Any other non-2xx status.
    Http { status: u16 },
    /// The body didn't match what the `Accept` header asked for.
    ContentType { expected: &'static str, got: String },
    /// Transport-level failure (connect, timeout, TLS).
    Network(String),
    /// 2xx with an unparseable body (bad JSON, undecodable image).
    Decode(String),
}

impl std::fmt::Display for AdSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdSourceError::RateLimited { retry_after_secs } => {
                write!(f, "rate limited by ad source (retry after {}s)", retry_after_secs)
            }
            AdSourceError::Http { status } => write!(f, "ad source returned HTTP {}", status),
            AdSourceError::ContentType { expected, got } => {
                write!(f, "expected {} but got {}", expected, got)
            }
            AdSourceError::Network(msg) => write!(f, "request failed: {}", msg),
            AdSourceError::Decode(msg) => write!(f, "{}", msg),
        }
    }
}

/// The user-facing placeholder for a failed fetch. Rate limits surface the
/// wait duration, HTTP errors the numeric status; everything else stays
/// generic with the detail kept aside in `lastError`.
pub fn placeholder_text(err: &AdSourceError) -> String {
    match err {
        AdSourceError::RateLimited { retry_after_secs } => format!(
            "Ads are rate limited. Please try again in {}s.",
            retry_after_secs
        ),
        AdSourceError::Http { status } => {
            format!("Error loading ad (HTTP {}). Please try again.", status)
        }
        _ => "Error loading ad. Please try again.".to_string(),
    }
}

/// Blocking client for one ad source endpoint.
pub struct AdSource {
    base: Url,
    client: reqwest::blocking::Client,
}

impl AdSource {
    pub fn new(base_url: &str) -> Result<Self, AdSourceError> {
        let base = Url::parse(base_url)
            .map_err(|e| AdSourceError::Network(format!("invalid ad source URL: {}", e)))?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("privad/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AdSourceError::Network(format!("client error: {}", e)))?;

        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Fetch a complete ad (tagline + prompt + embeddable image).
    pub fn fetch(&self, category: &str) -> Result<AdContent, AdSourceError> {
        let text = self.fetch_text(category)?;
        let image = self.fetch_image(category)?;

        Ok(AdContent {
            text: text.ad,
            image: Some(image),
            prompt: Some(text.prompt),
        })
    }

    /// Fetch only the text half of an ad.
    pub fn fetch_text(&self, category: &str) -> Result<AdText, AdSourceError> {
        let response = self
            .client
            .get(self.ad_url(category)?)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| AdSourceError::Network(e.to_string()))?;

        let body = read_body(response, "application/json")?;
        let text: AdText = serde_json::from_slice(&body)
            .map_err(|e| AdSourceError::Decode(format!("malformed ad JSON: {}", e)))?;

        log::debug!("Ad text for {}: {:?}", category, text.ad);
        Ok(text)
    }

    /// Fetch the image half of an ad as a `data:image/png;base64,…` string.
    pub fn fetch_image(&self, category: &str) -> Result<String, AdSourceError> {
        let response = self
            .client
            .get(self.ad_url(category)?)
            .header("Accept", "image/png")
            .send()
            .map_err(|e| AdSourceError::Network(e.to_string()))?;

        let bytes = read_body(response, "image")?;

        // Decode to prove the bytes are a real image before embedding them.
        let img = image::load_from_memory(&bytes)
            .map_err(|e| AdSourceError::Decode(format!("undecodable ad image: {}", e)))?;
        let rgba = img.to_rgba8();
        let (w, h) = rgba.dimensions();
        log::debug!("Ad image for {}: {}x{}, {} bytes", category, w, h, bytes.len());

        Ok(format!("data:image/png;base64,{}", BASE64.encode(&bytes)))
    }

    fn ad_url(&self, category: &str) -> Result<Url, AdSourceError> {
        let mut url = self
            .base
            .join("get_ad")
            .map_err(|e| AdSourceError::Network(format!("bad endpoint: {}", e)))?;
        url.query_pairs_mut().append_pair("category", category);
        Ok(url)
    }
}

/// Status and content-type checks shared by both request kinds, returning
/// the raw body on success. `expected` must occur in the content-type.
fn read_body(
    response: reqwest::blocking::Response,
    expected: &'static str,
) -> Result<Vec<u8>, AdSourceError> {
    let status = response.status();

    if status.as_u16() == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        return Err(AdSourceError::RateLimited { retry_after_secs });
    }

    if !status.is_success() {
        return Err(AdSourceError::Http {
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.contains(expected) {
        return Err(AdSourceError::ContentType {
            expected,
            got: content_type,
        });
    }

    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| AdSourceError::Network(format!("failed to read body: {}", e)))
}
