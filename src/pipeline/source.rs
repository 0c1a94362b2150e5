//! Document source: page identifiers and the page-chunk request.
//!
//! The internal API identifies pages by hyphenated UUID, while page URLs end
//! in the same id written as 32 bare hex digits (`My-Page-<32 hex>`).
//! [`normalize_page_id`] accepts either form and returns the hyphenated one.
//!
//! [`NotionHttpSource`] posts a `loadPageChunk` request and turns the
//! response's `recordMap.block` into a [`Document`]. A response without a
//! block map is reported as [`Notion2MdError::MissingBlockMap`], distinct from
//! transport failures.

use crate::config::ConversionConfig;
use crate::document::Document;
use crate::error::Notion2MdError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

static RE_BARE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-f0-9]{32})").unwrap());
static RE_UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$").unwrap()
});

/// Supplies the raw block tree of a page.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_document(&self, page_id: &str) -> Result<Document, Notion2MdError>;
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Turn a page URL, bare 32-hex id, or UUID into the hyphenated UUID form.
pub fn normalize_page_id(input: &str) -> Result<String, Notion2MdError> {
    let trimmed = input.trim();
    let invalid = || Notion2MdError::InvalidPageId {
        input: input.to_string(),
    };

    let candidate = if is_url(trimmed) {
        let url = reqwest::Url::parse(trimmed).map_err(|_| invalid())?;
        url.path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_lowercase)
            .ok_or_else(invalid)?
    } else {
        trimmed.to_lowercase()
    };

    if RE_UUID.is_match(&candidate) {
        return Ok(candidate);
    }

    let bare = RE_BARE_ID
        .captures(&candidate)
        .map(|caps| caps[1].to_string())
        .ok_or_else(invalid)?;
    Ok(format_uuid(&bare))
}

/// Insert hyphens into a 32-character id: 8-4-4-4-12.
fn format_uuid(id: &str) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        &id[0..8],
        &id[8..12],
        &id[12..16],
        &id[16..20],
        &id[20..32]
    )
}

/// Fetches pages through the service's internal `loadPageChunk` endpoint.
#[derive(Clone)]
pub struct NotionHttpSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    chunk_limit: usize,
    timeout_secs: u64,
}

impl std::fmt::Debug for NotionHttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionHttpSource")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("chunk_limit", &self.chunk_limit)
            .finish()
    }
}

impl NotionHttpSource {
    pub fn from_config(config: &ConversionConfig) -> Result<Self, Notion2MdError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| Notion2MdError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.notion_token.clone(),
            chunk_limit: config.chunk_limit,
            timeout_secs: config.api_timeout_secs,
        })
    }

    fn request_body(&self, page_id: &str) -> Value {
        json!({
            "pageId": page_id,
            "limit": self.chunk_limit,
            "cursor": { "stack": [] },
            "chunkNumber": 0,
            "verticalColumns": false
        })
    }
}

#[async_trait]
impl DocumentSource for NotionHttpSource {
    async fn fetch_document(&self, page_id: &str) -> Result<Document, Notion2MdError> {
        let url = format!("{}/loadPageChunk", self.base_url);
        info!("Fetching page {} from {}", page_id, url);

        let unavailable = |reason: String| Notion2MdError::SourceUnavailable {
            page_id: page_id.to_string(),
            reason,
        };
        let transport = |e: reqwest::Error| {
            if e.is_timeout() {
                Notion2MdError::SourceTimeout {
                    page_id: page_id.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                unavailable(e.to_string())
            }
        };

        let mut request = self.client.post(&url).json(&self.request_body(page_id));
        if let Some(ref token) = self.token {
            request = request.header(reqwest::header::COOKIE, format!("token_v2={token}"));
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Error response body: {}", body);
            return Err(unavailable(format!("HTTP {status}: {}", body.trim())));
        }

        let payload: Value = response.json().await.map_err(transport)?;
        let doc = Document::from_response(page_id, &payload)?;
        debug!("Record map holds {} blocks", doc.len());
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "0123abcd-4567-89ef-0123-456789abcdef";

    #[test]
    fn test_is_url() {
        assert!(is_url("https://www.notion.so/x"));
        assert!(is_url("http://notion.so/x"));
        assert!(!is_url("0123abcd456789ef0123456789abcdef"));
        assert!(!is_url(""));
    }

    #[test]
    fn normalizes_page_url() {
        let id = normalize_page_id(
            "https://www.notion.so/team/My-Page-0123abcd456789ef0123456789abcdef?pvs=4",
        )
        .unwrap();
        assert_eq!(id, UUID);
    }

    #[test]
    fn normalizes_bare_and_uuid_ids() {
        assert_eq!(normalize_page_id("0123ABCD456789EF0123456789ABCDEF").unwrap(), UUID);
        assert_eq!(normalize_page_id(UUID).unwrap(), UUID);
        assert_eq!(normalize_page_id(&format!("  {UUID}\n")).unwrap(), UUID);
    }

    #[test]
    fn rejects_inputs_without_an_id() {
        for input in ["", "hello", "https://www.notion.so/", "https://www.notion.so/short-abc123"] {
            let err = normalize_page_id(input).unwrap_err();
            assert!(matches!(err, Notion2MdError::InvalidPageId { .. }), "{input}");
        }
    }

    #[test]
    fn request_body_shape() {
        let config = ConversionConfig::builder().chunk_limit(50).build().unwrap();
        let source = NotionHttpSource::from_config(&config).unwrap();
        let body = source.request_body(UUID);
        assert_eq!(body["pageId"], UUID);
        assert_eq!(body["limit"], 50);
        assert_eq!(body["chunkNumber"], 0);
        assert_eq!(body["verticalColumns"], false);
        assert!(body["cursor"]["stack"].as_array().unwrap().is_empty());
    }

    #[test]
    fn debug_redacts_token() {
        let config = ConversionConfig::builder().notion_token("v2-secret").build().unwrap();
        let source = NotionHttpSource::from_config(&config).unwrap();
        assert!(!format!("{source:?}").contains("v2-secret"));
    }
}
