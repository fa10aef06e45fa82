//! Web page ingestion.
//!
//! Fetches a page and keeps its visible text: every text node whose parent
//! is not a `script`, `style`, `meta` or `noscript` element. The result is
//! normalized like file content, so short pages store the no-content
//! sentinel. Unlike file extraction, network and HTTP failures are errors.

use std::time::Duration;

use scraper::{Html, Node};
use tracing::{debug, info};

use crate::config::ScrapeConfig;
use crate::extract::Extraction;
use crate::models::{SourceRecord, SourceType};

const HIDDEN_PARENTS: &[&str] = &["script", "style", "meta", "noscript"];

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },
}

/// HTTP client carrying the configured user agent and timeout.
pub fn scrape_client(config: &ScrapeConfig) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Fetch `url` and turn its visible text into a website record.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<SourceRecord, ScrapeError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| ScrapeError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScrapeError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    let response = client.get(parsed).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let html = response.text().await?;
    debug!(%url, bytes = html.len(), "fetched page");

    let content = Extraction::from_raw(&visible_text(&html)).into_content();
    info!(%url, chars = content.chars().count(), "scraped page");
    Ok(SourceRecord::new(SourceType::Website, url, content))
}

/// Visible text of an HTML document: trimmed non-empty text nodes outside
/// hidden elements, joined by single spaces.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();
    for node in document.tree.nodes() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let parent = node
            .parent()
            .and_then(|p| p.value().as_element())
            .map(|e| e.name());
        if parent.is_some_and(|name| HIDDEN_PARENTS.contains(&name)) {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    parts.join(" ")
}
